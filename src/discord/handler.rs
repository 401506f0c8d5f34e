//! Gateway event handling.
//!
//! serenity events are forwarded into a channel by [`DiscordBotEvents`] and
//! handled by [`EventRouter`], one task per event.

use std::sync::Arc;

use serenity::async_trait;
use serenity::model::application::Interaction as SerenityInteraction;
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, RoleId};
use serenity::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::discord::commands;
use crate::discord::convert;
use crate::discord::responder::SerenityResponder;
use crate::dispatch::Router;
use crate::guild::{JoinContext, JoinPlan};
use crate::proxy::{BracketInterceptor, IncomingMessage, Intercept};
use crate::store::GuildRepository;

pub enum DiscordBotEvent {
    Ready { context: Context, ready: Ready },
    Interaction { context: Context, interaction: SerenityInteraction },
    Message { message: Message },
    MemberJoined { context: Context, member: Member },
    Reaction { context: Context, reaction: Reaction, added: bool },
    Disconnected,
}

pub struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    pub fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }

    fn forward(&self, event: DiscordBotEvent) {
        if self.discord_events_tx.send(event).is_err() {
            warn!("Failed to process discord event: receiver closed");
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        self.forward(DiscordBotEvent::Ready { context, ready });
    }

    async fn interaction_create(&self, context: Context, interaction: SerenityInteraction) {
        self.forward(DiscordBotEvent::Interaction { context, interaction });
    }

    async fn message(&self, _context: Context, message: Message) {
        self.forward(DiscordBotEvent::Message { message });
    }

    async fn guild_member_addition(&self, context: Context, member: Member) {
        self.forward(DiscordBotEvent::MemberJoined { context, member });
    }

    async fn reaction_add(&self, context: Context, reaction: Reaction) {
        self.forward(DiscordBotEvent::Reaction {
            context,
            reaction,
            added: true,
        });
    }

    async fn reaction_remove(&self, context: Context, reaction: Reaction) {
        self.forward(DiscordBotEvent::Reaction {
            context,
            reaction,
            added: false,
        });
    }
}

/// Routes gateway events to the interaction router, the bracket
/// interceptor and the guild features.
pub struct EventRouter {
    router: Arc<Router>,
    interceptor: Arc<BracketInterceptor>,
    guilds: Arc<dyn GuildRepository>,
    command_guild: Option<u64>,
}

impl EventRouter {
    pub fn new(
        router: Arc<Router>,
        interceptor: Arc<BracketInterceptor>,
        guilds: Arc<dyn GuildRepository>,
        command_guild: Option<u64>,
    ) -> Self {
        Self {
            router,
            interceptor,
            guilds,
            command_guild,
        }
    }

    pub async fn handle(&self, event: DiscordBotEvent) {
        match event {
            DiscordBotEvent::Ready { context, ready } => self.on_ready(context, ready).await,
            DiscordBotEvent::Interaction { context, interaction } => {
                self.on_interaction(context, interaction).await
            }
            DiscordBotEvent::Message { message } => self.on_message(message).await,
            DiscordBotEvent::MemberJoined { context, member } => self.on_member_join(context, member).await,
            DiscordBotEvent::Reaction {
                context,
                reaction,
                added,
            } => self.on_reaction(context, reaction, added).await,
            DiscordBotEvent::Disconnected => debug!("Discord disconnected"),
        }
    }

    async fn on_ready(&self, context: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
        if let Err(e) = commands::register(&context.http, self.command_guild).await {
            error!("Failed to register slash commands: {}", e);
        }
    }

    async fn on_interaction(&self, context: Context, raw: SerenityInteraction) {
        let Some((interaction, target)) = convert::interaction(raw) else {
            return;
        };
        let responder = SerenityResponder::new(context, target);
        self.router.dispatch(interaction, &responder).await;
    }

    async fn on_message(&self, message: Message) {
        let incoming = IncomingMessage {
            author_id: message.author.id.get(),
            content: message.content,
            channel_id: message.channel_id.get(),
            message_id: message.id.get(),
            is_bot: message.author.bot,
            guild_id: message.guild_id.map(|id| id.get()),
        };
        match self.interceptor.on_message(&incoming).await {
            Intercept::Ignored => {}
            outcome => debug!("Message {}: {:?}", incoming.message_id, outcome),
        }
    }

    async fn on_member_join(&self, context: Context, member: Member) {
        let guild_id = member.guild_id;
        let config = match self.guilds.find_welcome(guild_id.get()).await {
            Ok(Some(config)) => config,
            Ok(None) => return,
            Err(e) => {
                error!("Failed to load welcome settings for guild {}: {}", guild_id, e);
                return;
            }
        };

        let server_name = context
            .cache
            .guild(guild_id)
            .map(|guild| guild.name.clone())
            .unwrap_or_else(|| "the server".to_string());
        let user_name = member.display_name().to_string();
        let join = JoinContext {
            user_id: member.user.id.get(),
            user_name: &user_name,
            server_name: &server_name,
        };
        let plan = JoinPlan::new(&config, &join, member.user.bot);
        if plan.is_empty() {
            debug!("Nothing to do for {} joining guild {}", member.user.id, guild_id);
            return;
        }

        if let Some((channel_id, text)) = plan.greeting {
            if let Err(e) = ChannelId::new(channel_id).say(&context, text).await {
                warn!("Failed to greet {} in channel {}: {}", member.user.id, channel_id, e);
            }
        }
        for role_id in plan.role_ids {
            if let Err(e) = context
                .http
                .add_member_role(guild_id, member.user.id, RoleId::new(role_id), Some("Welcome role"))
                .await
            {
                warn!("Failed to give role {} to {}: {}", role_id, member.user.id, e);
            }
        }
    }

    async fn on_reaction(&self, context: Context, reaction: Reaction, added: bool) {
        let (Some(guild_id), Some(user_id)) = (reaction.guild_id, reaction.user_id) else {
            return;
        };
        let Some(emoji) = convert::reaction_key(&reaction.emoji) else {
            return;
        };

        let binding = match self
            .guilds
            .find_reaction_role(guild_id.get(), reaction.message_id.get(), &emoji)
            .await
        {
            Ok(Some(binding)) => binding,
            Ok(None) => return,
            Err(e) => {
                error!("Failed to look up reaction role: {}", e);
                return;
            }
        };

        match user_id.to_user(&context).await {
            Ok(user) if user.bot => return,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to fetch reacting user {}: {}", user_id, e);
                return;
            }
        }

        for role_id in binding.role_ids {
            let role = RoleId::new(role_id);
            let result = if added {
                context
                    .http
                    .add_member_role(guild_id, user_id, role, Some("Reaction role"))
                    .await
            } else {
                context
                    .http
                    .remove_member_role(guild_id, user_id, role, Some("Reaction role"))
                    .await
            };
            match result {
                Ok(()) => debug!(
                    "Reaction role {} {} for {}",
                    role_id,
                    if added { "given" } else { "taken" },
                    user_id
                ),
                Err(e) => warn!("Failed to update role {} for {}: {}", role_id, user_id, e),
            }
        }
    }
}
