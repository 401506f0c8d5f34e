//! `/welcome`: greeting message and auto-roles for new members.

use async_trait::async_trait;
use tracing::info;

use crate::common::error::{BotError, BotResult};
use crate::dispatch::response::{Embed, Reply, Response};
use crate::dispatch::{BotContext, Handler, Interaction, Responder};
use crate::guild::welcome::{self, JoinContext};
use crate::guild::WelcomeConfig;

/// The guild an interaction came from. Guild commands are refused in DMs.
pub fn require_guild(interaction: &Interaction) -> BotResult<u64> {
    interaction
        .guild_id
        .ok_or_else(|| BotError::invalid("This command can only be used in a server"))
}

fn role_list(ids: &[u64]) -> String {
    if ids.is_empty() {
        "None".to_string()
    } else {
        ids.iter().map(|id| format!("<@&{}>", id)).collect::<Vec<_>>().join(", ")
    }
}

fn status(config: &WelcomeConfig) -> Response {
    let channel = config
        .channel_id
        .map(|id| format!("<#{}>", id))
        .unwrap_or_else(|| "Not set".to_string());
    let message = config.message.clone().unwrap_or_else(|| "Not set".to_string());
    Response::embed(
        Embed::new()
            .title("👋 Welcome settings")
            .field("Channel", channel, true)
            .field("User roles", role_list(&config.user_role_ids), true)
            .field("Bot roles", role_list(&config.bot_role_ids), true)
            .field("Message", message, false),
    )
}

pub struct WelcomeCommand;

#[async_trait]
impl Handler for WelcomeCommand {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let guild_id = require_guild(interaction)?;
        let current = ctx.guilds.find_welcome(guild_id).await?;

        let response = match interaction.subcommand() {
            Some("message") => {
                let mut errors = Vec::new();
                let channel_id = interaction.option_id("channel");
                if channel_id.is_none() {
                    errors.push("Choose a channel".to_string());
                }
                let content = interaction.option_str("content").unwrap_or_default().trim().to_string();
                if let Err(e) = welcome::validate_template(&content) {
                    errors.push(e);
                }
                if !errors.is_empty() {
                    return Err(BotError::Validation(errors));
                }

                let mut config = current.unwrap_or_else(|| WelcomeConfig::new(guild_id));
                config.channel_id = channel_id;
                config.message = Some(content);
                ctx.guilds.save_welcome(config.clone()).await?;
                info!("Welcome message set for guild {}", guild_id);
                status(&config).with_content("✅ Welcome message saved.")
            }
            Some(sub @ ("user-roles" | "bot-roles")) => {
                let roles = ctx
                    .patterns
                    .role_ids(interaction.option_str("roles").unwrap_or_default())
                    .map_err(BotError::Validation)?;
                let mut config = current.unwrap_or_else(|| WelcomeConfig::new(guild_id));
                if sub == "user-roles" {
                    config.user_role_ids = roles;
                } else {
                    config.bot_role_ids = roles;
                }
                ctx.guilds.save_welcome(config.clone()).await?;
                info!("Welcome {} set for guild {}", sub, guild_id);
                status(&config).with_content("✅ Join roles saved.")
            }
            Some("preview") => {
                let template = current
                    .and_then(|c| c.message)
                    .ok_or_else(|| BotError::invalid("No welcome message is set"))?;
                let join = JoinContext {
                    user_id: interaction.user_id,
                    user_name: &interaction.user_name,
                    server_name: "this server",
                };
                Response::text(welcome::render(&template, &join))
            }
            Some("disable") => {
                if ctx.guilds.destroy_welcome(guild_id).await? {
                    info!("Welcome disabled for guild {}", guild_id);
                    Response::success("Welcome disabled", "New members will no longer be greeted.")
                } else {
                    Response::warning("Nothing to disable", "Welcome is not configured here.")
                }
            }
            _ => match current {
                Some(config) => status(&config),
                None => Response::warning(
                    "Welcome is not configured",
                    "Use `/welcome message` to set a greeting.",
                ),
            },
        };
        Ok(Reply::Message(response))
    }
}
