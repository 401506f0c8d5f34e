//! `/rr`: bind emoji reactions on a message to roles.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::common::error::{BotError, BotResult, StoreError};
use crate::dispatch::response::{ActionRow, Reply, Response, SelectMenu, SelectOption, MAX_SELECT_OPTIONS};
use crate::dispatch::{BotContext, Handler, Interaction, Responder};
use crate::guild::parse::snowflake;
use crate::guild::{NewReactionRole, ReactionRoleBinding};
use crate::handlers::welcome::require_guild;

pub const REMOVE_SELECT_ID: &str = "select_rr";

fn describe(binding: &ReactionRoleBinding) -> String {
    let emoji = if binding.emoji.chars().all(|c| c.is_ascii_digit()) {
        format!("custom emoji {}", binding.emoji)
    } else {
        binding.emoji.clone()
    };
    format!("{} on message {}", emoji, binding.message_id)
}

pub struct ReactionRoleCommand;

impl ReactionRoleCommand {
    async fn add(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        responder: &dyn Responder,
        guild_id: u64,
    ) -> BotResult<Response> {
        let mut errors = Vec::new();

        let message_id = snowflake(interaction.option_str("message_id").unwrap_or_default());
        if message_id.is_none() {
            errors.push("Message id must be a number".to_string());
        }
        let role_ids = match ctx.patterns.role_ids(interaction.option_str("roles").unwrap_or_default()) {
            Ok(ids) => ids,
            Err(mut e) => {
                errors.append(&mut e);
                Vec::new()
            }
        };
        let raw_emoji = interaction.option_str("emoji").unwrap_or_default().trim();
        let emoji = match ctx.patterns.emoji_key(raw_emoji) {
            Ok(key) => Some(key),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let (Some(message_id), Some(emoji), true) = (message_id, emoji, errors.is_empty()) else {
            return Err(BotError::Validation(errors));
        };

        let binding = ctx
            .guilds
            .create_reaction_role(NewReactionRole {
                guild_id,
                message_id,
                emoji,
                role_ids,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict { .. } => {
                    BotError::invalid("That emoji is already bound on this message")
                }
                other => other.into(),
            })?;
        info!("Reaction role {} added in guild {}", binding.id, guild_id);

        if let Err(e) = responder.react(message_id, raw_emoji).await {
            warn!("Could not add reaction {} to message {}: {}", raw_emoji, message_id, e);
        }

        let roles = binding
            .role_ids
            .iter()
            .map(|id| format!("<@&{}>", id))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Response::success(
            "Reaction role added",
            format!("Reacting with {} on message {} grants {}", raw_emoji, message_id, roles),
        ))
    }

    async fn remove(&self, ctx: &BotContext, guild_id: u64) -> BotResult<Response> {
        let bindings = ctx.guilds.find_all_reaction_roles(guild_id).await?;
        if bindings.is_empty() {
            return Ok(Response::warning(
                "No reaction roles",
                "This server has no reaction roles to remove.",
            ));
        }
        let options = bindings
            .iter()
            .take(MAX_SELECT_OPTIONS)
            .map(|b| {
                SelectOption::new(describe(b), b.id.to_string())
                    .description(format!("{} role(s)", b.role_ids.len()))
            })
            .collect();
        Ok(Response::text("Choose the reaction role to remove.").with_row(ActionRow::Select(
            SelectMenu::new(REMOVE_SELECT_ID, options).placeholder("Reaction role"),
        )))
    }
}

#[async_trait]
impl Handler for ReactionRoleCommand {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let guild_id = require_guild(interaction)?;
        let response = match interaction.subcommand() {
            Some("add") => self.add(ctx, interaction, responder, guild_id).await?,
            Some("remove") => self.remove(ctx, guild_id).await?,
            other => return Err(BotError::not_found(format!("rr subcommand {:?}", other))),
        };
        Ok(Reply::Message(response))
    }
}

/// Deletes the binding picked from `/rr remove`.
pub struct RemoveReactionRole;

#[async_trait]
impl Handler for RemoveReactionRole {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let guild_id = require_guild(interaction)?;
        let id = interaction
            .first_value()
            .and_then(snowflake)
            .ok_or_else(|| BotError::not_found("reaction role"))?;
        if !ctx.guilds.destroy_reaction_role(guild_id, id).await? {
            return Err(BotError::not_found(format!("reaction role {}", id)));
        }
        info!("Reaction role {} removed from guild {}", id, guild_id);
        Ok(Reply::Message(Response::success(
            "Reaction role removed",
            "Reactions on that message no longer grant roles.",
        )))
    }
}
