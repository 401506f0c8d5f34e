//! Actions from the avatar detail view: message-driven edits, delete, level up.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::avatar::model::Avatar;
use crate::avatar::validate;
use crate::common::error::{BotError, BotResult, StoreError};
use crate::dispatch::response::{colour, Embed, Reply, Response};
use crate::dispatch::{BotContext, Handler, Interaction, Responder};
use crate::handlers::avatar::owned_avatar;
use crate::handlers::views;
use crate::stats::MAX_LEVEL;

/// How long an edit prompt waits for the user's answer.
pub const EDIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    Bracket,
    IconUrl,
}

impl EditField {
    fn prompt(self, avatar: &Avatar) -> String {
        match self {
            EditField::Name => format!("Send the new name for **{}**.", avatar.name),
            EditField::Bracket => format!(
                "Send the new bracket for **{}**. It must contain `text`, e.g. `[text]`.",
                avatar.name
            ),
            EditField::IconUrl => format!("Send the new image link for **{}**.", avatar.name),
        }
    }

    fn label(self) -> &'static str {
        match self {
            EditField::Name => "name",
            EditField::Bracket => "bracket",
            EditField::IconUrl => "image",
        }
    }
}

/// Store conflicts reach the user as a validation failure.
fn conflict_as_invalid(error: StoreError) -> BotError {
    match error {
        StoreError::Conflict { .. } => BotError::invalid("You already have an avatar with that name"),
        other => other.into(),
    }
}

/// Prompts, then takes the user's next message in the channel as the new value.
pub struct EditAvatar {
    pub field: EditField,
}

impl EditAvatar {
    async fn apply(&self, ctx: &BotContext, avatar: &mut Avatar, value: String) -> BotResult<()> {
        match self.field {
            EditField::Name => {
                validate::name(&value).map_err(BotError::invalid)?;
                if let Some(other) = ctx.avatars.find_by_name(avatar.owner_id, &value).await? {
                    if other.id != avatar.id {
                        return Err(BotError::invalid(format!(
                            "You already have an avatar named '{}'",
                            value
                        )));
                    }
                }
                avatar.name = value;
            }
            EditField::Bracket => {
                validate::bracket(&value).map_err(BotError::invalid)?;
                avatar.bracket = value;
            }
            EditField::IconUrl => {
                validate::icon_url(&value).map_err(BotError::invalid)?;
                avatar.icon_url = value;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for EditAvatar {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let mut avatar = owned_avatar(ctx, interaction).await?;

        let prompt = Embed::new()
            .colour(colour::AVATAR)
            .title(format!("✏️ Edit {}", self.field.label()))
            .description(self.field.prompt(&avatar))
            .footer(format!("You have {} seconds.", EDIT_TIMEOUT.as_secs()));
        let prompt = Response::embed(prompt);
        prompt.validate()?;
        responder.send(&prompt).await?;

        let Some(value) = responder.next_message(EDIT_TIMEOUT).await? else {
            debug!("Edit of avatar {} timed out", avatar.id);
            return Ok(Reply::Silent);
        };

        self.apply(ctx, &mut avatar, value.trim().to_string()).await?;
        ctx.avatars.update(&avatar).await.map_err(conflict_as_invalid)?;
        ctx.cache.invalidate(avatar.owner_id).await;
        info!("Avatar {} {} updated by {}", avatar.id, self.field.label(), interaction.user_id);

        Ok(Reply::Message(views::avatar_detail(ctx, &avatar).await))
    }
}

pub struct DeleteAvatar;

#[async_trait]
impl Handler for DeleteAvatar {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let avatar = owned_avatar(ctx, interaction).await?;
        if !ctx.avatars.destroy(avatar.id).await? {
            return Err(BotError::not_found(format!("avatar {}", avatar.id)));
        }
        ctx.cache.invalidate(avatar.owner_id).await;
        info!("Avatar {} '{}' deleted by {}", avatar.id, avatar.name, interaction.user_id);

        let response = views::avatar_list(ctx, interaction.user_id, &interaction.user_name)
            .await?
            .with_content(format!("🗑️ **{}** was deleted.", avatar.name));
        Ok(Reply::Message(response))
    }
}

pub struct LevelUp;

#[async_trait]
impl Handler for LevelUp {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let mut avatar = owned_avatar(ctx, interaction).await?;
        if avatar.level >= MAX_LEVEL {
            return Err(BotError::invalid(format!(
                "{} is already at the maximum level ({})",
                avatar.name, MAX_LEVEL
            )));
        }
        avatar.level += 1;
        ctx.avatars.update(&avatar).await?;
        ctx.cache.invalidate(avatar.owner_id).await;
        debug!("Avatar {} reached level {}", avatar.id, avatar.level);

        let mut response = views::avatar_detail(ctx, &avatar).await;
        if let Some(embed) = response.embeds.first_mut() {
            embed.colour = colour::LEVEL_UP;
        }
        response.content = Some(format!("⬆️ **{}** is now level {}!", avatar.name, avatar.level));
        Ok(Reply::Message(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::model::NewAvatar;
    use crate::dispatch::testing::{RecordingResponder, Sent};
    use crate::dispatch::Kind;

    async fn seed(ctx: &BotContext, owner_id: u64, name: &str) -> Avatar {
        ctx.avatars
            .create(NewAvatar {
                owner_id,
                name: name.to_string(),
                bracket: "[text]".to_string(),
                icon_url: "https://example.com/a.png".to_string(),
                species: "dwarf".to_string(),
            })
            .await
            .unwrap()
    }

    async fn stored(ctx: &BotContext, avatar: &Avatar) -> Avatar {
        let avatars = ctx.avatars.find_all(avatar.owner_id).await.unwrap();
        avatars.into_iter().find(|a| a.id == avatar.id).unwrap()
    }

    fn button(prefix: &str, avatar: &Avatar, user_id: u64) -> Interaction {
        Interaction::new(Kind::Button, format!("{}{}", prefix, avatar.id), user_id)
    }

    #[tokio::test]
    async fn test_rename_from_next_message() {
        let ctx = BotContext::for_tests();
        let aria = seed(&ctx, 1, "Aria").await;
        ctx.cache.get(1).await.unwrap();

        let responder = RecordingResponder::with_incoming(&["  Brom  "]);
        let handler = EditAvatar { field: EditField::Name };
        let reply = handler.handle(&ctx, &button("edit_name_", &aria, 1), &responder).await.unwrap();

        assert!(matches!(reply, Reply::Message(_)));
        assert!(matches!(&responder.sent()[0], Sent::Message(_)));
        let renamed = stored(&ctx, &aria).await;
        assert_eq!(renamed.name, "Brom");
        assert_eq!(ctx.cache.get(1).await.unwrap()[0].name, "Brom");
    }

    #[tokio::test]
    async fn test_oversized_prompt_is_not_sent() {
        let ctx = BotContext::for_tests();
        let long = seed(&ctx, 1, &"n".repeat(5000)).await;
        let responder = RecordingResponder::with_incoming(&["Brom"]);

        let result = EditAvatar { field: EditField::Name }
            .handle(&ctx, &button("edit_name_", &long, 1), &responder)
            .await;
        assert!(matches!(result, Err(BotError::Limits(_))));
        assert!(responder.sent().is_empty());
        assert_eq!(stored(&ctx, &long).await.name.len(), 5000);
    }

    #[tokio::test]
    async fn test_edit_timeout_is_silent() {
        let ctx = BotContext::for_tests();
        let aria = seed(&ctx, 1, "Aria").await;
        let handler = EditAvatar { field: EditField::Bracket };
        let reply = handler
            .handle(&ctx, &button("edit_bracket_", &aria, 1), &RecordingResponder::new())
            .await
            .unwrap();
        assert_eq!(reply, Reply::Silent);
        assert_eq!(stored(&ctx, &aria).await.bracket, "[text]");
    }

    #[tokio::test]
    async fn test_edit_rejects_bad_values() {
        let ctx = BotContext::for_tests();
        let aria = seed(&ctx, 1, "Aria").await;
        seed(&ctx, 1, "Brom").await;

        let rename = EditAvatar { field: EditField::Name };
        let result = rename
            .handle(&ctx, &button("edit_name_", &aria, 1), &RecordingResponder::with_incoming(&["Brom"]))
            .await;
        assert!(matches!(result, Err(BotError::Validation(_))));

        let icon = EditAvatar { field: EditField::IconUrl };
        let result = icon
            .handle(
                &ctx,
                &button("edit_avatar_url_", &aria, 1),
                &RecordingResponder::with_incoming(&["https://example.com/page.html"]),
            )
            .await;
        assert!(matches!(result, Err(BotError::Validation(_))));
    }

    #[tokio::test]
    async fn test_edit_foreign_avatar_not_found() {
        let ctx = BotContext::for_tests();
        let aria = seed(&ctx, 1, "Aria").await;
        let handler = EditAvatar { field: EditField::Name };
        let result = handler
            .handle(&ctx, &button("edit_name_", &aria, 2), &RecordingResponder::with_incoming(&["Mine"]))
            .await;
        assert!(matches!(result, Err(BotError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_shows_list() {
        let ctx = BotContext::for_tests();
        let aria = seed(&ctx, 1, "Aria").await;
        let reply = DeleteAvatar
            .handle(&ctx, &button("delete_avatar_", &aria, 1), &RecordingResponder::new())
            .await
            .unwrap();
        assert!(matches!(reply, Reply::Message(r) if r.content.as_deref() == Some("🗑️ **Aria** was deleted.")));
        assert!(ctx.cache.get(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_level_up_caps() {
        let ctx = BotContext::for_tests();
        let mut aria = seed(&ctx, 1, "Aria").await;

        LevelUp
            .handle(&ctx, &button("levelup_", &aria, 1), &RecordingResponder::new())
            .await
            .unwrap();
        assert_eq!(stored(&ctx, &aria).await.level, 2);

        aria.level = MAX_LEVEL;
        ctx.avatars.update(&aria).await.unwrap();
        ctx.cache.invalidate(1).await;
        let result = LevelUp
            .handle(&ctx, &button("levelup_", &aria, 1), &RecordingResponder::new())
            .await;
        assert!(matches!(result, Err(BotError::Validation(_))));
    }
}
