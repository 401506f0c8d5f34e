//! `/avatar`, its autocomplete, the avatar picker and the creation wizard steps.

use async_trait::async_trait;

use crate::avatar::model::Avatar;
use crate::avatar::{AvatarForm, WizardState};
use crate::common::error::{BotError, BotResult};
use crate::dispatch::response::{
    ActionRow, Button, ButtonStyle, Choice, Embed, Reply, Response, MAX_CHOICES,
};
use crate::dispatch::{BotContext, Handler, Interaction, Responder};
use crate::handlers::views::{self, CREATE_BUTTON_ID, FORM_BRACKET, FORM_ICON, FORM_NAME, SPECIES_SELECT_PREFIX};

/// The caller's avatar named by the interaction: a parameterized custom id
/// (`levelup_42`), a selected value, or the `avatar` option.
pub async fn owned_avatar(ctx: &BotContext, interaction: &Interaction) -> BotResult<Avatar> {
    let id = interaction
        .id_suffix()
        .or_else(|| interaction.first_value().and_then(|v| v.parse().ok()))
        .or_else(|| interaction.option_id("avatar"))
        .ok_or_else(|| BotError::not_found("avatar"))?;
    ctx.cache
        .find_owned(interaction.user_id, id)
        .await?
        .ok_or_else(|| BotError::not_found(format!("avatar {}", id)))
}

/// `/avatar [list|select|create]`
pub struct AvatarCommand;

#[async_trait]
impl Handler for AvatarCommand {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let response = match interaction.subcommand() {
            Some("select") => views::avatar_detail(ctx, &owned_avatar(ctx, interaction).await?).await,
            Some("create") => Response::embed(
                Embed::new()
                    .title("🎭 New avatar")
                    .description("Press the button to fill in your avatar's name, bracket and image."),
            )
            .with_row(ActionRow::Buttons(vec![Button::new(
                CREATE_BUTTON_ID,
                "➕ Create avatar",
                ButtonStyle::Success,
            )])),
            _ => views::avatar_list(ctx, interaction.user_id, &interaction.user_name).await?,
        };
        Ok(Reply::Message(response))
    }
}

/// Suggests the caller's avatars whose name contains the typed text.
pub struct AvatarAutocomplete;

#[async_trait]
impl Handler for AvatarAutocomplete {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let needle = interaction.focused().to_lowercase();
        let avatars = ctx.cache.get(interaction.user_id).await?;
        let choices = avatars
            .iter()
            .filter(|a| a.name.to_lowercase().contains(&needle))
            .take(MAX_CHOICES)
            .map(|a| Choice {
                name: a.name.clone(),
                value: a.id.to_string(),
            })
            .collect();
        Ok(Reply::Choices(choices))
    }
}

/// Picking an avatar from the list opens its detail view.
pub struct AvatarSelect;

#[async_trait]
impl Handler for AvatarSelect {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let avatar = owned_avatar(ctx, interaction).await?;
        Ok(Reply::Message(views::avatar_detail(ctx, &avatar).await))
    }
}

/// `back` and `refresh` both redraw the list.
pub struct AvatarList;

#[async_trait]
impl Handler for AvatarList {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let response = views::avatar_list(ctx, interaction.user_id, &interaction.user_name).await?;
        Ok(Reply::Message(response))
    }
}

/// Opens the creation form. Registered with `Ack::Modal`.
pub struct CreateAvatarButton;

#[async_trait]
impl Handler for CreateAvatarButton {
    async fn handle(
        &self,
        _ctx: &BotContext,
        _interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        Ok(Reply::Modal(views::creation_form()))
    }
}

/// Wizard step one: validate and park the form.
pub struct AvatarFormSubmit;

#[async_trait]
impl Handler for AvatarFormSubmit {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let field = |id: &str| interaction.field(id).unwrap_or_default().to_string();
        let form = AvatarForm {
            name: field(FORM_NAME),
            bracket: field(FORM_BRACKET),
            icon_url: field(FORM_ICON),
        };
        let parked = ctx.wizard.submit_form(interaction.user_id, form).await?;
        Ok(Reply::Message(views::species_picker(ctx, interaction.user_id, &parked)))
    }
}

/// Wizard step two: persist with the chosen species.
pub struct SpeciesSelect;

#[async_trait]
impl Handler for SpeciesSelect {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let owner = interaction
            .identifier
            .strip_prefix(SPECIES_SELECT_PREFIX)
            .and_then(|id| id.parse::<u64>().ok());
        if owner != Some(interaction.user_id) {
            return Err(BotError::not_found("avatar creation session"));
        }
        let species = interaction
            .first_value()
            .ok_or_else(|| BotError::invalid("Choose a species"))?;

        let avatar = ctx.wizard.select_species(interaction.user_id, species).await?;
        let response = views::avatar_detail(ctx, &avatar)
            .await
            .with_content(format!("✅ **{}** is ready. Speak as it with `{}`.", avatar.name, avatar.bracket));
        Ok(Reply::Message(response))
    }
}

/// Drops a pending creation and goes back to the list.
pub struct CancelWizard;

#[async_trait]
impl Handler for CancelWizard {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let mut response = views::avatar_list(ctx, interaction.user_id, &interaction.user_name).await?;
        if let WizardState::AwaitingSpecies(form) = ctx.wizard.state(interaction.user_id).await {
            ctx.wizard.abort(interaction.user_id).await;
            response = response.with_content(format!("Creation of **{}** cancelled.", form.name));
        }
        Ok(Reply::Message(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::avatar::model::NewAvatar;
    use crate::dispatch::interaction::{CommandArgs, Kind, OptionValue, Payload};
    use crate::dispatch::testing::RecordingResponder;

    async fn seed(ctx: &BotContext, owner_id: u64, name: &str) -> Avatar {
        ctx.avatars
            .create(NewAvatar {
                owner_id,
                name: name.to_string(),
                bracket: "[text]".to_string(),
                icon_url: "https://example.com/a.png".to_string(),
                species: "human".to_string(),
            })
            .await
            .unwrap()
    }

    fn form_submit(owner_id: u64, name: &str) -> Interaction {
        let fields = BTreeMap::from([
            (FORM_NAME.to_string(), name.to_string()),
            (FORM_BRACKET.to_string(), "[text]".to_string()),
            (FORM_ICON.to_string(), "https://example.com/a.png".to_string()),
        ]);
        Interaction::new(Kind::Modal, "avatar_form", owner_id).with_payload(Payload::Fields(fields))
    }

    fn species_select(owner_id: u64, select_id: &str, species: &str) -> Interaction {
        Interaction::new(Kind::Select, select_id, owner_id)
            .with_payload(Payload::Values(vec![species.to_string()]))
    }

    #[tokio::test]
    async fn test_wizard_through_handlers() {
        let ctx = BotContext::for_tests();
        let responder = RecordingResponder::new();

        let reply = AvatarFormSubmit.handle(&ctx, &form_submit(1, "Aria"), &responder).await.unwrap();
        assert!(matches!(reply, Reply::Message(ref r) if r.embeds[0].title.as_deref() == Some("🎭 Aria")));

        let reply = SpeciesSelect
            .handle(&ctx, &species_select(1, "species_select_1", "elf"), &responder)
            .await
            .unwrap();
        assert!(matches!(reply, Reply::Message(_)));
        let avatars = ctx.cache.get(1).await.unwrap();
        assert_eq!(avatars.len(), 1);
        assert_eq!(avatars[0].species, "elf");
    }

    #[tokio::test]
    async fn test_species_select_of_someone_else() {
        let ctx = BotContext::for_tests();
        let responder = RecordingResponder::new();
        AvatarFormSubmit.handle(&ctx, &form_submit(1, "Aria"), &responder).await.unwrap();

        let result = SpeciesSelect
            .handle(&ctx, &species_select(2, "species_select_1", "elf"), &responder)
            .await;
        assert!(matches!(result, Err(BotError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_species_select_without_form_expired() {
        let ctx = BotContext::for_tests();
        let responder = RecordingResponder::new();
        let result = SpeciesSelect
            .handle(&ctx, &species_select(1, "species_select_1", "elf"), &responder)
            .await;
        assert!(matches!(result, Err(BotError::ExpiredSession)));
    }

    #[tokio::test]
    async fn test_autocomplete_filters_case_insensitively() {
        let ctx = BotContext::for_tests();
        let aria = seed(&ctx, 1, "Aria").await;
        seed(&ctx, 1, "Brom").await;
        seed(&ctx, 2, "Marianne").await;

        let interaction = Interaction::new(Kind::Autocomplete, "avatar", 1).with_payload(Payload::Autocomplete {
            option: "avatar".to_string(),
            value: "AR".to_string(),
        });
        let reply = AvatarAutocomplete
            .handle(&ctx, &interaction, &RecordingResponder::new())
            .await
            .unwrap();
        assert_eq!(
            reply,
            Reply::Choices(vec![Choice {
                name: "Aria".to_string(),
                value: aria.id.to_string(),
            }])
        );
    }

    #[tokio::test]
    async fn test_select_subcommand_checks_owner() {
        let ctx = BotContext::for_tests();
        let aria = seed(&ctx, 1, "Aria").await;

        let mut args = CommandArgs {
            subcommand: Some("select".to_string()),
            ..CommandArgs::default()
        };
        args.options.insert("avatar".to_string(), OptionValue::Str(aria.id.to_string()));
        let payload = Payload::Command(args);

        let mine = Interaction::new(Kind::Slash, "avatar", 1).with_payload(payload.clone());
        assert!(AvatarCommand.handle(&ctx, &mine, &RecordingResponder::new()).await.is_ok());

        let theirs = Interaction::new(Kind::Slash, "avatar", 2).with_payload(payload);
        assert!(matches!(
            AvatarCommand.handle(&ctx, &theirs, &RecordingResponder::new()).await,
            Err(BotError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_button_opens_form() {
        let ctx = BotContext::for_tests();
        let reply = CreateAvatarButton
            .handle(&ctx, &Interaction::new(Kind::Button, "create_avatar", 1), &RecordingResponder::new())
            .await
            .unwrap();
        assert!(matches!(reply, Reply::Modal(form) if form.inputs.len() == 3));
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_form() {
        let ctx = BotContext::for_tests();
        let responder = RecordingResponder::new();
        AvatarFormSubmit.handle(&ctx, &form_submit(1, "Aria"), &responder).await.unwrap();

        let reply = tokio_test::assert_ok!(
            CancelWizard
                .handle(&ctx, &Interaction::new(Kind::Button, "cancel_avatar", 1), &responder)
                .await
        );
        assert!(matches!(reply, Reply::Message(r) if r.content.is_some()));
        assert_eq!(ctx.wizard.state(1).await, WizardState::AwaitingForm);

        let error = tokio_test::assert_err!(
            SpeciesSelect
                .handle(&ctx, &species_select(1, "species_select_1", "elf"), &responder)
                .await
        );
        assert!(matches!(error, BotError::ExpiredSession));
    }
}
