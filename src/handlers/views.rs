//! Screens shared by several handlers.

use tracing::{debug, warn};

use crate::avatar::model::{Avatar, Bracket};
use crate::avatar::validate::{MAX_BRACKET_LEN, MAX_ICON_URL_LEN, MAX_NAME_LEN};
use crate::avatar::AvatarForm;
use crate::common::error::BotResult;
use crate::dispatch::response::{
    colour, ActionRow, Attachment, Button, ButtonStyle, Embed, ModalForm, Response, SelectMenu,
    SelectOption, TextInput, MAX_SELECT_OPTIONS,
};
use crate::dispatch::BotContext;
use crate::render::{self, Template};
use crate::stats::MAX_LEVEL;

pub const LIST_SELECT_ID: &str = "avatar";
pub const CREATE_BUTTON_ID: &str = "create_avatar";
pub const REFRESH_BUTTON_ID: &str = "refresh";
pub const BACK_BUTTON_ID: &str = "back";
pub const FORM_ID: &str = "avatar_form";
pub const FORM_NAME: &str = "avatar_name";
pub const FORM_BRACKET: &str = "avatar_bracket";
pub const FORM_ICON: &str = "avatar_icon";
pub const SPECIES_SELECT_PREFIX: &str = "species_select_";
pub const CANCEL_BUTTON_ID: &str = "cancel_avatar";

const PREVIEW_TEXT: &str = "Hello there!";
const TOP_AVATARS: usize = 3;

fn species_emoji<'a>(ctx: &'a BotContext, species: &str) -> &'a str {
    ctx.catalog.get(species).map(|s| s.emoji.as_str()).unwrap_or("👤")
}

/// Every avatar of `owner_id`, newest first, with a picker and a rendered overview.
pub async fn avatar_list(ctx: &BotContext, owner_id: u64, owner_name: &str) -> BotResult<Response> {
    let avatars = ctx.cache.get(owner_id).await?;

    let mut embed = Embed::new()
        .title("👤 Avatars")
        .footer(format!("Avatars of {}", owner_name));
    let mut response = Response::default();

    if avatars.is_empty() {
        embed = embed.description("You have no avatars yet. Create one to start speaking as it.");
    } else {
        let plural = if avatars.len() == 1 { "" } else { "s" };
        embed = embed.description(format!(
            "You have **{}** avatar{}\nSelect one to edit it, or create a new one.",
            avatars.len(),
            plural
        ));

        let mut top: Vec<String> = avatars
            .iter()
            .take(TOP_AVATARS)
            .map(|a| format!("{} **{}** - Level {}", species_emoji(ctx, &a.species), a.name, a.level))
            .collect();
        if avatars.len() > TOP_AVATARS {
            top.push(format!("... and {} more", avatars.len() - TOP_AVATARS));
        }
        embed = embed.field("🌟 Your avatars", top.join("\n"), false);

        match ctx
            .renderer
            .render(Template::Characters, &render::characters_props(&avatars))
            .await
        {
            Ok(bytes) => {
                embed = embed.image("attachment://avatars.png");
                response = response.with_attachment(Attachment {
                    filename: "avatars.png".to_string(),
                    bytes,
                });
            }
            Err(e) => debug!("Avatar overview not rendered: {}", e),
        }

        let options = avatars
            .iter()
            .take(MAX_SELECT_OPTIONS)
            .map(|a| {
                SelectOption::new(a.name.clone(), a.id.to_string())
                    .description(format!("Level {} {}", a.level, ctx.catalog.display_name(&a.species)))
                    .emoji(species_emoji(ctx, &a.species))
            })
            .collect();
        response = response.with_row(ActionRow::Select(
            SelectMenu::new(LIST_SELECT_ID, options).placeholder("Choose an avatar"),
        ));
    }

    response.embeds.push(embed);
    Ok(response.with_row(ActionRow::Buttons(vec![
        Button::new(CREATE_BUTTON_ID, "➕ Create avatar", ButtonStyle::Success),
        Button::new(REFRESH_BUTTON_ID, "🔄 Refresh", ButtonStyle::Secondary),
    ])))
}

/// One avatar with its stats, card and action buttons.
pub async fn avatar_detail(ctx: &BotContext, avatar: &Avatar) -> Response {
    let species = ctx.catalog.display_name(&avatar.species);
    let preview = Bracket::parse(&avatar.bracket)
        .map(|b| b.wrap(PREVIEW_TEXT))
        .unwrap_or_else(|_| avatar.bracket.clone());

    let mut embed = Embed::new()
        .colour(colour::AVATAR)
        .title(format!("{} {}", species_emoji(ctx, &avatar.species), avatar.name))
        .thumbnail(avatar.icon_url.clone())
        .field("Species", species, true)
        .field("Level", format!("{}/{}", avatar.level, MAX_LEVEL), true)
        .field("Bracket", format!("`{}`", avatar.bracket), true)
        .field("Preview", preview, false)
        .footer(format!("Created {}", avatar.created_at.format("%Y-%m-%d")));

    match ctx.catalog.compute(&avatar.species, avatar.level) {
        Some(stats) if !stats.is_empty() => {
            let lines: Vec<String> = stats
                .iter()
                .map(|(attribute, value)| format!("**{}**: {}", attribute, value))
                .collect();
            embed = embed.field("📊 Stats", lines.join("\n"), false);
        }
        Some(_) => {}
        None => warn!(
            "Avatar {} has unknown species '{}', showing no stats",
            avatar.id, avatar.species
        ),
    }

    let mut response = Response::default();
    match ctx
        .renderer
        .render(Template::CharacterCard, &render::card_props(avatar))
        .await
    {
        Ok(bytes) => {
            embed = embed.image("attachment://character.png");
            response = response.with_attachment(Attachment {
                filename: "character.png".to_string(),
                bytes,
            });
        }
        Err(e) => debug!("Character card not rendered: {}", e),
    }
    response.embeds.push(embed);

    let id = avatar.id;
    response
        .with_row(ActionRow::Buttons(vec![
            Button::new(format!("edit_name_{}", id), "✏️ Rename", ButtonStyle::Secondary),
            Button::new(format!("edit_bracket_{}", id), "🔧 Edit bracket", ButtonStyle::Secondary),
            Button::new(format!("edit_avatar_url_{}", id), "🖼️ Edit image", ButtonStyle::Secondary),
        ]))
        .with_row(ActionRow::Buttons(vec![
            Button::new(format!("delete_avatar_{}", id), "🗑️ Delete", ButtonStyle::Danger),
            Button::new(format!("levelup_{}", id), "⬆️ Level up", ButtonStyle::Success)
                .disabled(avatar.level >= MAX_LEVEL),
            Button::new(BACK_BUTTON_ID, "◀️ Back", ButtonStyle::Primary),
        ]))
}

pub fn creation_form() -> ModalForm {
    ModalForm {
        custom_id: FORM_ID.to_string(),
        title: "🎭 Create an avatar".to_string(),
        inputs: vec![
            TextInput::short(FORM_NAME, "Avatar name")
                .placeholder(format!("Up to {} characters", MAX_NAME_LEN))
                .max_length(MAX_NAME_LEN as u16),
            TextInput::short(FORM_BRACKET, "Bracket")
                .placeholder("e.g. [text] or k:text, must contain 'text'")
                .max_length(MAX_BRACKET_LEN as u16),
            TextInput::short(FORM_ICON, "Image link")
                .placeholder("https://example.com/avatar.png")
                .max_length(MAX_ICON_URL_LEN as u16),
        ],
    }
}

/// Second wizard step: preview of the parked form and the species picker.
pub fn species_picker(ctx: &BotContext, owner_id: u64, form: &AvatarForm) -> Response {
    let preview = Bracket::parse(&form.bracket)
        .map(|b| b.wrap(PREVIEW_TEXT))
        .unwrap_or_else(|_| form.bracket.clone());

    let embed = Embed::new()
        .colour(colour::AVATAR)
        .title(format!("🎭 {}", form.name))
        .description("Pick a species to finish creating your avatar.")
        .thumbnail(form.icon_url.clone())
        .field("Bracket", format!("`{}`", form.bracket), true)
        .field("Preview", preview, true);

    let options = ctx
        .catalog
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|species| {
            SelectOption::new(species.display.clone(), species.key.clone()).emoji(species.emoji.clone())
        })
        .collect();

    Response::embed(embed)
        .with_row(ActionRow::Select(
            SelectMenu::new(format!("{}{}", SPECIES_SELECT_PREFIX, owner_id), options)
                .placeholder("Choose a species"),
        ))
        .with_row(ActionRow::Buttons(vec![Button::new(
            CANCEL_BUTTON_ID,
            "✖️ Cancel",
            ButtonStyle::Secondary,
        )]))
}
