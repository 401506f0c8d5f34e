//! serenity <-> core conversions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serenity::builder::{
    CreateActionRow, CreateAttachment, CreateAutocompleteResponse, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateInputText, CreateInteractionResponseMessage, CreateModal,
    CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, EditAttachments,
    EditInteractionResponse,
};
use serenity::model::application::{
    ActionRowComponent, ButtonStyle as SerenityButtonStyle, CommandDataOption,
    CommandDataOptionValue, CommandInteraction, ComponentInteraction, ComponentInteractionDataKind,
    InputTextStyle, Interaction as SerenityInteraction, ModalInteraction,
};
use serenity::model::channel::ReactionType;
use serenity::model::guild::Member;
use serenity::model::user::User;

use crate::dispatch::interaction::{CommandArgs, Interaction, Kind, OptionValue, Payload};
use crate::dispatch::response::{
    ActionRow, ButtonStyle, Choice, Embed, ModalForm, Response,
};

/// Milliseconds between the Unix epoch and the first Discord snowflake.
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a snowflake.
pub fn snowflake_time(id: u64) -> DateTime<Utc> {
    let millis = (id >> 22) + DISCORD_EPOCH_MS;
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

/// The interaction a responder answers.
#[derive(Debug, Clone)]
pub enum Target {
    Command(CommandInteraction),
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

fn display_name(user: &User, member: Option<&Member>) -> String {
    member
        .and_then(|m| m.nick.clone())
        .or_else(|| user.global_name.clone())
        .unwrap_or_else(|| user.name.clone())
}

fn base(
    kind: Kind,
    identifier: &str,
    id: u64,
    user: &User,
    member: Option<&Member>,
    guild_id: Option<u64>,
    channel_id: u64,
) -> Interaction {
    let mut interaction = Interaction::new(kind, identifier, user.id.get());
    interaction.user_name = display_name(user, member);
    if let Some(guild_id) = guild_id {
        interaction = interaction.with_guild(guild_id);
    }
    interaction.channel_id = Some(channel_id);
    interaction.created_at = snowflake_time(id);
    interaction
}

/// Core interaction plus the handle to answer it. `None` for pings and
/// interaction types the bot does not use.
pub fn interaction(raw: SerenityInteraction) -> Option<(Interaction, Target)> {
    match raw {
        SerenityInteraction::Command(command) => {
            let args = command_args(&command.data.options);
            let interaction = base(
                Kind::Slash,
                &command.data.name,
                command.id.get(),
                &command.user,
                command.member.as_deref(),
                command.guild_id.map(|id| id.get()),
                command.channel_id.get(),
            )
            .with_payload(Payload::Command(args));
            Some((interaction, Target::Command(command)))
        }
        SerenityInteraction::Autocomplete(command) => {
            let (option, value) = focused(&command.data.options).unwrap_or_default();
            let interaction = base(
                Kind::Autocomplete,
                &command.data.name,
                command.id.get(),
                &command.user,
                command.member.as_deref(),
                command.guild_id.map(|id| id.get()),
                command.channel_id.get(),
            )
            .with_payload(Payload::Autocomplete { option, value });
            Some((interaction, Target::Command(command)))
        }
        SerenityInteraction::Component(component) => {
            let (kind, payload) = match &component.data.kind {
                ComponentInteractionDataKind::Button => (Kind::Button, Payload::Empty),
                ComponentInteractionDataKind::StringSelect { values } => {
                    (Kind::Select, Payload::Values(values.clone()))
                }
                _ => return None,
            };
            let interaction = base(
                kind,
                &component.data.custom_id,
                component.id.get(),
                &component.user,
                component.member.as_ref(),
                component.guild_id.map(|id| id.get()),
                component.channel_id.get(),
            )
            .with_payload(payload);
            Some((interaction, Target::Component(component)))
        }
        SerenityInteraction::Modal(modal) => {
            let fields: BTreeMap<String, String> = modal
                .data
                .components
                .iter()
                .flat_map(|row| row.components.iter())
                .filter_map(|component| match component {
                    ActionRowComponent::InputText(input) => Some((
                        input.custom_id.clone(),
                        input.value.clone().unwrap_or_default(),
                    )),
                    _ => None,
                })
                .collect();
            let interaction = base(
                Kind::Modal,
                &modal.data.custom_id,
                modal.id.get(),
                &modal.user,
                modal.member.as_ref(),
                modal.guild_id.map(|id| id.get()),
                modal.channel_id.get(),
            )
            .with_payload(Payload::Fields(fields));
            Some((interaction, Target::Modal(modal)))
        }
        _ => None,
    }
}

fn option_value(value: &CommandDataOptionValue) -> Option<OptionValue> {
    Some(match value {
        CommandDataOptionValue::String(s) => OptionValue::Str(s.clone()),
        CommandDataOptionValue::Integer(n) => OptionValue::Int(*n),
        CommandDataOptionValue::Number(n) => OptionValue::Str(n.to_string()),
        CommandDataOptionValue::Boolean(b) => OptionValue::Bool(*b),
        CommandDataOptionValue::Channel(id) => OptionValue::Id(id.get()),
        CommandDataOptionValue::Role(id) => OptionValue::Id(id.get()),
        CommandDataOptionValue::User(id) => OptionValue::Id(id.get()),
        CommandDataOptionValue::Mentionable(id) => OptionValue::Id(id.get()),
        _ => return None,
    })
}

/// Flatten one level of subcommand (or group + subcommand) into `CommandArgs`.
fn command_args(options: &[CommandDataOption]) -> CommandArgs {
    let mut args = CommandArgs::default();
    let mut leaves = options;
    if let Some(first) = options.first() {
        match &first.value {
            CommandDataOptionValue::SubCommand(nested) => {
                args.subcommand = Some(first.name.clone());
                leaves = nested;
            }
            CommandDataOptionValue::SubCommandGroup(nested) => {
                if let Some(sub) = nested.first() {
                    args.subcommand = Some(sub.name.clone());
                    if let CommandDataOptionValue::SubCommand(inner) = &sub.value {
                        leaves = inner;
                    }
                }
            }
            _ => {}
        }
    }
    for option in leaves {
        if let Some(value) = option_value(&option.value) {
            args.options.insert(option.name.clone(), value);
        }
    }
    args
}

/// Name and typed text of the focused autocomplete option, searched through subcommands.
fn focused(options: &[CommandDataOption]) -> Option<(String, String)> {
    options.iter().find_map(|option| match &option.value {
        CommandDataOptionValue::Autocomplete { value, .. } => Some((option.name.clone(), value.clone())),
        CommandDataOptionValue::SubCommand(nested) | CommandDataOptionValue::SubCommandGroup(nested) => {
            focused(nested)
        }
        _ => None,
    })
}

fn embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new().colour(embed.colour);
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, field.inline);
    }
    if let Some(url) = &embed.thumbnail {
        builder = builder.thumbnail(url);
    }
    if let Some(url) = &embed.image {
        builder = builder.image(url);
    }
    if let Some(text) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(text));
    }
    builder
}

fn button_style(style: ButtonStyle) -> SerenityButtonStyle {
    match style {
        ButtonStyle::Primary => SerenityButtonStyle::Primary,
        ButtonStyle::Secondary => SerenityButtonStyle::Secondary,
        ButtonStyle::Success => SerenityButtonStyle::Success,
        ButtonStyle::Danger => SerenityButtonStyle::Danger,
    }
}

fn rows(rows: &[ActionRow]) -> Vec<CreateActionRow> {
    rows.iter()
        .map(|row| match row {
            ActionRow::Buttons(buttons) => CreateActionRow::Buttons(
                buttons
                    .iter()
                    .map(|b| {
                        CreateButton::new(&b.custom_id)
                            .label(&b.label)
                            .style(button_style(b.style))
                            .disabled(b.disabled)
                    })
                    .collect(),
            ),
            ActionRow::Select(menu) => {
                let options = menu
                    .options
                    .iter()
                    .map(|o| {
                        let mut option = CreateSelectMenuOption::new(&o.label, &o.value);
                        if let Some(description) = &o.description {
                            option = option.description(description);
                        }
                        if let Some(emoji) = &o.emoji {
                            option = option.emoji(ReactionType::Unicode(emoji.clone()));
                        }
                        option
                    })
                    .collect();
                let mut select = CreateSelectMenu::new(&menu.custom_id, CreateSelectMenuKind::String { options });
                if let Some(placeholder) = &menu.placeholder {
                    select = select.placeholder(placeholder);
                }
                CreateActionRow::SelectMenu(select)
            }
        })
        .collect()
}

fn attachments(response: &Response) -> Vec<CreateAttachment> {
    response
        .attachments
        .iter()
        .map(|a| CreateAttachment::bytes(a.bytes.clone(), a.filename.clone()))
        .collect()
}

/// Replaces the whole previous answer, attachments included.
pub fn edit(response: &Response) -> EditInteractionResponse {
    let files = attachments(response)
        .into_iter()
        .fold(EditAttachments::new(), |acc, file| acc.add(file));
    EditInteractionResponse::new()
        .content(response.content.clone().unwrap_or_default())
        .embeds(response.embeds.iter().map(embed).collect())
        .components(rows(&response.components))
        .attachments(files)
}

pub fn message(response: &Response) -> CreateInteractionResponseMessage {
    let mut builder = CreateInteractionResponseMessage::new()
        .embeds(response.embeds.iter().map(embed).collect())
        .components(rows(&response.components))
        .add_files(attachments(response));
    if let Some(content) = &response.content {
        builder = builder.content(content);
    }
    builder
}

pub fn modal(form: &ModalForm) -> CreateModal {
    let inputs = form
        .inputs
        .iter()
        .map(|input| {
            let mut text = CreateInputText::new(InputTextStyle::Short, &input.label, &input.custom_id).required(input.required);
            if let Some(placeholder) = &input.placeholder {
                text = text.placeholder(placeholder);
            }
            if let Some(max) = input.max_length {
                text = text.max_length(max);
            }
            CreateActionRow::InputText(text)
        })
        .collect();
    CreateModal::new(&form.custom_id, &form.title).components(inputs)
}

pub fn choices(choices: &[Choice]) -> CreateAutocompleteResponse {
    choices.iter().fold(CreateAutocompleteResponse::new(), |acc, choice| {
        acc.add_string_choice(&choice.name, &choice.value)
    })
}

/// Reaction emoji as stored by reaction-role bindings.
pub fn reaction_key(emoji: &ReactionType) -> Option<String> {
    match emoji {
        ReactionType::Custom { id, .. } => Some(id.get().to_string()),
        ReactionType::Unicode(unicode) => Some(crate::guild::parse::unicode_key(unicode)),
        _ => None,
    }
}
