//! Outbound messages, components and forms, independent of the gateway
//! library. [`Response::validate`] enforces the platform payload limits.

use crate::common::error::LimitError;

pub const MAX_TITLE: usize = 256;
pub const MAX_DESCRIPTION: usize = 4096;
pub const MAX_FIELDS: usize = 25;
pub const MAX_FIELD_NAME: usize = 256;
pub const MAX_FIELD_VALUE: usize = 1024;
pub const MAX_SELECT_OPTIONS: usize = 25;
pub const MAX_CHOICES: usize = 25;
pub const MAX_EMBEDS: usize = 10;
pub const MAX_ROWS: usize = 5;

/// Fixed palette.
pub mod colour {
    pub const PRIMARY: u32 = 0x5865F2;
    pub const SUCCESS: u32 = 0x57F287;
    pub const WARNING: u32 = 0xFEE75C;
    pub const ERROR: u32 = 0xED4245;
    pub const AVATAR: u32 = 0x3498DB;
    pub const LEVEL_UP: u32 = 0xF39C12;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub colour: u32,
    pub fields: Vec<Field>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub footer: Option<String>,
}

impl Default for Embed {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            colour: colour::PRIMARY,
            fields: Vec::new(),
            thumbnail: None,
            image: None,
            footer: None,
        }
    }
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = colour;
        self
    }

    /// Empty values are replaced by a zero-width space; the platform rejects blank fields.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        let value = value.into();
        self.fields.push(Field {
            name: name.into(),
            value: if value.is_empty() { "\u{200B}".to_string() } else { value },
            inline,
        });
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    fn validate(&self) -> Result<(), LimitError> {
        if let Some(title) = &self.title {
            let len = title.chars().count();
            if len > MAX_TITLE {
                return Err(LimitError::Title { len, max: MAX_TITLE });
            }
        }
        if let Some(description) = &self.description {
            let len = description.chars().count();
            if len > MAX_DESCRIPTION {
                return Err(LimitError::Description { len, max: MAX_DESCRIPTION });
            }
        }
        if self.fields.len() > MAX_FIELDS {
            return Err(LimitError::FieldCount {
                count: self.fields.len(),
                max: MAX_FIELDS,
            });
        }
        for field in &self.fields {
            let len = field.name.chars().count();
            if len > MAX_FIELD_NAME {
                return Err(LimitError::FieldName { len, max: MAX_FIELD_NAME });
            }
            let len = field.value.chars().count();
            if len > MAX_FIELD_VALUE {
                return Err(LimitError::FieldValue { len, max: MAX_FIELD_VALUE });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
            emoji: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
}

impl SelectMenu {
    pub fn new(custom_id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            custom_id: custom_id.into(),
            placeholder: None,
            options,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRow {
    Buttons(Vec<Button>),
    Select(SelectMenu),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A message sent in answer to an interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    pub attachments: Vec<Attachment>,
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    pub fn success(title: &str, description: impl Into<String>) -> Self {
        Self::embed(
            Embed::new()
                .colour(colour::SUCCESS)
                .title(format!("✅ {}", title))
                .description(description),
        )
    }

    pub fn warning(title: &str, description: impl Into<String>) -> Self {
        Self::embed(
            Embed::new()
                .colour(colour::WARNING)
                .title(format!("⚠️ {}", title))
                .description(description),
        )
    }

    /// Error card, with `details` in a code block when given.
    pub fn error(title: &str, description: &str, details: Option<&str>) -> Self {
        let mut embed = Embed::new()
            .colour(colour::ERROR)
            .title(format!("❌ {}", title))
            .description(description)
            .footer("If this persists, please contact support");
        if let Some(details) = details {
            let details: String = details.chars().take(MAX_FIELD_VALUE - 6).collect();
            embed = embed.field("Details", format!("```{}```", details), false);
        }
        Self::embed(embed)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_row(mut self, row: ActionRow) -> Self {
        self.components.push(row);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn validate(&self) -> Result<(), LimitError> {
        if self.embeds.len() > MAX_EMBEDS {
            return Err(LimitError::EmbedCount {
                count: self.embeds.len(),
                max: MAX_EMBEDS,
            });
        }
        if self.components.len() > MAX_ROWS {
            return Err(LimitError::RowCount {
                count: self.components.len(),
                max: MAX_ROWS,
            });
        }
        for embed in &self.embeds {
            embed.validate()?;
        }
        for row in &self.components {
            if let ActionRow::Select(menu) = row {
                if menu.options.len() > MAX_SELECT_OPTIONS {
                    return Err(LimitError::SelectOptions {
                        count: menu.options.len(),
                        max: MAX_SELECT_OPTIONS,
                    });
                }
            }
        }
        Ok(())
    }
}

/// A single-line text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub custom_id: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub max_length: Option<u16>,
    pub required: bool,
}

impl TextInput {
    pub fn short(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            placeholder: None,
            max_length: None,
            required: true,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn max_length(mut self, max_length: u16) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// A pop-up form. Must be the first answer to an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalForm {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInput>,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Message(Response),
    Modal(ModalForm),
    Choices(Vec<Choice>),
    /// The handler already answered, or there is nothing to say.
    Silent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_accept_boundaries() {
        let mut embed = Embed::new()
            .title("t".repeat(MAX_TITLE))
            .description("d".repeat(MAX_DESCRIPTION));
        for i in 0..MAX_FIELDS {
            embed = embed.field(format!("f{}", i), "v".repeat(MAX_FIELD_VALUE), true);
        }
        assert_eq!(Response::embed(embed).validate(), Ok(()));
    }

    #[test]
    fn test_limits_reject_overflow() {
        let title = Response::embed(Embed::new().title("é".repeat(MAX_TITLE + 1)));
        assert_eq!(
            title.validate(),
            Err(LimitError::Title { len: 257, max: 256 })
        );

        let value = Response::embed(Embed::new().field("n", "v".repeat(1025), false));
        assert!(matches!(value.validate(), Err(LimitError::FieldValue { .. })));

        let options = (0..26).map(|i| SelectOption::new(i.to_string(), i.to_string())).collect();
        let select = Response::text("x").with_row(ActionRow::Select(SelectMenu::new("s", options)));
        assert!(matches!(select.validate(), Err(LimitError::SelectOptions { count: 26, .. })));
    }

    #[test]
    fn test_error_details_fit_field() {
        let long = "x".repeat(5000);
        let response = Response::error("Oops", "desc", Some(&long));
        assert_eq!(response.validate(), Ok(()));
    }

    #[test]
    fn test_empty_field_value_is_padded() {
        let embed = Embed::new().field("name", "", false);
        assert_eq!(embed.fields[0].value, "\u{200B}");
    }
}
