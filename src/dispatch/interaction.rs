//! Platform-neutral view of an inbound interaction.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// What produced the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Slash,
    Button,
    Select,
    Modal,
    Autocomplete,
}

impl Kind {
    /// Folder-style prefix handlers of this kind are usually registered under.
    pub fn folder(self) -> &'static str {
        match self {
            Kind::Slash => "commands",
            Kind::Button => "buttons",
            Kind::Select => "selects",
            Kind::Modal => "modals",
            Kind::Autocomplete => "autocomplete",
        }
    }

    /// The kind a key segment stands for, by label (`button`) or folder (`buttons`).
    pub fn from_segment(segment: &str) -> Option<Kind> {
        [Kind::Slash, Kind::Button, Kind::Select, Kind::Modal, Kind::Autocomplete]
            .into_iter()
            .find(|kind| segment == kind.folder() || segment == kind.to_string())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Kind::Slash => "slash",
            Kind::Button => "button",
            Kind::Select => "select",
            Kind::Modal => "modal",
            Kind::Autocomplete => "autocomplete",
        };
        f.write_str(label)
    }
}

/// A slash command option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Bool(bool),
    /// User, role, channel or mentionable.
    Id(u64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    pub subcommand: Option<String>,
    pub options: BTreeMap<String, OptionValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Command(CommandArgs),
    Autocomplete { option: String, value: String },
    /// Selected values of a select menu.
    Values(Vec<String>),
    /// Modal text inputs by custom id.
    Fields(BTreeMap<String, String>),
}

#[derive(Debug, Clone)]
pub struct Interaction {
    pub kind: Kind,
    /// Command name or component custom id.
    pub identifier: String,
    pub user_id: u64,
    pub user_name: String,
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub payload: Payload,
}

impl Interaction {
    pub fn new(kind: Kind, identifier: impl Into<String>, user_id: u64) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            user_id,
            user_name: String::new(),
            guild_id: None,
            channel_id: None,
            created_at: Utc::now(),
            payload: Payload::Empty,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn subcommand(&self) -> Option<&str> {
        match &self.payload {
            Payload::Command(args) => args.subcommand.as_deref(),
            _ => None,
        }
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        match &self.payload {
            Payload::Command(args) => args.options.get(name),
            _ => None,
        }
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        match self.option(name)? {
            OptionValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// An option carrying an id, accepting ids sent as strings or integers.
    pub fn option_id(&self, name: &str) -> Option<u64> {
        match self.option(name)? {
            OptionValue::Id(id) => Some(*id),
            OptionValue::Int(n) => u64::try_from(*n).ok(),
            OptionValue::Str(s) => s.trim().parse().ok(),
            OptionValue::Bool(_) => None,
        }
    }

    pub fn first_value(&self) -> Option<&str> {
        match &self.payload {
            Payload::Values(values) => values.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn field(&self, custom_id: &str) -> Option<&str> {
        match &self.payload {
            Payload::Fields(fields) => fields.get(custom_id).map(String::as_str),
            _ => None,
        }
    }

    /// Text typed so far in the focused autocomplete option.
    pub fn focused(&self) -> &str {
        match &self.payload {
            Payload::Autocomplete { value, .. } => value,
            _ => "",
        }
    }

    /// Numeric tail of a parameterized custom id such as `edit_name_42`.
    pub fn id_suffix(&self) -> Option<u64> {
        self.identifier.rsplit_once('_')?.1.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_suffix() {
        assert_eq!(Interaction::new(Kind::Button, "edit_name_42", 1).id_suffix(), Some(42));
        assert_eq!(Interaction::new(Kind::Button, "back", 1).id_suffix(), None);
        assert_eq!(Interaction::new(Kind::Button, "edit_name_", 1).id_suffix(), None);
    }

    #[test]
    fn test_option_id_accepts_strings() {
        let mut args = CommandArgs::default();
        args.options.insert("message_id".into(), OptionValue::Str(" 1234 ".into()));
        args.options.insert("channel".into(), OptionValue::Id(9));
        let interaction = Interaction::new(Kind::Slash, "rr", 1).with_payload(Payload::Command(args));
        assert_eq!(interaction.option_id("message_id"), Some(1234));
        assert_eq!(interaction.option_id("channel"), Some(9));
        assert_eq!(interaction.option_id("missing"), None);
    }

    #[test]
    fn test_kind_segments() {
        for kind in [Kind::Slash, Kind::Button, Kind::Select, Kind::Modal, Kind::Autocomplete] {
            assert_eq!(Kind::from_segment(kind.folder()), Some(kind));
            assert_eq!(Kind::from_segment(&kind.to_string()), Some(kind));
        }
        assert_eq!(Kind::from_segment("avatar"), None);
    }
}
