//! Parsing of role lists and emoji arguments from slash command options.

use fancy_regex::Regex;

/// Compiled once at startup and shared by the guild handlers.
#[derive(Debug, Clone)]
pub struct GuildPatterns {
    role_mention: Regex,
    custom_emoji: Regex,
}

impl GuildPatterns {
    pub fn new() -> Result<Self, fancy_regex::Error> {
        Ok(Self {
            role_mention: Regex::new(r"^<@&(\d+)>$")?,
            custom_emoji: Regex::new(r"^<a?:\w+:(\d+)>$")?,
        })
    }

    /// Role ids from mentions (`<@&id>`) or raw ids, separated by commas or
    /// whitespace. Duplicates are dropped; unparseable tokens are reported.
    pub fn role_ids(&self, input: &str) -> Result<Vec<u64>, Vec<String>> {
        let mut ids = Vec::new();
        let mut errors = Vec::new();

        for token in input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let id = match self.role_mention.captures(token) {
                Ok(Some(caps)) => caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok()),
                _ => token.parse::<u64>().ok(),
            };
            match id {
                Some(id) if id != 0 => {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                _ => errors.push(format!("'{}' is not a role", token)),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        if ids.is_empty() {
            return Err(vec!["Provide at least one role".to_string()]);
        }
        Ok(ids)
    }

    /// Storage key for an emoji argument: the id of a custom emoji, or the
    /// canonical form of a unicode emoji.
    pub fn emoji_key(&self, input: &str) -> Result<String, String> {
        let input = input.trim();
        if let Ok(Some(caps)) = self.custom_emoji.captures(input) {
            if let Some(id) = caps.get(1) {
                return Ok(id.as_str().to_string());
            }
        }
        emojis::get(input)
            .map(|e| e.as_str().to_string())
            .ok_or_else(|| format!("'{}' is not an emoji", input))
    }
}

/// Canonical key for a unicode emoji seen on a reaction.
pub fn unicode_key(emoji: &str) -> String {
    emojis::get(emoji)
        .map(|e| e.as_str().to_string())
        .unwrap_or_else(|| emoji.to_string())
}

/// A snowflake given as a string option.
pub fn snowflake(input: &str) -> Option<u64> {
    input.trim().parse().ok().filter(|id| *id != 0)
}
