//! Guild-scoped records: welcome settings and reaction-role bindings.

use serde::{Deserialize, Serialize};

/// Per-guild welcome settings. One per guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeConfig {
    pub guild_id: u64,
    pub channel_id: Option<u64>,
    pub message: Option<String>,
    #[serde(default)]
    pub user_role_ids: Vec<u64>,
    #[serde(default)]
    pub bot_role_ids: Vec<u64>,
}

impl WelcomeConfig {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            ..Self::default()
        }
    }

    /// Roles to grant a joining member.
    pub fn roles_for(&self, is_bot: bool) -> &[u64] {
        if is_bot {
            &self.bot_role_ids
        } else {
            &self.user_role_ids
        }
    }
}

/// Reacting with `emoji` on `message_id` grants `role_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRoleBinding {
    pub id: u64,
    pub guild_id: u64,
    pub message_id: u64,
    /// Unicode emoji, or the numeric id of a custom emoji.
    pub emoji: String,
    pub role_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReactionRole {
    pub guild_id: u64,
    pub message_id: u64,
    pub emoji: String,
    pub role_ids: Vec<u64>,
}
