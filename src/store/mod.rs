//! Persistence contracts.
//!
//! The bot treats storage as an opaque repository. [`JsonStore`] is the
//! shipped implementation.

pub mod json;

use async_trait::async_trait;

use crate::avatar::model::{Avatar, NewAvatar};
use crate::common::error::StoreResult;
use crate::guild::model::{NewReactionRole, ReactionRoleBinding, WelcomeConfig};

pub use json::JsonStore;

/// Avatar CRUD.
#[async_trait]
pub trait AvatarRepository: Send + Sync {
    /// Every avatar of `owner_id`, most recently created first.
    async fn find_all(&self, owner_id: u64) -> StoreResult<Vec<Avatar>>;

    async fn find_by_name(&self, owner_id: u64, name: &str) -> StoreResult<Option<Avatar>>;

    /// Insert at level 1. Fails with `Conflict` if the owner already uses the name.
    async fn create(&self, avatar: NewAvatar) -> StoreResult<Avatar>;

    /// Replace the stored record with the same id.
    async fn update(&self, avatar: &Avatar) -> StoreResult<()>;

    /// Returns whether a record was removed.
    async fn destroy(&self, id: u64) -> StoreResult<bool>;
}

/// Welcome settings and reaction-role bindings.
#[async_trait]
pub trait GuildRepository: Send + Sync {
    async fn find_welcome(&self, guild_id: u64) -> StoreResult<Option<WelcomeConfig>>;

    /// Insert or replace the guild's welcome settings.
    async fn save_welcome(&self, config: WelcomeConfig) -> StoreResult<()>;

    async fn destroy_welcome(&self, guild_id: u64) -> StoreResult<bool>;

    async fn find_all_reaction_roles(&self, guild_id: u64) -> StoreResult<Vec<ReactionRoleBinding>>;

    async fn find_reaction_role(
        &self,
        guild_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> StoreResult<Option<ReactionRoleBinding>>;

    /// Fails with `Conflict` if (message, emoji) is already bound.
    async fn create_reaction_role(&self, binding: NewReactionRole) -> StoreResult<ReactionRoleBinding>;

    async fn destroy_reaction_role(&self, guild_id: u64, id: u64) -> StoreResult<bool>;
}
