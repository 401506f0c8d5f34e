//! JSON-file backed store.
//!
//! The whole document lives in memory behind one lock. Every mutation is
//! applied to a copy, written through a temp file and a rename, and only
//! then swapped in: a failed write leaves both memory and disk unchanged.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::avatar::model::{Avatar, NewAvatar};
use crate::common::error::{StoreError, StoreResult};
use crate::guild::model::{NewReactionRole, ReactionRoleBinding, WelcomeConfig};
use crate::store::{AvatarRepository, GuildRepository};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    next_avatar_id: u64,
    #[serde(default)]
    avatars: Vec<Avatar>,
    #[serde(default)]
    welcome: Vec<WelcomeConfig>,
    #[serde(default)]
    next_reaction_role_id: u64,
    #[serde(default)]
    reaction_roles: Vec<ReactionRoleBinding>,
}

#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    doc: RwLock<Document>,
}

impl JsonStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store at {}, starting empty", path.display());
                Document::default()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        info!(
            "Store opened: {} avatars, {} welcome configs, {} reaction roles",
            doc.avatars.len(),
            doc.welcome.len(),
            doc.reaction_roles.len()
        );
        Ok(Self {
            path: Some(path),
            doc: RwLock::new(doc),
        })
    }

    /// A store that never touches the filesystem.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: RwLock::new(Document::default()),
        }
    }

    async fn persist(&self, doc: &Document) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        let content = serde_json::to_vec_pretty(doc)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        debug!("Store written to {}", path.display());
        Ok(())
    }

    /// Persist `next`, then make it the live document.
    async fn commit(&self, doc: &mut Document, next: Document) -> StoreResult<()> {
        self.persist(&next).await?;
        *doc = next;
        Ok(())
    }
}

#[async_trait]
impl AvatarRepository for JsonStore {
    async fn find_all(&self, owner_id: u64) -> StoreResult<Vec<Avatar>> {
        let doc = self.doc.read().await;
        let mut avatars: Vec<Avatar> = doc
            .avatars
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        avatars.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(avatars)
    }

    async fn find_by_name(&self, owner_id: u64, name: &str) -> StoreResult<Option<Avatar>> {
        let doc = self.doc.read().await;
        Ok(doc
            .avatars
            .iter()
            .find(|a| a.owner_id == owner_id && a.name == name)
            .cloned())
    }

    async fn create(&self, avatar: NewAvatar) -> StoreResult<Avatar> {
        let mut doc = self.doc.write().await;
        if doc
            .avatars
            .iter()
            .any(|a| a.owner_id == avatar.owner_id && a.name == avatar.name)
        {
            return Err(StoreError::Conflict {
                message: format!("owner {} already has an avatar named '{}'", avatar.owner_id, avatar.name),
            });
        }

        let mut next = doc.clone();
        next.next_avatar_id += 1;
        let created = Avatar {
            id: next.next_avatar_id,
            owner_id: avatar.owner_id,
            name: avatar.name,
            bracket: avatar.bracket,
            icon_url: avatar.icon_url,
            species: avatar.species,
            level: 1,
            created_at: Utc::now(),
        };
        next.avatars.push(created.clone());
        self.commit(&mut doc, next).await?;
        Ok(created)
    }

    async fn update(&self, avatar: &Avatar) -> StoreResult<()> {
        let mut doc = self.doc.write().await;
        if doc
            .avatars
            .iter()
            .any(|a| a.id != avatar.id && a.owner_id == avatar.owner_id && a.name == avatar.name)
        {
            return Err(StoreError::Conflict {
                message: format!("owner {} already has an avatar named '{}'", avatar.owner_id, avatar.name),
            });
        }
        let mut next = doc.clone();
        let slot = next
            .avatars
            .iter_mut()
            .find(|a| a.id == avatar.id)
            .ok_or_else(|| StoreError::Missing {
                what: format!("avatar {}", avatar.id),
            })?;
        *slot = avatar.clone();
        self.commit(&mut doc, next).await
    }

    async fn destroy(&self, id: u64) -> StoreResult<bool> {
        let mut doc = self.doc.write().await;
        if !doc.avatars.iter().any(|a| a.id == id) {
            return Ok(false);
        }
        let mut next = doc.clone();
        next.avatars.retain(|a| a.id != id);
        self.commit(&mut doc, next).await?;
        Ok(true)
    }
}

#[async_trait]
impl GuildRepository for JsonStore {
    async fn find_welcome(&self, guild_id: u64) -> StoreResult<Option<WelcomeConfig>> {
        let doc = self.doc.read().await;
        Ok(doc.welcome.iter().find(|w| w.guild_id == guild_id).cloned())
    }

    async fn save_welcome(&self, config: WelcomeConfig) -> StoreResult<()> {
        let mut doc = self.doc.write().await;
        let mut next = doc.clone();
        match next.welcome.iter_mut().find(|w| w.guild_id == config.guild_id) {
            Some(slot) => *slot = config,
            None => next.welcome.push(config),
        }
        self.commit(&mut doc, next).await
    }

    async fn destroy_welcome(&self, guild_id: u64) -> StoreResult<bool> {
        let mut doc = self.doc.write().await;
        if !doc.welcome.iter().any(|w| w.guild_id == guild_id) {
            return Ok(false);
        }
        let mut next = doc.clone();
        next.welcome.retain(|w| w.guild_id != guild_id);
        self.commit(&mut doc, next).await?;
        Ok(true)
    }

    async fn find_all_reaction_roles(&self, guild_id: u64) -> StoreResult<Vec<ReactionRoleBinding>> {
        let doc = self.doc.read().await;
        Ok(doc
            .reaction_roles
            .iter()
            .filter(|r| r.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn find_reaction_role(
        &self,
        guild_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> StoreResult<Option<ReactionRoleBinding>> {
        let doc = self.doc.read().await;
        Ok(doc
            .reaction_roles
            .iter()
            .find(|r| r.guild_id == guild_id && r.message_id == message_id && r.emoji == emoji)
            .cloned())
    }

    async fn create_reaction_role(&self, binding: NewReactionRole) -> StoreResult<ReactionRoleBinding> {
        let mut doc = self.doc.write().await;
        if doc
            .reaction_roles
            .iter()
            .any(|r| r.message_id == binding.message_id && r.emoji == binding.emoji)
        {
            return Err(StoreError::Conflict {
                message: format!(
                    "message {} already binds emoji {}",
                    binding.message_id, binding.emoji
                ),
            });
        }

        let mut next = doc.clone();
        next.next_reaction_role_id += 1;
        let created = ReactionRoleBinding {
            id: next.next_reaction_role_id,
            guild_id: binding.guild_id,
            message_id: binding.message_id,
            emoji: binding.emoji,
            role_ids: binding.role_ids,
        };
        next.reaction_roles.push(created.clone());
        self.commit(&mut doc, next).await?;
        Ok(created)
    }

    async fn destroy_reaction_role(&self, guild_id: u64, id: u64) -> StoreResult<bool> {
        let mut doc = self.doc.write().await;
        let bound = |r: &ReactionRoleBinding| r.guild_id == guild_id && r.id == id;
        if !doc.reaction_roles.iter().any(bound) {
            return Ok(false);
        }
        let mut next = doc.clone();
        next.reaction_roles.retain(|r| !bound(r));
        self.commit(&mut doc, next).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_avatar(owner_id: u64, name: &str) -> NewAvatar {
        NewAvatar {
            owner_id,
            name: name.to_string(),
            bracket: "[text]".to_string(),
            icon_url: "https://example.com/a.png".to_string(),
            species: "human".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_level_one() {
        let store = JsonStore::in_memory();
        let a = store.create(new_avatar(1, "Aria")).await.unwrap();
        let b = store.create(new_avatar(1, "Brom")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(a.level, 1);
    }

    #[tokio::test]
    async fn test_name_unique_per_owner() {
        let store = JsonStore::in_memory();
        store.create(new_avatar(1, "Aria")).await.unwrap();
        assert!(matches!(
            store.create(new_avatar(1, "Aria")).await,
            Err(StoreError::Conflict { .. })
        ));
        assert!(store.create(new_avatar(2, "Aria")).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_all_newest_first() {
        let store = JsonStore::in_memory();
        store.create(new_avatar(1, "First")).await.unwrap();
        store.create(new_avatar(1, "Second")).await.unwrap();
        store.create(new_avatar(2, "Other")).await.unwrap();

        let names: Vec<String> = store
            .find_all(1)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_update_rename_conflict() {
        let store = JsonStore::in_memory();
        store.create(new_avatar(1, "Aria")).await.unwrap();
        let mut brom = store.create(new_avatar(1, "Brom")).await.unwrap();
        brom.name = "Aria".to_string();
        assert!(matches!(
            store.update(&brom).await,
            Err(StoreError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_destroy() {
        let store = JsonStore::in_memory();
        let a = store.create(new_avatar(1, "Aria")).await.unwrap();
        assert!(store.destroy(a.id).await.unwrap());
        assert!(!store.destroy(a.id).await.unwrap());
        assert!(store.find_all(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reaction_role_unique_per_message_emoji() {
        let store = JsonStore::in_memory();
        let binding = NewReactionRole {
            guild_id: 7,
            message_id: 42,
            emoji: "🎲".to_string(),
            role_ids: vec![100, 101],
        };
        let created = store.create_reaction_role(binding.clone()).await.unwrap();
        assert!(store.create_reaction_role(binding).await.is_err());

        let found = store.find_reaction_role(7, 42, "🎲").await.unwrap();
        assert_eq!(found, Some(created.clone()));
        assert!(!store.destroy_reaction_role(8, created.id).await.unwrap());
        assert!(store.destroy_reaction_role(7, created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_welcome_upsert() {
        let store = JsonStore::in_memory();
        let mut config = WelcomeConfig::new(7);
        config.message = Some("hi".to_string());
        store.save_welcome(config.clone()).await.unwrap();
        config.user_role_ids = vec![5];
        store.save_welcome(config.clone()).await.unwrap();
        assert_eq!(store.find_welcome(7).await.unwrap(), Some(config));
        assert!(store.destroy_welcome(7).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        {
            let store = JsonStore::open(&path).await.unwrap();
            store.create(new_avatar(1, "Aria")).await.unwrap();
        }
        let reopened = JsonStore::open(&path).await.unwrap();
        let avatars = reopened.find_all(1).await.unwrap();
        assert_eq!(avatars.len(), 1);
        let next = reopened.create(new_avatar(1, "Brom")).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonStore::open(&path).await.unwrap();
        let aria = store.create(new_avatar(1, "Aria")).await.unwrap();

        // A directory where the temp file goes makes every write fail.
        let blocker = dir.path().join("store.json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(matches!(
            store.create(new_avatar(1, "Brom")).await,
            Err(StoreError::Io { .. })
        ));
        let mut renamed = aria.clone();
        renamed.name = "Cael".to_string();
        assert!(store.update(&renamed).await.is_err());
        assert!(store.destroy(aria.id).await.is_err());
        assert!(store.save_welcome(WelcomeConfig::new(7)).await.is_err());

        assert_eq!(store.find_all(1).await.unwrap(), vec![aria]);
        assert!(store.find_welcome(7).await.unwrap().is_none());

        std::fs::remove_dir(&blocker).unwrap();
        let brom = store.create(new_avatar(1, "Brom")).await.unwrap();
        assert_eq!(brom.id, 2);
    }
}
