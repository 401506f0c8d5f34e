//! Read-through cache of each owner's avatars.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::avatar::model::Avatar;
use crate::common::error::StoreResult;
use crate::common::ttl::TtlCache;
use crate::store::AvatarRepository;

/// One entry per owner, newest avatar first. The repository stays the
/// source of truth; every mutation must call [`AvatarCache::invalidate`].
pub struct AvatarCache {
    repo: Arc<dyn AvatarRepository>,
    entries: Arc<TtlCache<u64, Arc<Vec<Avatar>>>>,
}

impl AvatarCache {
    pub fn new(repo: Arc<dyn AvatarRepository>, ttl: Duration) -> Self {
        Self {
            repo,
            entries: Arc::new(TtlCache::new(ttl)),
        }
    }

    pub async fn get(&self, owner_id: u64) -> StoreResult<Arc<Vec<Avatar>>> {
        if let Some(avatars) = self.entries.get(&owner_id).await {
            return Ok(avatars);
        }
        debug!("Avatar cache miss for {}", owner_id);
        let avatars = Arc::new(self.repo.find_all(owner_id).await?);
        self.entries.set(owner_id, Arc::clone(&avatars)).await;
        Ok(avatars)
    }

    /// The owner's avatar with `id`, if the owner has one.
    pub async fn find_owned(&self, owner_id: u64, id: u64) -> StoreResult<Option<Avatar>> {
        Ok(self.get(owner_id).await?.iter().find(|a| a.id == id).cloned())
    }

    pub async fn invalidate(&self, owner_id: u64) {
        self.entries.invalidate(&owner_id).await;
    }

    pub fn entries(&self) -> &Arc<TtlCache<u64, Arc<Vec<Avatar>>>> {
        &self.entries
    }
}
