//! Shared state handed to every handler.

use std::sync::Arc;

use crate::avatar::{AvatarCache, AvatarWizard};
use crate::config::Environment;
use crate::guild::GuildPatterns;
use crate::render::CardRenderer;
use crate::stats::SpeciesCatalog;
use crate::store::{AvatarRepository, GuildRepository};

pub struct BotContext {
    pub avatars: Arc<dyn AvatarRepository>,
    pub guilds: Arc<dyn GuildRepository>,
    pub cache: Arc<AvatarCache>,
    pub wizard: Arc<AvatarWizard>,
    pub catalog: Arc<SpeciesCatalog>,
    pub renderer: Arc<dyn CardRenderer>,
    pub patterns: GuildPatterns,
    pub environment: Environment,
}

#[cfg(test)]
impl BotContext {
    /// In-memory store, bundled species, rendering disabled.
    pub fn for_tests() -> Self {
        use std::time::Duration;

        use crate::render::DisabledRenderer;
        use crate::store::JsonStore;

        let store = Arc::new(JsonStore::in_memory());
        let catalog = Arc::new(
            SpeciesCatalog::from_json(include_str!("../../data/species.json"))
                .expect("bundled species compile"),
        );
        let cache = Arc::new(AvatarCache::new(store.clone(), Duration::from_secs(300)));
        let wizard = Arc::new(AvatarWizard::new(
            store.clone(),
            cache.clone(),
            catalog.clone(),
            Duration::from_secs(300),
        ));
        Self {
            avatars: store.clone(),
            guilds: store,
            cache,
            wizard,
            catalog,
            renderer: Arc::new(DisabledRenderer),
            patterns: GuildPatterns::new().expect("guild patterns compile"),
            environment: Environment::Development,
        }
    }
}
