//! Two-step avatar creation.
//!
//! A submitted form is validated and parked per owner until a species is
//! picked. Nothing is persisted before the species step, and a parked form
//! disappears on expiry, on completion, or when the owner submits a new one.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::avatar::cache::AvatarCache;
use crate::avatar::model::{Avatar, NewAvatar};
use crate::avatar::validate;
use crate::common::error::{BotError, BotResult, StoreError};
use crate::common::ttl::TtlCache;
use crate::stats::SpeciesCatalog;
use crate::store::AvatarRepository;

/// Raw fields of the creation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarForm {
    pub name: String,
    pub bracket: String,
    pub icon_url: String,
}

/// Where an owner currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    AwaitingForm,
    AwaitingSpecies(AvatarForm),
}

pub struct AvatarWizard {
    repo: Arc<dyn AvatarRepository>,
    cache: Arc<AvatarCache>,
    catalog: Arc<SpeciesCatalog>,
    sessions: Arc<TtlCache<u64, AvatarForm>>,
}

impl AvatarWizard {
    pub fn new(
        repo: Arc<dyn AvatarRepository>,
        cache: Arc<AvatarCache>,
        catalog: Arc<SpeciesCatalog>,
        ttl: Duration,
    ) -> Self {
        Self {
            repo,
            cache,
            catalog,
            sessions: Arc::new(TtlCache::new(ttl)),
        }
    }

    pub async fn state(&self, owner_id: u64) -> WizardState {
        match self.sessions.get(&owner_id).await {
            Some(form) => WizardState::AwaitingSpecies(form),
            None => WizardState::AwaitingForm,
        }
    }

    /// Validate the form and park it. Every failed rule is reported.
    /// A second submission replaces any pending one.
    pub async fn submit_form(&self, owner_id: u64, form: AvatarForm) -> BotResult<AvatarForm> {
        let form = AvatarForm {
            name: form.name.trim().to_string(),
            bracket: form.bracket.trim().to_string(),
            icon_url: form.icon_url.trim().to_string(),
        };

        let mut errors: Vec<String> = [
            validate::name(&form.name),
            validate::bracket(&form.bracket),
            validate::icon_url(&form.icon_url),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if self.repo.find_by_name(owner_id, &form.name).await?.is_some() {
            errors.push(format!("You already have an avatar named '{}'", form.name));
        }

        if !errors.is_empty() {
            debug!("Avatar form from {} rejected: {:?}", owner_id, errors);
            return Err(BotError::Validation(errors));
        }

        self.sessions.set(owner_id, form.clone()).await;
        Ok(form)
    }

    /// Persist the parked form with the chosen species.
    pub async fn select_species(&self, owner_id: u64, species: &str) -> BotResult<Avatar> {
        if self.catalog.get(species).is_none() {
            return Err(BotError::invalid(format!("Unknown species '{}'", species)));
        }

        let form = self
            .sessions
            .take(&owner_id)
            .await
            .ok_or(BotError::ExpiredSession)?;

        let avatar = self
            .repo
            .create(NewAvatar {
                owner_id,
                name: form.name,
                bracket: form.bracket,
                icon_url: form.icon_url,
                species: species.to_string(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict { .. } => {
                    BotError::invalid("You already have an avatar with that name")
                }
                other => other.into(),
            })?;

        self.cache.invalidate(owner_id).await;
        info!("Avatar {} '{}' created for {}", avatar.id, avatar.name, owner_id);
        Ok(avatar)
    }

    pub async fn abort(&self, owner_id: u64) {
        self.sessions.invalidate(&owner_id).await;
    }

    pub fn sessions(&self) -> &Arc<TtlCache<u64, AvatarForm>> {
        &self.sessions
    }
}
