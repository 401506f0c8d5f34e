//! Avatar personas: records, validation, caching and the creation wizard.

pub mod cache;
pub mod model;
pub mod validate;
pub mod wizard;

pub use cache::AvatarCache;
pub use wizard::{AvatarForm, AvatarWizard, WizardState};
