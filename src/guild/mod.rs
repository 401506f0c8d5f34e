//! Guild features: welcome messages and reaction roles.

pub mod model;
pub mod parse;
pub mod welcome;

pub use model::{NewReactionRole, ReactionRoleBinding, WelcomeConfig};
pub use parse::GuildPatterns;
pub use welcome::{JoinContext, JoinPlan};
