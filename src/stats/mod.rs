//! Per-species stat formulas.

pub mod formula;
pub mod species;

pub use species::{SpeciesCatalog, MAX_LEVEL};
