//! Species catalog and the stat computation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::common::error::FormulaError;
use crate::stats::formula::Formula;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 100;

/// Attribute name -> value. Ordered by attribute name.
pub type StatBlock = BTreeMap<String, u32>;

/// How one attribute grows with level.
#[derive(Debug, Clone)]
pub enum StatRule {
    /// `floor(base + per_level * (level - 1))`
    Linear { base: f64, per_level: f64 },
    /// Compiled arithmetic over `level`.
    Symbolic(Formula),
}

impl StatRule {
    pub fn value_at(&self, level: u8) -> u32 {
        let level = f64::from(level.clamp(MIN_LEVEL, MAX_LEVEL));
        let raw = match self {
            StatRule::Linear { base, per_level } => base + per_level * (level - 1.0),
            StatRule::Symbolic(formula) => formula.eval(level),
        };
        to_stat(raw)
    }
}

/// Non-finite and negative results collapse to zero.
fn to_stat(raw: f64) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.floor().min(f64::from(u32::MAX)) as u32
}

#[derive(Debug, Clone)]
pub struct Species {
    pub key: String,
    pub display: String,
    pub emoji: String,
    pub rules: BTreeMap<String, StatRule>,
}

/// Read-only table of every selectable species.
#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    species: BTreeMap<String, Species>,
}

#[derive(Debug, Deserialize)]
struct RawSpecies {
    display: String,
    #[serde(default)]
    emoji: Option<String>,
    #[serde(default)]
    stats: BTreeMap<String, RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Linear {
        base: f64,
        #[serde(rename = "perLevel")]
        per_level: f64,
    },
    Symbolic {
        expr: String,
    },
}

impl SpeciesCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FormulaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FormulaError::Catalog {
            message: format!("{}: {}", path.display(), e),
        })?;
        let catalog = Self::from_json(&content)?;
        info!(
            "Loaded {} species from {}",
            catalog.species.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse and compile every formula. Any bad formula fails the whole load.
    pub fn from_json(content: &str) -> Result<Self, FormulaError> {
        let raw: BTreeMap<String, RawSpecies> =
            serde_json::from_str(content).map_err(|e| FormulaError::Catalog {
                message: e.to_string(),
            })?;

        let mut species = BTreeMap::new();
        for (key, entry) in raw {
            let rules = compile_rules(&key, &entry.stats)?;
            species.insert(
                key.clone(),
                Species {
                    key,
                    display: entry.display,
                    emoji: entry.emoji.unwrap_or_else(|| "✨".to_string()),
                    rules,
                },
            );
        }
        Ok(Self { species })
    }

    pub fn get(&self, key: &str) -> Option<&Species> {
        self.species.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map(|s| s.display.as_str()).unwrap_or(key)
    }

    /// Attribute values for `species` at `level`, or `None` for an unknown species.
    pub fn compute(&self, species: &str, level: u8) -> Option<StatBlock> {
        let species = self.species.get(species)?;
        Some(
            species
                .rules
                .iter()
                .map(|(attribute, rule)| (attribute.clone(), rule.value_at(level)))
                .collect(),
        )
    }
}

fn compile_rules(
    species: &str,
    raw: &BTreeMap<String, RawRule>,
) -> Result<BTreeMap<String, StatRule>, FormulaError> {
    let lookup = |attribute: &str, field: &str| match raw.get(attribute) {
        Some(RawRule::Linear { base, per_level }) => match field {
            "base" => Some(*base),
            "perLevel" => Some(*per_level),
            _ => None,
        },
        _ => None,
    };

    raw.iter()
        .map(|(attribute, rule)| -> Result<(String, StatRule), FormulaError> {
            let compiled = match rule {
                RawRule::Linear { base, per_level } => StatRule::Linear {
                    base: *base,
                    per_level: *per_level,
                },
                RawRule::Symbolic { expr } => StatRule::Symbolic(
                    Formula::compile(expr, &lookup).map_err(|source| {
                        FormulaError::InAttribute {
                            species: species.to_string(),
                            attribute: attribute.clone(),
                            source: Box::new(source),
                        }
                    })?,
                ),
            };
            Ok((attribute.clone(), compiled))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "human": {
            "display": "Human",
            "emoji": "👤",
            "stats": {
                "vitality": { "base": 10, "perLevel": 2 },
                "agility": { "base": 5.5, "perLevel": 0.5 },
                "focus": { "expr": "vitality.base + level * 3" },
                "doom": { "expr": "5 - level" },
                "void": { "expr": "level / 0" }
            }
        },
        "wolf": {
            "display": "Wolf",
            "stats": { "strength": { "base": 12, "perLevel": 3 } }
        }
    }"#;

    fn catalog() -> SpeciesCatalog {
        SpeciesCatalog::from_json(CATALOG).unwrap()
    }

    #[test]
    fn test_linear_rule() {
        let stats = catalog().compute("human", 5).unwrap();
        assert_eq!(stats["vitality"], 18);
        // floor(5.5 + 0.5 * 4)
        assert_eq!(stats["agility"], 7);
    }

    #[test]
    fn test_symbolic_rule_reads_own_table() {
        let stats = catalog().compute("human", 5).unwrap();
        assert_eq!(stats["focus"], 25);
    }

    #[test]
    fn test_negative_and_non_finite_clamp_to_zero() {
        let stats = catalog().compute("human", 10).unwrap();
        assert_eq!(stats["doom"], 0);
        assert_eq!(stats["void"], 0);
    }

    #[test]
    fn test_deterministic_over_level_range() {
        let catalog = catalog();
        for level in MIN_LEVEL..=MAX_LEVEL {
            let first = catalog.compute("human", level);
            let second = catalog.compute("human", level);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_level_is_clamped() {
        let catalog = catalog();
        assert_eq!(catalog.compute("wolf", 0), catalog.compute("wolf", 1));
        assert_eq!(catalog.compute("wolf", 200), catalog.compute("wolf", 100));
    }

    #[test]
    fn test_unknown_species() {
        assert!(catalog().compute("kraken", 1).is_none());
        assert_eq!(catalog().display_name("kraken"), "kraken");
        assert_eq!(catalog().display_name("wolf"), "Wolf");
    }

    #[test]
    fn test_default_emoji() {
        assert_eq!(catalog().get("wolf").unwrap().emoji, "✨");
    }

    #[test]
    fn test_bad_formula_names_species_and_attribute() {
        let json = r#"{ "elf": { "display": "Elf", "stats": { "grace": { "expr": "eval(1)" } } } }"#;
        let err = SpeciesCatalog::from_json(json).unwrap_err();
        assert!(err.to_string().contains("elf"));
        assert!(err.to_string().contains("grace"));
    }

    #[test]
    fn test_shipped_catalog_compiles() {
        let content = include_str!("../../data/species.json");
        let catalog = SpeciesCatalog::from_json(content).unwrap();
        assert_eq!(catalog.compute("human", 5).unwrap()["vitality"], 18);
        assert!(catalog.iter().count() <= 25);
    }
}
