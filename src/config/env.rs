//! Environment variable overrides for configuration.
//!
//! - `MASQUERADE_CONFIG` - config file path
//! - `MASQUERADE_DISCORD_TOKEN` - Discord bot token
//! - `MASQUERADE_GUILD_ID` - guild for command registration
//! - `MASQUERADE_ENV` - `production` or `development`

use std::env;

use tracing::warn;

use crate::config::types::{Config, Environment};

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "MASQUERADE";

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(guild_id) = env::var(format!("{}_GUILD_ID", ENV_PREFIX)) {
        match guild_id.parse() {
            Ok(id) => config.discord.guild_id = Some(id),
            Err(_) => warn!("Ignoring {}_GUILD_ID: '{}' is not an id", ENV_PREFIX, guild_id),
        }
    }

    if let Ok(value) = env::var(format!("{}_ENV", ENV_PREFIX)) {
        match Environment::parse(&value) {
            Some(environment) => config.discord.environment = environment,
            None => warn!("Ignoring {}_ENV: unknown environment '{}'", ENV_PREFIX, value),
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `MASQUERADE_CONFIG`, otherwise returns "masquerade.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "masquerade.conf".to_string())
}
