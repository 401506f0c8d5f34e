//! Configuration validation.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration, reporting every problem at once.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.guild_id == Some(0) {
        errors.push("discord.guild_id must be non-zero".to_string());
    }

    if config.cache.avatar_ttl_secs == 0 {
        errors.push("cache.avatar_ttl_secs must be non-zero".to_string());
    }
    if config.cache.wizard_ttl_secs == 0 {
        errors.push("cache.wizard_ttl_secs must be non-zero".to_string());
    }
    if config.cache.sweep_interval_secs == 0 {
        errors.push("cache.sweep_interval_secs must be non-zero".to_string());
    }

    if config.store.path.is_empty() {
        errors.push("store.path is required".to_string());
    }
    if config.species.path.is_empty() {
        errors.push("species.path is required".to_string());
    }

    if let Some(ref endpoint) = config.renderer.endpoint {
        if reqwest::Url::parse(endpoint).is_err() {
            errors.push(format!("renderer.endpoint '{}' is not a valid URL", endpoint));
        }
    }
    if config.renderer.timeout_secs == 0 {
        errors.push("renderer.timeout_secs must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::load_config_str;

    fn make_valid_config() -> Config {
        load_config_str(r#"discord { token = "valid_token_here", guild_id = 123456789 }"#).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&make_valid_config()).is_ok());
    }

    #[test]
    fn test_placeholder_token_fails() {
        let mut config = make_valid_config();
        config.discord.token = "YOUR_DISCORD_TOKEN_HERE".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = make_valid_config();
        config.discord.token = String::new();
        config.cache.wizard_ttl_secs = 0;
        config.renderer.endpoint = Some("not a url".to_string());

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("discord.token is required"));
        assert!(message.contains("cache.wizard_ttl_secs"));
        assert!(message.contains("renderer.endpoint"));
    }
}
