//! Card images for the avatar views.
//!
//! Rendering is optional: callers treat any failure as "no image".

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::avatar::model::Avatar;
use crate::common::error::DownstreamError;

/// Render templates known to the card service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Template {
    /// Overview of every avatar of a user.
    Characters,
    /// A single avatar.
    CharacterCard,
}

#[async_trait]
pub trait CardRenderer: Send + Sync {
    /// PNG bytes for `template` filled with `props`.
    async fn render(&self, template: Template, props: &Value) -> Result<Vec<u8>, DownstreamError>;
}

/// Posts `{template, props}` to an HTTP rendering service.
pub struct HttpRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRenderer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl CardRenderer for HttpRenderer {
    async fn render(&self, template: Template, props: &Value) -> Result<Vec<u8>, DownstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "template": template, "props": props }))
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(DownstreamError::Render {
                message: format!("{:?} came back empty", template),
            });
        }
        debug!("Rendered {:?} ({} bytes)", template, bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Used when no renderer endpoint is configured.
pub struct DisabledRenderer;

#[async_trait]
impl CardRenderer for DisabledRenderer {
    async fn render(&self, template: Template, _props: &Value) -> Result<Vec<u8>, DownstreamError> {
        Err(DownstreamError::Render {
            message: format!("rendering disabled, skipped {:?}", template),
        })
    }
}

pub fn characters_props(avatars: &[Avatar]) -> Value {
    let characters: Vec<Value> = avatars
        .iter()
        .map(|avatar| {
            json!({
                "name": avatar.name,
                "avatarUrl": avatar.icon_url,
                "species": avatar.species,
                "level": avatar.level,
            })
        })
        .collect();
    json!({ "characters": characters, "theme": "dark" })
}

pub fn card_props(avatar: &Avatar) -> Value {
    json!({
        "name": avatar.name,
        "avatarUrl": avatar.icon_url,
        "species": avatar.species,
        "level": avatar.level,
        "experience": 0,
        "experienceToNext": 100,
        "theme": "dark",
        "showProgress": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_disabled_renderer_fails() {
        let result = DisabledRenderer.render(Template::Characters, &json!({})).await;
        assert!(matches!(result, Err(DownstreamError::Render { .. })));
    }

    #[test]
    fn test_props_shape() {
        let avatar = Avatar {
            id: 1,
            owner_id: 2,
            name: "Aria".to_string(),
            bracket: "[text]".to_string(),
            icon_url: "https://example.com/a.png".to_string(),
            species: "elf".to_string(),
            level: 7,
            created_at: Utc::now(),
        };
        let props = characters_props(std::slice::from_ref(&avatar));
        assert_eq!(props["characters"][0]["avatarUrl"], "https://example.com/a.png");
        assert_eq!(card_props(&avatar)["level"], 7);
    }
}
