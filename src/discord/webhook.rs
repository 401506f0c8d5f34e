//! Channel webhooks as the proxy identity.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateWebhook, ExecuteWebhook};
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId, UserId, WebhookId};
use tokio::sync::OnceCell;
use tracing::info;

use crate::common::error::DownstreamError;
use crate::proxy::{ProxyGateway, ProxyIdentity, ProxyMessage};

const WEBHOOK_NAME: &str = "Masquerade";

pub struct WebhookGateway {
    http: Arc<Http>,
    bot_user: OnceCell<UserId>,
}

impl WebhookGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            bot_user: OnceCell::new(),
        }
    }

    async fn bot_user(&self) -> Result<UserId, DownstreamError> {
        let id = self
            .bot_user
            .get_or_try_init(|| async { self.http.get_current_user().await.map(|user| user.id) })
            .await?;
        Ok(*id)
    }
}

/// The token is the last path segment of a webhook URL.
fn token_from_url(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|token| !token.is_empty())
}

#[async_trait]
impl ProxyGateway for WebhookGateway {
    async fn open_identity(&self, channel_id: u64) -> Result<ProxyIdentity, DownstreamError> {
        let channel = ChannelId::new(channel_id);
        let bot_user = self.bot_user().await?;

        let existing = channel
            .webhooks(self.http.as_ref())
            .await?
            .into_iter()
            .find(|hook| hook.user.as_ref().map(|u| u.id) == Some(bot_user));
        let webhook = match existing {
            Some(hook) => hook,
            None => {
                info!("Creating proxy webhook in channel {}", channel_id);
                channel
                    .create_webhook(self.http.as_ref(), CreateWebhook::new(WEBHOOK_NAME))
                    .await?
            }
        };

        let url = webhook.url()?;
        let token = token_from_url(&url)
            .ok_or_else(|| DownstreamError::platform("webhook has no token"))?;
        Ok(ProxyIdentity {
            id: webhook.id.get(),
            token: token.to_string(),
        })
    }

    async fn send_as(&self, identity: &ProxyIdentity, message: &ProxyMessage) -> Result<(), DownstreamError> {
        let builder = ExecuteWebhook::new()
            .content(&message.content)
            .username(&message.display_name)
            .avatar_url(&message.avatar_url);
        self.http
            .execute_webhook(WebhookId::new(identity.id), None, &identity.token, false, vec![], &builder)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), DownstreamError> {
        ChannelId::new(channel_id)
            .delete_message(self.http.as_ref(), MessageId::new(message_id))
            .await?;
        Ok(())
    }

    async fn send_plain(&self, channel_id: u64, content: &str) -> Result<(), DownstreamError> {
        ChannelId::new(channel_id).say(self.http.as_ref(), content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_url() {
        assert_eq!(
            token_from_url("https://discord.com/api/webhooks/123/abc-DEF_ghi"),
            Some("abc-DEF_ghi")
        );
        assert_eq!(token_from_url("https://discord.com/api/webhooks/123/"), None);
    }
}
