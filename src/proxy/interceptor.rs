//! Rewrites bracketed chat messages as posts by the matching avatar.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, warn};

use crate::avatar::model::{Avatar, Bracket, DEFAULT_ICON};
use crate::avatar::AvatarCache;
use crate::common::error::DownstreamError;

/// Platform cap on a plain message.
pub const MAX_MESSAGE_LEN: usize = 2000;

type IdentitySlot = Arc<OnceCell<ProxyIdentity>>;

/// A chat message as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub author_id: u64,
    pub content: String,
    pub channel_id: u64,
    pub message_id: u64,
    pub is_bot: bool,
    pub guild_id: Option<u64>,
}

/// Credentials of a channel's proxy identity (a webhook).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyIdentity {
    pub id: u64,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMessage {
    pub content: String,
    pub display_name: String,
    pub avatar_url: String,
}

#[async_trait]
pub trait ProxyGateway: Send + Sync {
    /// An identity usable in `channel_id`, reusing an existing one when possible.
    async fn open_identity(&self, channel_id: u64) -> Result<ProxyIdentity, DownstreamError>;

    async fn send_as(&self, identity: &ProxyIdentity, message: &ProxyMessage) -> Result<(), DownstreamError>;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), DownstreamError>;

    async fn send_plain(&self, channel_id: u64, content: &str) -> Result<(), DownstreamError>;
}

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intercept {
    Ignored,
    Proxied { avatar_id: u64 },
    /// Sent as a plain bot message because the proxy identity failed.
    Fallback { avatar_id: u64 },
    Failed { avatar_id: u64 },
}

pub struct BracketInterceptor {
    cache: Arc<AvatarCache>,
    gateway: Arc<dyn ProxyGateway>,
    /// One slot per channel; concurrent misses wait on the same open.
    identities: RwLock<HashMap<u64, IdentitySlot>>,
}

impl BracketInterceptor {
    pub fn new(cache: Arc<AvatarCache>, gateway: Arc<dyn ProxyGateway>) -> Self {
        Self {
            cache,
            gateway,
            identities: RwLock::new(HashMap::new()),
        }
    }

    pub async fn on_message(&self, message: &IncomingMessage) -> Intercept {
        if message.is_bot || message.guild_id.is_none() {
            return Intercept::Ignored;
        }

        let avatars = match self.cache.get(message.author_id).await {
            Ok(avatars) => avatars,
            Err(e) => {
                warn!("Could not load avatars for {}: {}", message.author_id, e);
                return Intercept::Ignored;
            }
        };

        let Some((avatar, text)) = find_match(&avatars, &message.content) else {
            return Intercept::Ignored;
        };
        debug!(
            "Message {} matched avatar {} '{}'",
            message.message_id, avatar.id, avatar.name
        );

        if let Err(e) = self
            .gateway
            .delete_message(message.channel_id, message.message_id)
            .await
        {
            warn!("Could not delete message {}: {}", message.message_id, e);
        }

        let proxied = ProxyMessage {
            content: text.to_string(),
            display_name: avatar.name.clone(),
            avatar_url: if avatar.icon_url.is_empty() {
                DEFAULT_ICON.to_string()
            } else {
                avatar.icon_url.clone()
            },
        };

        match self.send_via_identity(message.channel_id, &proxied).await {
            Ok(()) => Intercept::Proxied { avatar_id: avatar.id },
            Err(e) => {
                warn!(
                    "Proxy identity failed in channel {}, sending plain: {}",
                    message.channel_id, e
                );
                let plain = format!("**{}**: {}", avatar.name, text);
                for chunk in split_message(&plain, MAX_MESSAGE_LEN) {
                    if let Err(e) = self.gateway.send_plain(message.channel_id, chunk).await {
                        error!("Plain fallback failed in channel {}: {}", message.channel_id, e);
                        return Intercept::Failed { avatar_id: avatar.id };
                    }
                }
                Intercept::Fallback { avatar_id: avatar.id }
            }
        }
    }

    async fn send_via_identity(&self, channel_id: u64, message: &ProxyMessage) -> Result<(), DownstreamError> {
        let slot = self.slot(channel_id).await;
        let identity = slot
            .get_or_try_init(|| self.gateway.open_identity(channel_id))
            .await?;
        if let Err(e) = self.gateway.send_as(identity, message).await {
            // The webhook may have been deleted; open a fresh one next time.
            self.forget(channel_id, &slot).await;
            return Err(e);
        }
        Ok(())
    }

    async fn slot(&self, channel_id: u64) -> IdentitySlot {
        if let Some(slot) = self.identities.read().await.get(&channel_id) {
            return Arc::clone(slot);
        }
        Arc::clone(self.identities.write().await.entry(channel_id).or_default())
    }

    /// Drop `slot` unless another task already replaced it.
    async fn forget(&self, channel_id: u64, slot: &IdentitySlot) {
        let mut identities = self.identities.write().await;
        if identities.get(&channel_id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            identities.remove(&channel_id);
        }
    }
}

/// Split `content` into pieces of at most `max` characters, on char boundaries.
pub fn split_message(content: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(max)
            .map_or(rest.len(), |(index, _)| index);
        let (head, tail) = rest.split_at(end);
        pieces.push(head);
        rest = tail;
    }
    pieces
}

/// First avatar, in the given order, whose bracket wraps `content` around
/// non-empty text. Malformed brackets are skipped.
pub fn find_match<'a, 'c>(avatars: &'a [Avatar], content: &'c str) -> Option<(&'a Avatar, &'c str)> {
    avatars.iter().find_map(|avatar| {
        let bracket = Bracket::parse(&avatar.bracket).ok()?;
        let text = bracket.extract(content)?;
        (!text.is_empty()).then_some((avatar, text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::avatar::model::NewAvatar;
    use crate::store::{AvatarRepository, JsonStore};

    #[derive(Default)]
    struct FakeGateway {
        opened: AtomicUsize,
        slow_open: AtomicBool,
        fail_send: AtomicBool,
        fail_open: AtomicBool,
        proxied: Mutex<Vec<ProxyMessage>>,
        plain: Mutex<Vec<String>>,
        deleted: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl ProxyGateway for FakeGateway {
        async fn open_identity(&self, channel_id: u64) -> Result<ProxyIdentity, DownstreamError> {
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(DownstreamError::platform("missing permissions"));
            }
            if self.slow_open.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let n = self.opened.fetch_add(1, Ordering::SeqCst) as u64;
            Ok(ProxyIdentity {
                id: channel_id * 100 + n,
                token: "t".to_string(),
            })
        }

        async fn send_as(&self, _identity: &ProxyIdentity, message: &ProxyMessage) -> Result<(), DownstreamError> {
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(DownstreamError::platform("unknown webhook"));
            }
            self.proxied.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn delete_message(&self, _channel_id: u64, message_id: u64) -> Result<(), DownstreamError> {
            self.deleted.lock().unwrap().push(message_id);
            Ok(())
        }

        async fn send_plain(&self, _channel_id: u64, content: &str) -> Result<(), DownstreamError> {
            if content.chars().count() > MAX_MESSAGE_LEN {
                return Err(DownstreamError::platform("content too long"));
            }
            self.plain.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    async fn setup(brackets: &[(&str, &str)]) -> (Arc<FakeGateway>, BracketInterceptor) {
        let store = Arc::new(JsonStore::in_memory());
        for (name, bracket) in brackets {
            store
                .create(NewAvatar {
                    owner_id: 1,
                    name: name.to_string(),
                    bracket: bracket.to_string(),
                    icon_url: format!("https://example.com/{}.png", name),
                    species: "human".to_string(),
                })
                .await
                .unwrap();
        }
        let cache = Arc::new(AvatarCache::new(store, Duration::from_secs(300)));
        let gateway = Arc::new(FakeGateway::default());
        let interceptor = BracketInterceptor::new(cache, gateway.clone());
        (gateway, interceptor)
    }

    fn message(content: &str) -> IncomingMessage {
        IncomingMessage {
            author_id: 1,
            content: content.to_string(),
            channel_id: 5,
            message_id: 77,
            is_bot: false,
            guild_id: Some(9),
        }
    }

    #[tokio::test]
    async fn test_matching_message_is_proxied() {
        let (gateway, interceptor) = setup(&[("Aria", "[text]")]).await;
        let outcome = interceptor.on_message(&message("[Hello there!]")).await;

        assert_eq!(outcome, Intercept::Proxied { avatar_id: 1 });
        assert_eq!(*gateway.deleted.lock().unwrap(), vec![77]);
        assert_eq!(
            gateway.proxied.lock().unwrap()[0],
            ProxyMessage {
                content: "Hello there!".to_string(),
                display_name: "Aria".to_string(),
                avatar_url: "https://example.com/Aria.png".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_newest_avatar_wins() {
        let (gateway, interceptor) = setup(&[("Old", "[text]"), ("New", "[text]")]).await;
        interceptor.on_message(&message("[hi]")).await;
        assert_eq!(gateway.proxied.lock().unwrap()[0].display_name, "New");
    }

    #[tokio::test]
    async fn test_ignored_messages() {
        let (gateway, interceptor) = setup(&[("Aria", "[text]")]).await;

        let mut bot = message("[hi]");
        bot.is_bot = true;
        assert_eq!(interceptor.on_message(&bot).await, Intercept::Ignored);

        let mut direct = message("[hi]");
        direct.guild_id = None;
        assert_eq!(interceptor.on_message(&direct).await, Intercept::Ignored);

        assert_eq!(interceptor.on_message(&message("hi")).await, Intercept::Ignored);
        assert_eq!(interceptor.on_message(&message("[  ]")).await, Intercept::Ignored);
        assert!(gateway.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_opened_once_per_channel() {
        let (gateway, interceptor) = setup(&[("Aria", "[text]")]).await;
        interceptor.on_message(&message("[one]")).await;
        interceptor.on_message(&message("[two]")).await;
        assert_eq!(gateway.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_messages_share_one_identity() {
        let (gateway, interceptor) = setup(&[("Aria", "[text]")]).await;
        gateway.slow_open.store(true, Ordering::SeqCst);

        let mut second = message("[two]");
        second.message_id = 78;
        let first = message("[one]");
        let (a, b) = tokio::join!(
            interceptor.on_message(&first),
            interceptor.on_message(&second)
        );

        assert_eq!(a, Intercept::Proxied { avatar_id: 1 });
        assert_eq!(b, Intercept::Proxied { avatar_id: 1 });
        assert_eq!(gateway.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_long_fallback_is_split() {
        let (gateway, interceptor) = setup(&[("Aria", "[text]")]).await;
        gateway.fail_send.store(true, Ordering::SeqCst);
        let text = "é".repeat(1995);

        let outcome = interceptor.on_message(&message(&format!("[{}]", text))).await;
        assert_eq!(outcome, Intercept::Fallback { avatar_id: 1 });

        let plain = gateway.plain.lock().unwrap();
        assert_eq!(plain.len(), 2);
        assert!(plain[0].starts_with("**Aria**: "));
        assert!(plain.iter().all(|p| p.chars().count() <= MAX_MESSAGE_LEN));
        assert_eq!(plain.concat(), format!("**Aria**: {}", text));
    }

    #[test]
    fn test_split_message() {
        assert!(split_message("", 3).is_empty());
        assert_eq!(split_message("abc", 3), vec!["abc"]);
        assert_eq!(split_message("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(split_message("ééé", 2), vec!["éé", "é"]);
    }

    #[tokio::test]
    async fn test_plain_fallback_on_send_failure() {
        let (gateway, interceptor) = setup(&[("Aria", "k:text")]).await;
        gateway.fail_send.store(true, Ordering::SeqCst);

        let outcome = interceptor.on_message(&message("k: hello")).await;
        assert_eq!(outcome, Intercept::Fallback { avatar_id: 1 });
        assert_eq!(*gateway.plain.lock().unwrap(), vec!["**Aria**: hello"]);

        gateway.fail_send.store(false, Ordering::SeqCst);
        interceptor.on_message(&message("k: again")).await;
        assert_eq!(gateway.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_plain_fallback_on_open_failure() {
        let (gateway, interceptor) = setup(&[("Aria", "[text]")]).await;
        gateway.fail_open.store(true, Ordering::SeqCst);
        assert_eq!(
            interceptor.on_message(&message("[hi]")).await,
            Intercept::Fallback { avatar_id: 1 }
        );
    }

    #[test]
    fn test_malformed_bracket_skipped() {
        let avatar = |id: u64, bracket: &str| Avatar {
            id,
            owner_id: 1,
            name: format!("a{}", id),
            bracket: bracket.to_string(),
            icon_url: String::new(),
            species: "human".to_string(),
            level: 1,
            created_at: chrono::Utc::now(),
        };
        let avatars = vec![avatar(1, "text"), avatar(2, "[]"), avatar(3, "[text]")];
        let (hit, text) = find_match(&avatars, "[x]").unwrap();
        assert_eq!((hit.id, text), (3, "x"));
    }
}
