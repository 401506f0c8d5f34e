//! Handler registry and the layered resolution rules.
//!
//! Keys are slash-separated paths such as `avatar/avatar` or
//! `buttons/edit_name_`. The registry is filled once at startup and only
//! read afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::common::error::BotResult;
use crate::dispatch::context::BotContext;
use crate::dispatch::interaction::{Interaction, Kind};
use crate::dispatch::responder::Responder;
use crate::dispatch::response::Reply;

/// Prefixes tried after the main-command path.
pub const ORGANIZATIONAL_PREFIXES: [&str; 4] = ["commands/", "buttons/", "modals/", "selects/"];

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: &BotContext,
        interaction: &Interaction,
        responder: &dyn Responder,
    ) -> BotResult<Reply>;
}

/// How the router acknowledges before running the handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ack {
    #[default]
    Defer,
    /// The handler answers with a form, which must be the first response.
    Modal,
}

#[derive(Clone)]
pub struct HandlerRegistration {
    pub key: String,
    pub kind: Kind,
    pub ack: Ack,
    pub handler: Arc<dyn Handler>,
}

impl HandlerRegistration {
    pub fn new(key: impl Into<String>, kind: Kind, handler: impl Handler + 'static) -> Self {
        Self {
            key: key.into(),
            kind,
            ack: Ack::Defer,
            handler: Arc::new(handler),
        }
    }

    pub fn with_ack(mut self, ack: Ack) -> Self {
        self.ack = ack;
        self
    }

    /// Trailing path segment of the key.
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Whether this registration may serve `kind`. A key whose leading
    /// segment names another kind is never compatible.
    fn serves(&self, kind: Kind) -> bool {
        if self.kind != kind {
            return false;
        }
        match self.key.split_once('/') {
            Some((segment, _)) => Kind::from_segment(segment).map_or(true, |signalled| signalled == kind),
            None => true,
        }
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("ack", &self.ack)
            .finish()
    }
}

/// One resolution rule. Tried in declaration order; first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `{kind}/{identifier}`, e.g. `autocomplete/avatar`
    ExactMatch,
    /// `{identifier}/{identifier}`
    MainPath,
    /// `commands/`, `buttons/`, `modals/`, `selects/` + identifier
    OrganizationalPrefix,
    /// bare `identifier`
    TopLevel,
    /// first key whose name is a prefix of, or contained in, the identifier
    SubstringFallback,
    /// `edit_name_42` retried as `edit_name_` through the direct rules
    SuffixStrip,
}

impl Strategy {
    pub const ORDER: [Strategy; 6] = [
        Strategy::ExactMatch,
        Strategy::MainPath,
        Strategy::OrganizationalPrefix,
        Strategy::TopLevel,
        Strategy::SubstringFallback,
        Strategy::SuffixStrip,
    ];

    const DIRECT: [Strategy; 4] = [
        Strategy::ExactMatch,
        Strategy::MainPath,
        Strategy::OrganizationalPrefix,
        Strategy::TopLevel,
    ];
}

#[derive(Debug, Default)]
pub struct DispatchRegistry {
    registrations: Vec<HandlerRegistration>,
    index: HashMap<String, usize>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler. A repeated key replaces the earlier one in place.
    pub fn register(&mut self, registration: HandlerRegistration) -> &mut Self {
        match self.index.get(&registration.key) {
            Some(&slot) => {
                warn!("Handler '{}' registered twice, replacing", registration.key);
                self.registrations[slot] = registration;
            }
            None => {
                self.index
                    .insert(registration.key.clone(), self.registrations.len());
                self.registrations.push(registration);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn resolve(&self, kind: Kind, identifier: &str) -> Option<&HandlerRegistration> {
        self.resolve_traced(kind, identifier).map(|(_, registration)| registration)
    }

    /// Like [`resolve`](Self::resolve), also reporting the rule that matched.
    pub fn resolve_traced(
        &self,
        kind: Kind,
        identifier: &str,
    ) -> Option<(Strategy, &HandlerRegistration)> {
        if kind == Kind::Autocomplete {
            return self
                .apply(Strategy::ExactMatch, kind, identifier)
                .map(|registration| (Strategy::ExactMatch, registration));
        }

        let hit = Strategy::ORDER.iter().find_map(|&strategy| {
            self.apply(strategy, kind, identifier)
                .map(|registration| (strategy, registration))
        });
        if let Some((strategy, registration)) = &hit {
            debug!(
                "Resolved {} '{}' to '{}' via {:?}",
                kind, identifier, registration.key, strategy
            );
        }
        hit
    }

    fn apply(&self, strategy: Strategy, kind: Kind, identifier: &str) -> Option<&HandlerRegistration> {
        match strategy {
            Strategy::ExactMatch => self.lookup(&format!("{}/{}", kind, identifier), kind),
            Strategy::MainPath => self.lookup(&format!("{}/{}", identifier, identifier), kind),
            Strategy::OrganizationalPrefix => ORGANIZATIONAL_PREFIXES
                .iter()
                .find_map(|prefix| self.lookup(&format!("{}{}", prefix, identifier), kind)),
            Strategy::TopLevel => self.lookup(identifier, kind),
            Strategy::SubstringFallback => self.registrations.iter().find(|registration| {
                let name = registration.name();
                registration.serves(kind)
                    && !name.is_empty()
                    && (identifier.starts_with(name) || identifier.contains(name))
            }),
            Strategy::SuffixStrip => {
                let stripped = strip_suffix(identifier)?;
                Strategy::DIRECT
                    .iter()
                    .find_map(|&direct| self.apply(direct, kind, &stripped))
            }
        }
    }

    fn lookup(&self, key: &str, kind: Kind) -> Option<&HandlerRegistration> {
        let registration = &self.registrations[*self.index.get(key)?];
        registration.serves(kind).then_some(registration)
    }
}

/// `edit_name_42` -> `edit_name_`. `None` when nothing would change.
fn strip_suffix(identifier: &str) -> Option<String> {
    let (head, tail) = identifier.rsplit_once('_')?;
    if tail.is_empty() {
        return None;
    }
    Some(format!("{}_", head))
}
