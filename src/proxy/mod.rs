//! Speaking as an avatar: bracket matching and the per-channel proxy identity.

pub mod interceptor;

pub use interceptor::{BracketInterceptor, IncomingMessage, Intercept, ProxyGateway, ProxyIdentity, ProxyMessage};
