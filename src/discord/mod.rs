//! Discord integration: gateway client, event routing, and the serenity
//! implementations of the responder and the proxy gateway.

pub mod client;
pub mod commands;
pub mod convert;
pub mod handler;
pub mod responder;
pub mod webhook;

pub use client::DiscordBotBuilder;
