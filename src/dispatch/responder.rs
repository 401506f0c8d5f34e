//! The outbound half of one interaction.

use std::time::Duration;

use async_trait::async_trait;

use crate::common::error::DownstreamError;
use crate::dispatch::response::{Choice, ModalForm, Response};

/// Answers a single interaction. Implementations track whether the
/// interaction was already acknowledged and pick create or edit accordingly.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Acknowledge now and answer later.
    async fn defer(&self) -> Result<(), DownstreamError>;

    async fn modal(&self, form: &ModalForm) -> Result<(), DownstreamError>;

    async fn choices(&self, choices: &[Choice]) -> Result<(), DownstreamError>;

    /// Send, or replace the previous answer.
    async fn send(&self, response: &Response) -> Result<(), DownstreamError>;

    async fn send_plain(&self, content: &str) -> Result<(), DownstreamError>;

    /// The next message the invoking user posts in the interaction's channel,
    /// removed from the channel once read. `None` when `timeout` lapses.
    async fn next_message(&self, timeout: Duration) -> Result<Option<String>, DownstreamError>;

    /// React to a message in the interaction's channel.
    async fn react(&self, message_id: u64, emoji: &str) -> Result<(), DownstreamError>;
}
