//! Recording responder for handler and router tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::error::DownstreamError;
use crate::dispatch::responder::Responder;
use crate::dispatch::response::{Choice, ModalForm, Response};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Defer,
    Modal(ModalForm),
    Choices(Vec<Choice>),
    Message(Response),
    Plain(String),
    Reaction(u64, String),
}

#[derive(Default)]
pub struct RecordingResponder {
    pub sent: Mutex<Vec<Sent>>,
    /// Answers for `next_message`, consumed front first.
    pub incoming: Mutex<VecDeque<String>>,
    pub fail_sends: bool,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    pub fn with_incoming(messages: &[&str]) -> Self {
        Self {
            incoming: Mutex::new(messages.iter().map(|m| m.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// The last message response, if any.
    pub fn last_message(&self) -> Option<Response> {
        self.sent().into_iter().rev().find_map(|sent| match sent {
            Sent::Message(response) => Some(response),
            _ => None,
        })
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn defer(&self) -> Result<(), DownstreamError> {
        self.record(Sent::Defer);
        Ok(())
    }

    async fn modal(&self, form: &ModalForm) -> Result<(), DownstreamError> {
        self.record(Sent::Modal(form.clone()));
        Ok(())
    }

    async fn choices(&self, choices: &[Choice]) -> Result<(), DownstreamError> {
        self.record(Sent::Choices(choices.to_vec()));
        Ok(())
    }

    async fn send(&self, response: &Response) -> Result<(), DownstreamError> {
        if self.fail_sends {
            return Err(DownstreamError::platform("send refused"));
        }
        self.record(Sent::Message(response.clone()));
        Ok(())
    }

    async fn send_plain(&self, content: &str) -> Result<(), DownstreamError> {
        self.record(Sent::Plain(content.to_string()));
        Ok(())
    }

    async fn next_message(&self, _timeout: Duration) -> Result<Option<String>, DownstreamError> {
        Ok(self.incoming.lock().unwrap().pop_front())
    }

    async fn react(&self, message_id: u64, emoji: &str) -> Result<(), DownstreamError> {
        self.record(Sent::Reaction(message_id, emoji.to_string()));
        Ok(())
    }
}
