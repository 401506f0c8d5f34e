//! [`Responder`] over a live serenity interaction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serenity::builder::{
    CreateInteractionResponse, CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
    EditInteractionResponse,
};
use serenity::collector::MessageCollector;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, MessageId, UserId};
use serenity::prelude::Context;
use tracing::{debug, warn};

use crate::common::error::DownstreamError;
use crate::discord::convert::{self, Target};
use crate::dispatch::response::{Choice, ModalForm, Response};
use crate::dispatch::Responder;

pub struct SerenityResponder {
    ctx: Context,
    target: Target,
    acknowledged: AtomicBool,
}

impl SerenityResponder {
    pub fn new(ctx: Context, target: Target) -> Self {
        Self {
            ctx,
            target,
            acknowledged: AtomicBool::new(false),
        }
    }

    fn channel_id(&self) -> ChannelId {
        match &self.target {
            Target::Command(c) => c.channel_id,
            Target::Component(c) => c.channel_id,
            Target::Modal(m) => m.channel_id,
        }
    }

    fn user_id(&self) -> UserId {
        match &self.target {
            Target::Command(c) => c.user.id,
            Target::Component(c) => c.user.id,
            Target::Modal(m) => m.user.id,
        }
    }

    async fn create(&self, response: CreateInteractionResponse) -> Result<(), DownstreamError> {
        let http = self.ctx.http.as_ref();
        match &self.target {
            Target::Command(c) => c.create_response(http, response).await?,
            Target::Component(c) => c.create_response(http, response).await?,
            Target::Modal(m) => m.create_response(http, response).await?,
        }
        self.acknowledged.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn edit(&self, builder: EditInteractionResponse) -> Result<(), DownstreamError> {
        let http = self.ctx.http.as_ref();
        match &self.target {
            Target::Command(c) => c.edit_response(http, builder).await?,
            Target::Component(c) => c.edit_response(http, builder).await?,
            Target::Modal(m) => m.edit_response(http, builder).await?,
        };
        Ok(())
    }
}

#[async_trait]
impl Responder for SerenityResponder {
    /// Commands get a "thinking" placeholder; components and modal
    /// submissions keep their message and later edit it in place.
    async fn defer(&self) -> Result<(), DownstreamError> {
        let response = match &self.target {
            Target::Command(_) => CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            Target::Component(_) | Target::Modal(_) => CreateInteractionResponse::Acknowledge,
        };
        self.create(response).await
    }

    async fn modal(&self, form: &ModalForm) -> Result<(), DownstreamError> {
        self.create(CreateInteractionResponse::Modal(convert::modal(form))).await
    }

    async fn choices(&self, choices: &[Choice]) -> Result<(), DownstreamError> {
        self.create(CreateInteractionResponse::Autocomplete(convert::choices(choices)))
            .await
    }

    async fn send(&self, response: &Response) -> Result<(), DownstreamError> {
        if self.acknowledged.load(Ordering::SeqCst) {
            self.edit(convert::edit(response)).await
        } else {
            self.create(CreateInteractionResponse::Message(convert::message(response)))
                .await
        }
    }

    async fn send_plain(&self, content: &str) -> Result<(), DownstreamError> {
        if !self.acknowledged.load(Ordering::SeqCst) {
            return self
                .create(CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new().content(content).ephemeral(true),
                ))
                .await;
        }
        let followup = CreateInteractionResponseFollowup::new().content(content).ephemeral(true);
        let http = self.ctx.http.as_ref();
        match &self.target {
            Target::Command(c) => c.create_followup(http, followup).await?,
            Target::Component(c) => c.create_followup(http, followup).await?,
            Target::Modal(m) => m.create_followup(http, followup).await?,
        };
        Ok(())
    }

    async fn next_message(&self, timeout: Duration) -> Result<Option<String>, DownstreamError> {
        let message = MessageCollector::new(&self.ctx.shard)
            .author_id(self.user_id())
            .channel_id(self.channel_id())
            .timeout(timeout)
            .next()
            .await;
        let Some(message) = message else {
            debug!("No answer from {} within {:?}", self.user_id(), timeout);
            return Ok(None);
        };
        if let Err(e) = message.delete(&self.ctx).await {
            warn!("Could not delete answer message {}: {}", message.id, e);
        }
        Ok(Some(message.content))
    }

    async fn react(&self, message_id: u64, emoji: &str) -> Result<(), DownstreamError> {
        let reaction = ReactionType::try_from(emoji)
            .map_err(|e| DownstreamError::platform(format!("bad emoji '{}': {}", emoji, e)))?;
        self.channel_id()
            .create_reaction(&self.ctx.http, MessageId::new(message_id), reaction)
            .await?;
        Ok(())
    }
}
