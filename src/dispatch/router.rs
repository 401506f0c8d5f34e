//! The interaction boundary.
//!
//! Every inbound interaction goes through [`Router::dispatch`]: resolve,
//! acknowledge, run, deliver. No error or panic escapes it; a failed reply
//! falls back to plain text.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::common::error::{BotError, BotResult};
use crate::config::Environment;
use crate::dispatch::context::BotContext;
use crate::dispatch::interaction::{Interaction, Kind};
use crate::dispatch::registry::{Ack, DispatchRegistry, HandlerRegistration};
use crate::dispatch::responder::Responder;
use crate::dispatch::response::{Reply, Response, MAX_CHOICES};

const PLAIN_FALLBACK: &str = "Something went wrong while answering. Please try again.";

pub struct Router {
    registry: Arc<DispatchRegistry>,
    ctx: Arc<BotContext>,
}

impl Router {
    pub fn new(registry: DispatchRegistry, ctx: Arc<BotContext>) -> Self {
        info!("Router ready with {} handlers", registry.len());
        Self {
            registry: Arc::new(registry),
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    pub async fn dispatch(&self, interaction: Interaction, responder: &dyn Responder) {
        if interaction.kind == Kind::Autocomplete {
            self.dispatch_autocomplete(&interaction, responder).await;
            return;
        }

        let Some(registration) = self.registry.resolve(interaction.kind, &interaction.identifier) else {
            warn!(
                command = %interaction.identifier,
                user = interaction.user_id,
                guild = ?interaction.guild_id,
                "No handler for {} '{}'",
                interaction.kind,
                interaction.identifier
            );
            let unavailable = BotError::not_found(format!("handler for '{}'", interaction.identifier));
            self.report(&interaction, &unavailable, responder).await;
            return;
        };

        if registration.ack == Ack::Defer {
            if let Err(e) = responder.defer().await {
                error!(
                    command = %interaction.identifier,
                    user = interaction.user_id,
                    "Failed to acknowledge interaction: {}",
                    e
                );
                return;
            }
        }

        let result = match self.run(registration, &interaction, responder).await {
            Ok(reply) => self.deliver(reply, responder).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.report(&interaction, &e, responder).await;
        }
    }

    async fn dispatch_autocomplete(&self, interaction: &Interaction, responder: &dyn Responder) {
        let choices = match self.registry.resolve(Kind::Autocomplete, &interaction.identifier) {
            Some(registration) => match self.run(registration, interaction, responder).await {
                Ok(Reply::Choices(mut choices)) => {
                    choices.truncate(MAX_CHOICES);
                    choices
                }
                Ok(_) => Vec::new(),
                Err(e) => {
                    warn!(
                        command = %interaction.identifier,
                        user = interaction.user_id,
                        "Autocomplete failed: {}",
                        e
                    );
                    Vec::new()
                }
            },
            None => {
                debug!("No autocomplete handler for '{}'", interaction.identifier);
                Vec::new()
            }
        };
        if let Err(e) = responder.choices(&choices).await {
            warn!("Failed to send autocomplete choices: {}", e);
        }
    }

    /// Run the handler, turning a panic into an error.
    async fn run(
        &self,
        registration: &HandlerRegistration,
        interaction: &Interaction,
        responder: &dyn Responder,
    ) -> BotResult<Reply> {
        AssertUnwindSafe(registration.handler.handle(&self.ctx, interaction, responder))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(BotError::Internal {
                    message: panic_message(panic.as_ref()),
                })
            })
    }

    async fn deliver(&self, reply: Reply, responder: &dyn Responder) -> BotResult<()> {
        match reply {
            Reply::Message(response) => {
                response.validate()?;
                responder.send(&response).await?;
            }
            Reply::Modal(form) => responder.modal(&form).await?,
            Reply::Choices(mut choices) => {
                choices.truncate(MAX_CHOICES);
                responder.choices(&choices).await?;
            }
            Reply::Silent => {}
        }
        Ok(())
    }

    async fn report(&self, interaction: &Interaction, error: &BotError, responder: &dyn Responder) {
        match error {
            BotError::Validation(_) => debug!(
                command = %interaction.identifier,
                user = interaction.user_id,
                "Rejected input: {}",
                error
            ),
            BotError::ExpiredSession => debug!(
                command = %interaction.identifier,
                user = interaction.user_id,
                "Expired session"
            ),
            BotError::NotFound { .. } => warn!(
                command = %interaction.identifier,
                user = interaction.user_id,
                guild = ?interaction.guild_id,
                "{}",
                error
            ),
            BotError::Downstream(_) | BotError::Limits(_) | BotError::Internal { .. } => error!(
                command = %interaction.identifier,
                kind = %interaction.kind,
                user = interaction.user_id,
                guild = ?interaction.guild_id,
                "Handler failed: {:?}",
                error
            ),
        }

        let response = error_response(error, self.ctx.environment);
        if let Err(e) = responder.send(&response).await {
            warn!("Failed to send error reply, falling back to plain text: {}", e);
            if let Err(e) = responder.send_plain(PLAIN_FALLBACK).await {
                error!(
                    command = %interaction.identifier,
                    user = interaction.user_id,
                    "Failed to send plain error reply: {}",
                    e
                );
            }
        }
    }
}

/// User-facing reply for a failed interaction. System failures only carry
/// details outside production.
pub fn error_response(error: &BotError, environment: Environment) -> Response {
    match error {
        BotError::Validation(problems) => {
            let items: Vec<String> = problems.iter().map(|p| format!("• {}", p)).collect();
            Response::warning("Invalid input", items.join("\n"))
        }
        BotError::NotFound { .. } => Response::error(
            "Unavailable",
            "This is no longer available.",
            None,
        ),
        BotError::ExpiredSession => Response::warning(
            "Session expired",
            "Your avatar creation session expired. Run `/avatar create` to start again.",
        ),
        BotError::Downstream(_) | BotError::Limits(_) | BotError::Internal { .. } => {
            let details = error.to_string();
            Response::error(
                "Something went wrong!",
                "An unexpected error occurred while processing your request.",
                (!environment.is_production()).then_some(details.as_str()),
            )
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
