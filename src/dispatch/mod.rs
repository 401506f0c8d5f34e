//! Interaction dispatch: the platform-neutral model, the handler registry
//! and the router that ties them together.

pub mod context;
pub mod interaction;
pub mod registry;
pub mod responder;
pub mod response;
pub mod router;

#[cfg(test)]
pub mod testing;

pub use context::BotContext;
pub use interaction::{Interaction, Kind};
pub use registry::{Ack, DispatchRegistry, Handler, HandlerRegistration};
pub use responder::Responder;
pub use router::Router;
