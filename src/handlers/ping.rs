use async_trait::async_trait;
use chrono::Utc;

use crate::common::error::BotResult;
use crate::dispatch::response::{Reply, Response};
use crate::dispatch::{BotContext, Handler, Interaction, Responder};

/// `/ping`: time from the interaction's creation to handling.
pub struct Ping;

#[async_trait]
impl Handler for Ping {
    async fn handle(
        &self,
        _ctx: &BotContext,
        interaction: &Interaction,
        _responder: &dyn Responder,
    ) -> BotResult<Reply> {
        let latency = (Utc::now() - interaction.created_at).num_milliseconds().max(0);
        Ok(Reply::Message(Response::text(format!("🏓 Pong! {}ms", latency))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::RecordingResponder;
    use crate::dispatch::Kind;

    #[tokio::test]
    async fn test_pong() {
        let ctx = BotContext::for_tests();
        let mut interaction = Interaction::new(Kind::Slash, "ping", 1);
        interaction.created_at = Utc::now() + chrono::Duration::seconds(5);
        let reply = Ping.handle(&ctx, &interaction, &RecordingResponder::new()).await.unwrap();
        assert_eq!(reply, Reply::Message(Response::text("🏓 Pong! 0ms")));
    }
}
