//! Discord client lifecycle: build, connect, reconnect, shut down.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::http::HttpBuilder;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::DiscordConfig;
use crate::discord::handler::{DiscordBotEvent, DiscordBotEvents, EventRouter};
use crate::discord::webhook::WebhookGateway;
use crate::dispatch::Router;
use crate::proxy::BracketInterceptor;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let client = serenity::client::ClientBuilder::new_with_http(http, intents())
        .event_handler(DiscordBotEvents::new(discord_events_tx))
        .await?;
    Ok(client)
}

/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(MAX_RECONNECT_DELAY)
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

pub struct DiscordBotBuilder {
    config: DiscordConfig,
    router: Arc<Router>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBotBuilder {
    pub fn new(config: DiscordConfig, router: Arc<Router>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            config,
            router,
            shutdown_rx,
        }
    }

    pub async fn build(self) -> anyhow::Result<DiscordBot> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();
        let client = build_client(&self.config.token, discord_events_tx.clone()).await?;

        let ctx = self.router.context();
        let gateway = Arc::new(WebhookGateway::new(client.http.clone()));
        let interceptor = Arc::new(BracketInterceptor::new(ctx.cache.clone(), gateway));
        let events = Arc::new(EventRouter::new(
            self.router.clone(),
            interceptor,
            ctx.guilds.clone(),
            self.config.guild_id,
        ));

        match self.config.guild_id {
            Some(id) => info!("Slash commands will be registered in guild {}", id),
            None => info!("Slash commands will be registered globally"),
        }

        Ok(DiscordBot {
            client: Some(client),
            token: self.config.token,
            events,
            discord_events_rx,
            discord_events_tx,
            shutdown_rx: self.shutdown_rx,
        })
    }
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    events: Arc<EventRouter>,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn run(mut self) {
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let shutdown_rx = &mut self.shutdown_rx;

        tokio::select! {
            _ = Self::run_connection(&mut self.client, &self.token, &self.discord_events_tx) => {},
            _ = Self::process_events(&mut self.discord_events_rx, &self.events) => {},
            _ = async {
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                if let Some(ref manager) = shard_manager {
                    info!("Initiating graceful Discord shutdown...");
                    manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                }
            } => {}
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => match build_client(token, discord_events_tx.clone()).await {
                    Ok(client) => {
                        backoff = discord_backoff();
                        client
                    }
                    Err(e) => {
                        error!("Failed to rebuild Discord client: {}", e);
                        let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                        warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                        sleep(delay).await;
                        continue;
                    }
                },
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    let _ = discord_events_tx.send(DiscordBotEvent::Disconnected);
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64()
                    );
                    let _ = discord_events_tx.send(DiscordBotEvent::Disconnected);
                    sleep(delay).await;
                }
            }
        }
    }

    /// Each event is handled in its own task.
    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        events: &Arc<EventRouter>,
    ) {
        while let Some(event) = discord_events_rx.recv().await {
            let events = Arc::clone(events);
            tokio::spawn(async move { events.handle(event).await });
        }
        debug!("Discord events channel closed.");
    }
}
