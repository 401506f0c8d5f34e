//! Masquerade - speak as your characters on Discord.
//!
//! Users register avatars (name, bracket, image, species); any message
//! wrapped in an avatar's bracket is reposted under that avatar's identity.
//! Guilds also get welcome messages and reaction roles.

mod avatar;
mod common;
mod config;
mod discord;
mod dispatch;
mod guild;
mod handlers;
mod proxy;
mod render;
mod stats;
mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use avatar::{AvatarCache, AvatarWizard};
use config::{env::get_config_path, load_and_validate};
use discord::DiscordBotBuilder;
use dispatch::{BotContext, DispatchRegistry, Router};
use guild::GuildPatterns;
use render::{CardRenderer, DisabledRenderer, HttpRenderer};
use stats::SpeciesCatalog;
use store::JsonStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Masquerade v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Environment: {:?}", config.discord.environment);
    info!("  Store: {}", config.store.path);
    info!("  Species: {}", config.species.path);

    let store = Arc::new(JsonStore::open(&config.store.path).await?);
    let catalog = Arc::new(SpeciesCatalog::load(&config.species.path)?);
    info!("Loaded {} species", catalog.iter().count());

    let renderer: Arc<dyn CardRenderer> = match &config.renderer.endpoint {
        Some(endpoint) => {
            info!("  Renderer: {}", endpoint);
            Arc::new(HttpRenderer::new(
                endpoint.clone(),
                Duration::from_secs(config.renderer.timeout_secs),
            )?)
        }
        None => {
            info!("  Renderer: disabled");
            Arc::new(DisabledRenderer)
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let cache = Arc::new(AvatarCache::new(
        store.clone(),
        Duration::from_secs(config.cache.avatar_ttl_secs),
    ));
    let wizard = Arc::new(AvatarWizard::new(
        store.clone(),
        cache.clone(),
        catalog.clone(),
        Duration::from_secs(config.cache.wizard_ttl_secs),
    ));

    let sweep_every = Duration::from_secs(config.cache.sweep_interval_secs);
    let sweepers = [
        cache.entries().spawn_sweeper("avatar", sweep_every, shutdown_rx.clone()),
        wizard.sessions().spawn_sweeper("wizard", sweep_every, shutdown_rx.clone()),
    ];

    let ctx = Arc::new(BotContext {
        avatars: store.clone(),
        guilds: store,
        cache,
        wizard,
        catalog,
        renderer,
        patterns: GuildPatterns::new()?,
        environment: config.discord.environment,
    });

    let mut registry = DispatchRegistry::new();
    handlers::register_all(&mut registry);
    info!("Registered {} interaction handlers", registry.len());
    let router = Arc::new(Router::new(registry, ctx));

    let discord_bot = DiscordBotBuilder::new(config.discord.clone(), router, shutdown_rx.clone())
        .build()
        .await?;

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(discord_bot.run());

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - disconnecting...");
            true
        }
        _ = &mut discord_task => false,
    };

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    if shutdown {
        match tokio::time::timeout(Duration::from_secs(5), discord_task).await {
            Ok(Ok(())) => info!("Discord client stopped gracefully"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }
    for sweeper in sweepers {
        if let Err(e) = sweeper.await {
            warn!("Cache sweeper ended abnormally: {}", e);
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
