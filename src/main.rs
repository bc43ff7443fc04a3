use anyhow::Result;
use parking_lot::RwLock;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod audio;
mod bot;
mod config;
mod models;
mod sources;
mod ui;

use crate::audio::driver::SongbirdDriver;
use crate::audio::player_manager::PlayerManager;
use crate::audio::queue::QueueManager;
use crate::bot::GrooveBot;
use crate::config::Config;
use crate::sources::TrackResolver;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("groove_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting Groove Bot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Companion mode: desktop audio discovery/routing instead of the bot.
    if std::env::args().any(|arg| arg == "--api") {
        return api::serve(&config).await;
    }

    info!("{}", config.summary());

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // One Songbird shared between serenity's voice events and the driver.
    let songbird = Songbird::serenity();
    let resolver = Arc::new(TrackResolver::new());
    let queues = Arc::new(RwLock::new(QueueManager::new()));
    let driver = Arc::new(SongbirdDriver::new(
        songbird.clone(),
        resolver.clone(),
        config.default_volume,
    ));
    let players = Arc::new(PlayerManager::new(queues, driver));

    let handler = GrooveBot::new(config.clone(), players, resolver, songbird.clone());

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("⚠️ Shutdown signal received, closing...");
            std::process::exit(0);
        }
    });

    info!("🚀 Bot started successfully");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

/// Verifies the external tools both run modes shell out to.
async fn health_check() -> Result<()> {
    TrackResolver::verify_dependencies().await?;

    let pactl = async_process::Command::new("pactl")
        .arg("--version")
        .output()
        .await?;

    if !pactl.status.success() {
        anyhow::bail!("Missing dependencies: pactl");
    }

    println!("OK");
    Ok(())
}
