//! Monopoly multiplayer game server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod directory;
mod fanout;
mod protocol;
mod room;
mod server;
mod session;

use config::ServerConfig;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!(
        ai_turn_delay_ms = config.session.ai_turn_delay.as_millis() as u64,
        max_room_players = config.session.max_room_players,
        "Starting Monopoly server..."
    );

    let state = Arc::new(ServerState::new(config.session));

    server::run_server(config.addr, state).await
}
