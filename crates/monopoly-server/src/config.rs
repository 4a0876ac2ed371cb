//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::session::SessionConfig;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Settings for the whole server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to (`SERVER_ADDR`)
    pub addr: SocketAddr,
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Read `SERVER_ADDR`, `AI_TURN_DELAY_MS` and `MAX_ROOM_PLAYERS`,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = SessionConfig::default();

        let addr = parse_or(&lookup, "SERVER_ADDR", DEFAULT_ADDR.parse::<SocketAddr>()?)?;
        let delay_ms = parse_or(
            &lookup,
            "AI_TURN_DELAY_MS",
            defaults.ai_turn_delay.as_millis() as u64,
        )?;
        let max_room_players = parse_or(&lookup, "MAX_ROOM_PLAYERS", defaults.max_room_players)?;

        Ok(Self {
            addr,
            session: SessionConfig {
                ai_turn_delay: Duration::from_millis(delay_ms),
                max_room_players: max_room_players.clamp(2, 8),
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
