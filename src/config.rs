//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::MAX_PLAYERS;

const DEFAULT_OUTBOX: usize = 64;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// Upper bound on lobby size; never above the hard cap of 8
    pub max_players: usize,
    /// Whether the server ends the Day itself when the duration runs out
    pub server_timer: bool,
    /// Snapshot directory; `None` keeps rooms in memory only
    pub store_dir: Option<PathBuf>,
    /// Per-connection outbound queue length
    pub outbox_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            max_players: MAX_PLAYERS,
            server_timer: true,
            store_dir: None,
            outbox_capacity: DEFAULT_OUTBOX,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind = parse_or("WEREWORDS_BIND", Self::default().bind);

        let max_players = parse_or("WEREWORDS_MAX_PLAYERS", MAX_PLAYERS);
        let max_players = if (1..=MAX_PLAYERS).contains(&max_players) {
            max_players
        } else {
            tracing::warn!(
                "WEREWORDS_MAX_PLAYERS={} out of range, capping at {}",
                max_players,
                MAX_PLAYERS
            );
            MAX_PLAYERS
        };

        let outbox_capacity = match parse_or("WEREWORDS_OUTBOX", DEFAULT_OUTBOX) {
            0 => DEFAULT_OUTBOX,
            n => n,
        };

        let config = Self {
            bind,
            max_players,
            server_timer: flag("WEREWORDS_SERVER_TIMER", true),
            store_dir: std::env::var("WEREWORDS_STORE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            outbox_capacity,
        };

        tracing::info!(
            "Config loaded: bind={}, max_players={}, server_timer={}, store_dir={:?}, outbox={}",
            config.bind,
            config.max_players,
            config.server_timer,
            config.store_dir,
            config.outbox_capacity
        );

        config
    }
}
