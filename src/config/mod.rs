//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::util::time::DEFAULT_TICK_RATE;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS ("*" allows any)
    pub client_origin: String,
    /// Create sessions on first WebSocket join instead of replying `sessionNotFound`
    pub auto_create_sessions: bool,
    /// Max inbound WebSocket messages per second per connection (None = unlimited)
    pub ws_message_rate_limit: Option<NonZeroU32>,
    /// Simulation tuning
    pub game: GameConfig,
}

/// Width and height of an axis-aligned box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Simulation constants shared by every session
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Ticks per second for each active session
    pub tick_rate: u32,
    pub world_width: f32,
    pub world_height: f32,

    /// Airplane handed to every joining player
    pub airplane_type: String,
    pub airplane_speed: f32,
    pub airplane_health: f32,
    pub airplane_extent: Extent,

    /// Projectile spawned by a shoot command
    pub projectile_type: String,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_extent: Extent,

    /// Points awarded to the shooter per hit
    pub hit_score: u32,

    /// Spawn square: `[spawn_min, spawn_min + spawn_spread)` on both axes
    pub spawn_min: f32,
    pub spawn_spread: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            world_width: 1920.0,
            world_height: 1080.0,
            airplane_type: "defaultFighter".to_string(),
            airplane_speed: 200.0,
            airplane_health: 100.0,
            airplane_extent: Extent::new(50.0, 50.0),
            projectile_type: "bullet".to_string(),
            projectile_speed: 500.0,
            projectile_damage: 10.0,
            projectile_extent: Extent::new(30.0, 30.0),
            hit_score: 10,
            spawn_min: 50.0,
            spawn_spread: 200.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let defaults = GameConfig::default();
        let tick_rate: u32 = parse_or("TICK_RATE", defaults.tick_rate)?;
        if tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        let game = GameConfig {
            tick_rate,
            world_width: parse_or("WORLD_WIDTH", defaults.world_width)?,
            world_height: parse_or("WORLD_HEIGHT", defaults.world_height)?,
            airplane_speed: parse_or("AIRPLANE_SPEED", defaults.airplane_speed)?,
            airplane_health: parse_or("AIRPLANE_HEALTH", defaults.airplane_health)?,
            projectile_speed: parse_or("PROJECTILE_SPEED", defaults.projectile_speed)?,
            projectile_damage: parse_or("PROJECTILE_DAMAGE", defaults.projectile_damage)?,
            hit_score: parse_or("HIT_SCORE", defaults.hit_score)?,
            ..defaults
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            auto_create_sessions: parse_or("AUTO_CREATE_SESSIONS", true)?,
            ws_message_rate_limit: NonZeroU32::new(parse_or("WS_MESSAGE_RATE_LIMIT", 0)?),
            game,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            client_origin: "*".to_string(),
            auto_create_sessions: true,
            ws_message_rate_limit: None,
            game: GameConfig::default(),
        }
    }
}

/// Read an optional variable, falling back to `default` when it is unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_world_rules() {
        let game = GameConfig::default();
        assert_eq!(game.tick_rate, 30);
        assert_eq!(game.world_width, 1920.0);
        assert_eq!(game.world_height, 1080.0);
        assert_eq!(game.airplane_extent, Extent::new(50.0, 50.0));
        assert_eq!(game.projectile_extent, Extent::new(30.0, 30.0));
        assert_eq!(game.hit_score, 10);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        std::env::set_var("AIRPLANE_GAME_TEST_GARBAGE", "not-a-number");
        let parsed: Result<u32, _> = parse_or("AIRPLANE_GAME_TEST_GARBAGE", 7);
        assert!(matches!(parsed, Err(ConfigError::Invalid("AIRPLANE_GAME_TEST_GARBAGE"))));

        let fallback: u32 = parse_or("AIRPLANE_GAME_TEST_UNSET", 7).unwrap();
        assert_eq!(fallback, 7);
    }
}
