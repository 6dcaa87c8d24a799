//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use landlord::table::{RobotConfig, RoomConfig};
use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Default listen port
pub const DEFAULT_PORT: u16 = 6969;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Robot pacing
    pub robots: RobotConfig,
    /// Connection deadlines
    pub connection: ConnectionConfig,
    /// Settings shared by the fixed rooms
    pub rooms: RoomDefaultsConfig,
}

/// Websocket deadlines
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Longest a single write may take
    pub write_wait: Duration,
    /// Longest the read side waits for any frame, pongs included
    pub pong_wait: Duration,
}

impl ConnectionConfig {
    /// Pings go out often enough that a healthy peer's pong lands well
    /// inside the pong wait.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait.mul_f64(0.9)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            write_wait: Duration::from_secs(10),
            pong_wait: Duration::from_secs(60),
        }
    }
}

/// Room settings
#[derive(Debug, Clone, Copy)]
pub struct RoomDefaultsConfig {
    pub entrance_fee: i64,
    pub base_stake: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `ServerConfig` - Loaded configuration; call [`ServerConfig::validate`] next
    pub fn from_env(bind_override: Option<SocketAddr>) -> Self {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)));

        let robot_defaults = RobotConfig::default();
        let robots = RobotConfig {
            think_time: Duration::from_millis(parse_env_or(
                "ROBOT_THINK_MS",
                robot_defaults.think_time.as_millis() as u64,
            )),
            fill_delay: Duration::from_millis(parse_env_or(
                "ROBOT_FILL_DELAY_MS",
                robot_defaults.fill_delay.as_millis() as u64,
            )),
        };

        let connection_defaults = ConnectionConfig::default();
        let connection = ConnectionConfig {
            write_wait: Duration::from_millis(parse_env_or(
                "WRITE_WAIT_MS",
                connection_defaults.write_wait.as_millis() as u64,
            )),
            pong_wait: Duration::from_secs(parse_env_or(
                "PONG_WAIT_SECS",
                connection_defaults.pong_wait.as_secs(),
            )),
        };

        let room_defaults = RoomConfig::default();
        let rooms = RoomDefaultsConfig {
            entrance_fee: parse_env_or("ROOM_ENTRANCE_FEE", room_defaults.entrance_fee),
            base_stake: parse_env_or("ROOM_BASE_STAKE", room_defaults.base_stake),
        };

        ServerConfig {
            bind,
            robots,
            connection,
            rooms,
        }
    }

    /// The fixed rooms this server hosts
    pub fn room_configs(&self) -> Vec<(landlord::RoomId, RoomConfig)> {
        RoomConfig::default_rooms(self.rooms.entrance_fee, self.rooms.base_stake)
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.write_wait.is_zero() {
            return Err(ConfigError::Invalid {
                var: "WRITE_WAIT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.connection.pong_wait.is_zero() {
            return Err(ConfigError::Invalid {
                var: "PONG_WAIT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.rooms.entrance_fee < 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_ENTRANCE_FEE".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        for (_, room) in self.room_configs() {
            room.validate().map_err(|reason| ConfigError::Invalid {
                var: "ROOM_BASE_STAKE".to_string(),
                reason,
            })?;
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            robots: RobotConfig::default(),
            connection: ConnectionConfig::default(),
            rooms: RoomDefaultsConfig {
                entrance_fee: 200,
                base_stake: 1,
            },
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "PONG_WAIT_SECS".to_string(),
            reason: "Must be greater than 0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PONG_WAIT_SECS"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
        assert_eq!(config().room_configs().len(), 2);
    }

    #[test]
    fn test_config_validation_zero_pong_wait() {
        let mut config = config();
        config.connection.pong_wait = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "PONG_WAIT_SECS"));
    }

    #[test]
    fn test_config_validation_zero_stake() {
        let mut config = config();
        config.rooms.base_stake = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ping_period_is_inside_pong_wait() {
        let connection = ConnectionConfig::default();
        assert!(connection.ping_period() < connection.pong_wait);
    }

    #[test]
    fn test_bind_override_wins() {
        let bind: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        assert_eq!(ServerConfig::from_env(Some(bind)).bind, bind);
    }
}
