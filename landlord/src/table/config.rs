//! Room and robot configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::entities::RoomId;

/// Room configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Whether robots may fill empty seats at this room's tables
    pub allow_robot: bool,

    /// Entrance fee advertised to clients
    pub entrance_fee: i64,

    /// Stake per multiplier point at settlement
    pub base_stake: i64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            allow_robot: true,
            entrance_fee: 200,
            base_stake: 1,
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.entrance_fee < 0 {
            return Err("Entrance fee must not be negative".to_string());
        }

        if self.base_stake <= 0 {
            return Err("Base stake must be positive".to_string());
        }

        Ok(())
    }

    /// The fixed rooms created at startup: room 1 lets robots fill seats,
    /// room 2 is humans only.
    pub fn default_rooms(entrance_fee: i64, base_stake: i64) -> Vec<(RoomId, RoomConfig)> {
        vec![
            (
                1,
                RoomConfig {
                    allow_robot: true,
                    entrance_fee,
                    base_stake,
                },
            ),
            (
                2,
                RoomConfig {
                    allow_robot: false,
                    entrance_fee,
                    base_stake,
                },
            ),
        ]
    }
}

/// Robot pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotConfig {
    /// Pause before a robot acts on its turn
    pub think_time: Duration,

    /// Pause between creating a table and robots filling its empty seats
    pub fill_delay: Duration,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            think_time: Duration::from_secs(1),
            fill_delay: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_room_is_valid() {
        assert!(RoomConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_stake() {
        let config = RoomConfig {
            base_stake: 0,
            ..RoomConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_fee() {
        let config = RoomConfig {
            entrance_fee: -1,
            ..RoomConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_rooms_robot_policy() {
        let rooms = RoomConfig::default_rooms(200, 1);
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].0, 1);
        assert!(rooms[0].1.allow_robot);
        assert_eq!(rooms[1].0, 2);
        assert!(!rooms[1].1.allow_robot);
        assert!(rooms.iter().all(|(_, c)| c.entrance_fee == 200));
    }
}
