//! Robot players that fill empty seats.
//!
//! - `transport`: the channel pair a robot session talks through
//! - `memory`: table state a robot rebuilds from events, and its choices
//! - `driver`: the task that plays for a robot, plus spawning and seat filling

pub mod driver;
pub mod memory;
pub mod transport;

pub use driver::{RobotDriver, fill_table_after, spawn_robot};
pub use memory::RobotMemory;
pub use transport::{RobotLink, RobotTransport};
