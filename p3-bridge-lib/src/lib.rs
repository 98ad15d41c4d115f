#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod delivery;
pub mod error;
pub mod protocol;
pub mod stats;
pub mod transport;

pub use bridge::Bridge;
pub use config::{load_from_path, Config};
pub use error::{BridgeError, Result};
pub use protocol::{Framer, Record};
pub use stats::{BridgeStats, StatsSnapshot};
