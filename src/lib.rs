pub mod config;
pub mod dynamics;
pub mod error;
pub mod gnc;
pub mod io;
pub mod sensing;
pub mod sim;
pub mod terrain;

pub use config::{AutopilotConfig, MissionConfig, SimConstants};
pub use error::{ConfigError, Error, Result, TerrainError};
pub use sim::{fly, fly_with, FlightRecord, Mission, Outcome, PilotMode};
