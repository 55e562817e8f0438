pub mod event;
pub mod mission;
pub mod runner;

pub use event::{EventDetector, EventKind, SimEvent, Snapshot};
pub use mission::{Mission, PilotMode};
pub use runner::{fly, fly_with, FlightRecord, Outcome, Sample};
