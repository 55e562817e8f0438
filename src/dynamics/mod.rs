pub mod engine;
pub mod state;

pub use engine::PhysicsEngine;
pub use state::{ControlCommand, LanderState};
