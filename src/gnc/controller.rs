use crate::dynamics::state::{ControlCommand, LanderState};
use crate::sensing::RayHit;

/// Trait for flight controllers.
///
/// Implement this to plug a pilot into the mission loop. A controller must
/// always return a command, even with no radar returns.
pub trait Controller {
    /// Compute actuator demands for the next tick.
    fn control(&mut self, state: &LanderState, hits: &[RayHit]) -> ControlCommand;

    /// Reset controller internal state (e.g., PID integrators).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}
