use log::info;

use super::event::{EventKind, SimEvent};
use super::mission::Mission;
use crate::config::MissionConfig;
use crate::dynamics::state::{ControlCommand, LanderState};
use crate::error::Result;
use crate::sensing::LandingSite;

// ---------------------------------------------------------------------------
// Headless flights
// ---------------------------------------------------------------------------

/// One recorded tick.
#[derive(Debug, Clone)]
pub struct Sample {
    pub time: f64,
    pub state: LanderState,
    pub command: ControlCommand,
    pub phase: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Landed,
    Crashed,
    TimedOut,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Landed => "landed",
            Outcome::Crashed => "crashed",
            Outcome::TimedOut => "timed_out",
        }
    }
}

/// Everything a headless flight produced.
#[derive(Debug, Clone)]
pub struct FlightRecord {
    pub seed: u64,
    pub samples: Vec<Sample>,
    pub events: Vec<SimEvent>,
    pub locked_site: Option<LandingSite>,
    pub terrain: Vec<f64>,
}

impl FlightRecord {
    pub fn final_state(&self) -> Option<&LanderState> {
        self.samples.last().map(|s| &s.state)
    }

    pub fn outcome(&self) -> Outcome {
        match self.final_state() {
            Some(s) if s.landed => Outcome::Landed,
            Some(s) if s.crashed => Outcome::Crashed,
            _ => Outcome::TimedOut,
        }
    }

    pub fn flight_time(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.time)
    }

    /// The landed or crashed event, if the flight ended on the ground.
    pub fn touchdown(&self) -> Option<&SimEvent> {
        self.events
            .iter()
            .find(|e| matches!(e.kind, EventKind::Landed { .. } | EventKind::Crashed { .. }))
    }

    pub fn fuel_used(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => first.state.total_fuel() - last.state.total_fuel(),
            _ => 0.0,
        }
    }
}

/// Fly a fresh autopilot mission until touchdown or `max_time`.
pub fn fly(config: &MissionConfig, seed: u64, max_time: f64) -> Result<FlightRecord> {
    let mut mission = Mission::new(config.clone(), seed)?;
    Ok(fly_with(&mut mission, max_time))
}

/// Fly an already prepared mission (custom terrain, mode, wind) from its
/// current state. The mission is unpaused first.
pub fn fly_with(mission: &mut Mission, max_time: f64) -> FlightRecord {
    mission.set_paused(false);
    let sample = |m: &Mission| Sample {
        time: m.time(),
        state: m.state(),
        command: m.state().actuators,
        phase: m.phase().label(),
    };

    let capacity = (max_time / mission.config().constants.dt).max(0.0) as usize + 1;
    let mut samples = Vec::with_capacity(capacity.min(200_000));
    samples.push(sample(mission));

    while !mission.is_over() && mission.time() < max_time {
        mission.tick();
        samples.push(sample(mission));
    }

    let record = FlightRecord {
        seed: mission.seed(),
        samples,
        events: mission.events().to_vec(),
        locked_site: mission.locked_site().copied(),
        terrain: mission.terrain().heights().to_vec(),
    };
    info!(
        "flight {} after {:.2} s, {:.1} fuel used",
        record.outcome().label(),
        record.flight_time(),
        record.fuel_used()
    );
    record
}
