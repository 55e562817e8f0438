use crate::dynamics::state::LanderState;
use crate::sensing::LandingSite;

// ---------------------------------------------------------------------------
// Mission events
// ---------------------------------------------------------------------------

/// Kinds of mission events.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    MissionStart { seed: u64 },
    SiteLocked { center_x: f64, y: f64 },
    PhaseChange { from: &'static str, to: &'static str },
    FuelExhausted,
    WindChanged { wind: f64 },
    /// Speeds are the last airborne values; contact zeroes the velocity.
    Landed { vx: f64, vy: f64, angle: f64 },
    Crashed { vx: f64, vy: f64, angle: f64 },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::MissionStart { .. } => "mission_start",
            EventKind::SiteLocked { .. } => "site_locked",
            EventKind::PhaseChange { .. } => "phase_change",
            EventKind::FuelExhausted => "fuel_exhausted",
            EventKind::WindChanged { .. } => "wind_changed",
            EventKind::Landed { .. } => "landed",
            EventKind::Crashed { .. } => "crashed",
        }
    }
}

/// A discrete event that occurred during a mission.
#[derive(Debug, Clone)]
pub struct SimEvent {
    pub time: f64,
    pub kind: EventKind,
    pub state: LanderState,
}

/// What the detectors compare between two ticks.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub time: f64,
    pub state: LanderState,
    pub phase: &'static str,
    pub locked: Option<LandingSite>,
    pub wind: f64,
}

/// Trait for passive event detectors.
/// Implementations inspect consecutive snapshots and report events.
pub trait EventDetector {
    fn check(&mut self, prev: &Snapshot, current: &Snapshot) -> Option<EventKind>;
}

/// Fires once when the lander comes to rest, landed or crashed.
pub struct TouchdownDetector;

impl EventDetector for TouchdownDetector {
    fn check(&mut self, prev: &Snapshot, current: &Snapshot) -> Option<EventKind> {
        if prev.state.is_terminal() {
            return None;
        }
        let (vx, vy, angle) = (prev.state.vx(), prev.state.vy(), current.state.angle);
        if current.state.landed {
            Some(EventKind::Landed { vx, vy, angle })
        } else if current.state.crashed {
            Some(EventKind::Crashed { vx, vy, angle })
        } else {
            None
        }
    }
}

/// Fires when the last fuel in every tank is gone.
pub struct FuelDetector;

impl EventDetector for FuelDetector {
    fn check(&mut self, prev: &Snapshot, current: &Snapshot) -> Option<EventKind> {
        (prev.state.total_fuel() > 0.0 && current.state.total_fuel() <= 0.0)
            .then_some(EventKind::FuelExhausted)
    }
}

pub struct PhaseDetector;

impl EventDetector for PhaseDetector {
    fn check(&mut self, prev: &Snapshot, current: &Snapshot) -> Option<EventKind> {
        (prev.phase != current.phase).then_some(EventKind::PhaseChange {
            from: prev.phase,
            to: current.phase,
        })
    }
}

/// Fires when a site becomes locked, including a re-lock after release.
pub struct SiteLockDetector;

impl EventDetector for SiteLockDetector {
    fn check(&mut self, prev: &Snapshot, current: &Snapshot) -> Option<EventKind> {
        match (prev.locked, current.locked) {
            (None, Some(site)) => Some(EventKind::SiteLocked {
                center_x: site.center_x,
                y: site.y_mean,
            }),
            (Some(old), Some(site)) if old != site => Some(EventKind::SiteLocked {
                center_x: site.center_x,
                y: site.y_mean,
            }),
            _ => None,
        }
    }
}

pub struct WindDetector;

impl EventDetector for WindDetector {
    fn check(&mut self, prev: &Snapshot, current: &Snapshot) -> Option<EventKind> {
        (prev.wind != current.wind).then_some(EventKind::WindChanged { wind: current.wind })
    }
}

/// The detectors every mission runs.
pub fn default_detectors() -> Vec<Box<dyn EventDetector>> {
    vec![
        Box::new(SiteLockDetector),
        Box::new(PhaseDetector),
        Box::new(WindDetector),
        Box::new(FuelDetector),
        Box::new(TouchdownDetector),
    ]
}
