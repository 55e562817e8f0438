use super::controller::Controller;
use crate::dynamics::state::{ControlCommand, LanderState};
use crate::sensing::RayHit;

/// Key-state snapshot for one tick of manual flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualKeys {
    pub main: bool,
    pub left: bool,
    pub right: bool,
    pub left_gimbal_up: bool,
    pub left_gimbal_down: bool,
    pub right_gimbal_up: bool,
    pub right_gimbal_down: bool,
}

/// Direct keyboard control. Thrusters are on/off; gimbals slew while their
/// keys are held and keep their angle when released.
#[derive(Debug, Clone)]
pub struct ManualPilot {
    pub slew_rate: f64, // rad/s
    pub max_gimbal: f64,
    dt: f64,
    keys: ManualKeys,
    left_gimbal: f64,
    right_gimbal: f64,
}

impl ManualPilot {
    pub fn new(slew_rate: f64, max_gimbal: f64, dt: f64) -> Self {
        Self {
            slew_rate,
            max_gimbal: max_gimbal.abs(),
            dt,
            keys: ManualKeys::default(),
            left_gimbal: 0.0,
            right_gimbal: 0.0,
        }
    }

    /// Keys held for the following ticks.
    pub fn set_keys(&mut self, keys: ManualKeys) {
        self.keys = keys;
    }

    pub fn keys(&self) -> ManualKeys {
        self.keys
    }

    /// Current (left, right) gimbal angles, rad.
    pub fn gimbals(&self) -> (f64, f64) {
        (self.left_gimbal, self.right_gimbal)
    }

    fn slew(&self, angle: f64, up: bool, down: bool) -> f64 {
        let step = self.slew_rate * self.dt;
        let mut angle = angle;
        if up {
            angle += step;
        }
        if down {
            angle -= step;
        }
        angle.clamp(-self.max_gimbal, self.max_gimbal)
    }
}

fn on(pressed: bool) -> f64 {
    if pressed {
        1.0
    } else {
        0.0
    }
}

impl Controller for ManualPilot {
    fn control(&mut self, _state: &LanderState, _hits: &[RayHit]) -> ControlCommand {
        let k = self.keys;
        self.left_gimbal = self.slew(self.left_gimbal, k.left_gimbal_up, k.left_gimbal_down);
        self.right_gimbal = self.slew(self.right_gimbal, k.right_gimbal_up, k.right_gimbal_down);
        ControlCommand {
            main: on(k.main),
            left: on(k.left),
            right: on(k.right),
            left_gimbal: self.left_gimbal,
            right_gimbal: self.right_gimbal,
        }
    }

    fn reset(&mut self) {
        self.keys = ManualKeys::default();
        self.left_gimbal = 0.0;
        self.right_gimbal = 0.0;
    }

    fn name(&self) -> &str {
        "manual"
    }
}
