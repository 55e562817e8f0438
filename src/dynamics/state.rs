use nalgebra::Vector2;

// ---------------------------------------------------------------------------
// Lander state
// ---------------------------------------------------------------------------

/// Rigid-body lander state in the world frame (x right, y down).
///
/// `vel.y` is positive when climbing, so integration lowers `pos.y` as the
/// craft rises. `angle` is 0 upright; positive rotates body +y toward +x.
#[derive(Debug, Clone, PartialEq)]
pub struct LanderState {
    pub pos: Vector2<f64>,
    pub vel: Vector2<f64>,  // [vx, vy], vy positive up
    pub angle: f64,         // rad
    pub angular_vel: f64,   // rad/s
    pub fuel_main: f64,
    pub aux_tanks: Vec<f64>,
    pub crashed: bool,
    pub landed: bool,
    /// Last applied command, kept for telemetry and display.
    pub actuators: ControlCommand,
}

impl LanderState {
    pub fn new(x: f64, y: f64, fuel_main: f64, aux_tanks: Vec<f64>) -> Self {
        Self {
            pos: Vector2::new(x, y),
            vel: Vector2::zeros(),
            angle: 0.0,
            angular_vel: 0.0,
            fuel_main,
            aux_tanks,
            crashed: false,
            landed: false,
            actuators: ControlCommand::default(),
        }
    }

    pub fn x(&self) -> f64 {
        self.pos.x
    }

    pub fn y(&self) -> f64 {
        self.pos.y
    }

    pub fn vx(&self) -> f64 {
        self.vel.x
    }

    pub fn vy(&self) -> f64 {
        self.vel.y
    }

    /// Crashed or landed; physics no longer integrates.
    pub fn is_terminal(&self) -> bool {
        self.crashed || self.landed
    }

    pub fn total_fuel(&self) -> f64 {
        self.fuel_main + self.aux_tanks.iter().sum::<f64>()
    }
}

// ---------------------------------------------------------------------------
// Actuator command
// ---------------------------------------------------------------------------

/// One tick of actuator demands. Throttles are fractions, gimbals radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlCommand {
    pub main: f64,
    pub left: f64,
    pub right: f64,
    pub left_gimbal: f64,
    pub right_gimbal: f64,
}

impl ControlCommand {
    /// Throttles clamped to [0, 1]; non-finite values become zero.
    pub fn clamped(&self) -> Self {
        let throttle = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let gimbal = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            main: throttle(self.main),
            left: throttle(self.left),
            right: throttle(self.right),
            left_gimbal: gimbal(self.left_gimbal),
            right_gimbal: gimbal(self.right_gimbal),
        }
    }
}
