use log::{debug, info};
use nalgebra::{Rotation2, Vector2};

use crate::config::SimConstants;
use crate::dynamics::state::{ControlCommand, LanderState};

// ---------------------------------------------------------------------------
// Rigid-body physics engine (fixed tick, semi-implicit Euler)
// ---------------------------------------------------------------------------

/// Owns the lander state and advances it one fixed tick at a time.
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    constants: SimConstants,
    state: LanderState,
    wind: Vector2<f64>, // world-frame force, y component positive down
}

/// Body-frame thruster forces for one command.
struct Thrust {
    left_body: Vector2<f64>,
    right_body: Vector2<f64>,
    total_body: Vector2<f64>,
}

impl PhysicsEngine {
    pub fn new(constants: SimConstants) -> Self {
        Self {
            constants,
            state: LanderState::new(0.0, 0.0, 0.0, Vec::new()),
            wind: Vector2::zeros(),
        }
    }

    /// Reset to a fresh lander at rest. Terminal flags and actuator
    /// telemetry are cleared; wind is left as set.
    pub fn init(&mut self, x: f64, y: f64, main_fuel: f64, aux_tanks: &[f64]) {
        self.state = LanderState::new(x, y, main_fuel, aux_tanks.to_vec());
    }

    #[cfg(test)]
    pub(crate) fn restore(&mut self, state: LanderState) {
        self.state = state;
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LanderState {
        self.state.clone()
    }

    pub fn constants(&self) -> &SimConstants {
        &self.constants
    }

    /// External force applied from the next update on.
    pub fn set_wind(&mut self, wind: Vector2<f64>) {
        self.wind = wind;
    }

    /// Advance one tick. `terrain_height` is the ground y under the lander.
    /// Does nothing once the lander has crashed or landed.
    pub fn update(&mut self, command: &ControlCommand, terrain_height: f64) {
        if self.state.is_terminal() {
            return;
        }
        self.transfer_fuel();

        let c = &self.constants;
        let dt = c.dt;
        let cmd = command.clamped();

        // --- Throttle -> force, fuel burn ---
        let mut main_n = cmd.main * c.max_main_thrust;
        let mut left_n = cmd.left * c.max_side_thrust;
        let mut right_n = cmd.right * c.max_side_thrust;

        let burn = (main_n + left_n + right_n) * c.fuel_burn_rate * dt;
        self.state.fuel_main = (self.state.fuel_main - burn).max(0.0);
        if self.state.fuel_main <= 0.0 {
            main_n = 0.0;
            left_n = 0.0;
            right_n = 0.0;
        }

        let thrust = body_thrust(main_n, left_n, right_n, &cmd);

        // --- Translation ---
        let to_world = Rotation2::new(-self.state.angle);
        let force = to_world * thrust.total_body;
        let vel = self.state.vel;
        let accel = Vector2::new(
            force.x / c.mass + self.wind.x / c.mass - c.drag_x * vel.x,
            force.y / c.mass - c.gravity - self.wind.y / c.mass - c.drag_y * vel.y,
        );

        self.state.vel += accel * dt;
        self.state.pos.x += self.state.vel.x * dt;
        self.state.pos.y -= self.state.vel.y * dt;

        // --- Rotation: side thrusters at +-half width ---
        let half_w = 0.5 * c.body_width;
        let lever_left = to_world * Vector2::new(-half_w, 0.0);
        let lever_right = to_world * Vector2::new(half_w, 0.0);
        let torque = lever_left.perp(&(to_world * thrust.left_body))
            + lever_right.perp(&(to_world * thrust.right_body));

        self.state.angular_vel += torque / c.inertia() * dt;
        self.state.angular_vel *= c.angular_damping;
        self.state.angle += self.state.angular_vel * dt;

        self.check_contact(terrain_height);

        self.state.actuators = cmd;
    }

    /// Top up the main tank from the first non-empty auxiliary tank.
    fn transfer_fuel(&mut self) {
        if self.state.fuel_main >= self.constants.main_tank_capacity {
            return;
        }
        let rate = self.constants.fuel_transfer_rate;
        if let Some((i, tank)) = self
            .state
            .aux_tanks
            .iter_mut()
            .enumerate()
            .find(|(_, t)| **t > 0.0)
        {
            let amount = tank.min(rate);
            *tank -= amount;
            self.state.fuel_main += amount;
            if *tank <= 0.0 {
                debug!("aux tank {i} drained");
            }
        }
    }

    fn check_contact(&mut self, terrain_height: f64) {
        let contact_y = terrain_height - self.constants.ground_offset;
        if self.state.pos.y < contact_y {
            return;
        }
        let c = &self.constants;
        let s = &mut self.state;
        s.pos.y = contact_y;

        let safe_speed = s.vel.x.abs() < c.safe_speed && s.vel.y.abs() < c.safe_speed;
        let level = s.angle.abs() < c.max_landing_angle;
        if safe_speed && level {
            s.landed = true;
        } else {
            s.crashed = true;
        }
        info!(
            "touchdown at x={:.1}: {} (vx={:.2}, vy={:.2}, angle={:.1} deg)",
            s.pos.x,
            if s.landed { "landed" } else { "crashed" },
            s.vel.x,
            s.vel.y,
            s.angle.to_degrees()
        );

        s.vel = Vector2::zeros();
        s.angular_vel = 0.0;
    }
}

/// Compose thruster forces in the body frame (body +y is "up" the engine axis).
/// The left thruster pushes toward +x, the right toward -x; each gimbal tilts
/// its thruster's force toward body +y.
fn body_thrust(main_n: f64, left_n: f64, right_n: f64, cmd: &ControlCommand) -> Thrust {
    let left_body = Vector2::new(
        left_n * cmd.left_gimbal.cos(),
        left_n * cmd.left_gimbal.sin(),
    );
    let right_body = Vector2::new(
        -right_n * cmd.right_gimbal.cos(),
        right_n * cmd.right_gimbal.sin(),
    );
    Thrust {
        left_body,
        right_body,
        total_body: Vector2::new(0.0, main_n) + left_body + right_body,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FAR_BELOW: f64 = 1.0e9;

    fn engine() -> PhysicsEngine {
        let mut e = PhysicsEngine::new(SimConstants::default());
        e.init(500.0, 100.0, 50.0, &[100.0, 100.0]);
        e
    }

    fn dragless() -> PhysicsEngine {
        let constants = SimConstants {
            drag_x: 0.0,
            drag_y: 0.0,
            ..SimConstants::default()
        };
        let mut e = PhysicsEngine::new(constants);
        e.init(500.0, 100.0, 50.0, &[]);
        e
    }

    #[test]
    fn free_fall_matches_gravity() {
        let mut e = dragless();
        let n = 50;
        for _ in 0..n {
            e.update(&ControlCommand::default(), FAR_BELOW);
        }
        let s = e.state();
        let c = e.constants();
        assert_relative_eq!(s.vel.y, -c.gravity * c.dt * n as f64, epsilon = 1e-9);
        assert_relative_eq!(s.vel.x, 0.0);
        assert!(s.pos.y > 100.0, "falling increases y");
    }

    #[test]
    fn drag_slows_the_fall() {
        let mut e = engine();
        for _ in 0..50 {
            e.update(&ControlCommand::default(), FAR_BELOW);
        }
        let c = SimConstants::default();
        assert!(e.state().vel.y.abs() < c.gravity * c.dt * 50.0);
    }

    #[test]
    fn full_main_thrust_climbs() {
        let mut e = engine();
        let cmd = ControlCommand { main: 1.0, ..Default::default() };
        for _ in 0..10 {
            e.update(&cmd, FAR_BELOW);
        }
        let s = e.state();
        assert!(s.vel.y > 0.0);
        assert!(s.pos.y < 100.0, "climbing reduces y");
        assert_eq!(s.actuators.main, 1.0);
    }

    #[test]
    fn tilted_main_thrust_pushes_toward_positive_x() {
        let mut e = engine();
        let mut s = e.state();
        s.angle = 0.3;
        e.restore(s);
        e.update(&ControlCommand { main: 1.0, ..Default::default() }, FAR_BELOW);
        assert!(e.state().vel.x > 0.0);
    }

    #[test]
    fn opposed_gimbals_spin_without_translating() {
        let mut e = dragless();
        let cmd = ControlCommand {
            main: 0.0,
            left: 1.0,
            right: 1.0,
            left_gimbal: -0.4,
            right_gimbal: 0.4,
        };
        e.update(&cmd, FAR_BELOW);
        let s = e.state();
        assert!(s.angular_vel > 0.0, "positive turn command raises the angle");
        assert_relative_eq!(s.vel.x, 0.0, epsilon = 1e-12);
        let c = e.constants();
        assert_relative_eq!(s.vel.y, -c.gravity * c.dt, epsilon = 1e-12);
    }

    #[test]
    fn aux_tanks_feed_main_in_order() {
        let mut e = PhysicsEngine::new(SimConstants::default());
        e.init(0.0, 0.0, 50.0, &[3.0, 100.0]);
        e.update(&ControlCommand::default(), FAR_BELOW);
        let s = e.state();
        assert_eq!(s.aux_tanks, vec![0.0, 100.0]);
        assert_relative_eq!(s.fuel_main, 53.0);
        e.update(&ControlCommand::default(), FAR_BELOW);
        let s = e.state();
        assert_eq!(s.aux_tanks, vec![0.0, 95.0]);
        assert_relative_eq!(s.fuel_main, 58.0);
    }

    #[test]
    fn full_main_tank_skips_transfer() {
        let mut e = PhysicsEngine::new(SimConstants::default());
        e.init(0.0, 0.0, 500.0, &[100.0]);
        e.update(&ControlCommand::default(), FAR_BELOW);
        assert_eq!(e.state().aux_tanks, vec![100.0]);
    }

    #[test]
    fn burn_is_proportional_to_thrust() {
        let mut e = PhysicsEngine::new(SimConstants::default());
        e.init(0.0, 0.0, 500.0, &[]);
        e.update(&ControlCommand { main: 1.0, ..Default::default() }, FAR_BELOW);
        let c = SimConstants::default();
        assert_relative_eq!(
            e.state().fuel_main,
            500.0 - c.max_main_thrust * c.fuel_burn_rate * c.dt,
            epsilon = 1e-9
        );
    }

    #[test]
    fn empty_tank_still_integrates_a_tick() {
        let mut e = dragless();
        let mut s = e.state();
        s.fuel_main = 0.0;
        e.restore(s);
        e.update(&ControlCommand { main: 1.0, ..Default::default() }, FAR_BELOW);
        let s = e.state();
        let c = e.constants();
        assert_relative_eq!(s.vel.y, -c.gravity * c.dt, epsilon = 1e-12);
        assert_eq!(s.fuel_main, 0.0);
    }

    #[test]
    fn wind_pushes_sideways() {
        let mut e = engine();
        e.set_wind(Vector2::new(10.0, 0.0));
        e.update(&ControlCommand::default(), FAR_BELOW);
        assert!(e.state().vel.x > 0.0);
    }

    #[test]
    fn gentle_touchdown_lands() {
        let mut e = engine();
        let mut s = e.state();
        s.pos.y = 579.9;
        s.vel = Vector2::new(0.0, -5.0);
        e.restore(s);
        e.update(&ControlCommand::default(), 600.0);
        let s = e.state();
        assert!(s.landed);
        assert!(!s.crashed);
        assert_eq!(s.pos.y, 580.0);
        assert_eq!(s.vel, Vector2::zeros());
        assert_eq!(s.angular_vel, 0.0);
    }

    #[test]
    fn fast_touchdown_crashes() {
        let mut e = engine();
        let mut s = e.state();
        s.pos.y = 579.0;
        s.vel = Vector2::new(0.0, -30.0);
        e.restore(s);
        e.update(&ControlCommand::default(), 600.0);
        let s = e.state();
        assert!(s.crashed);
        assert!(!s.landed);
    }

    #[test]
    fn tilted_touchdown_crashes() {
        let mut e = engine();
        let mut s = e.state();
        s.pos.y = 579.9;
        s.vel = Vector2::new(0.0, -2.0);
        s.angle = 0.5;
        e.restore(s);
        e.update(&ControlCommand::default(), 600.0);
        assert!(e.state().crashed);
    }

    #[test]
    fn terminal_state_is_frozen() {
        let mut e = engine();
        let mut s = e.state();
        s.pos.y = 579.9;
        s.vel = Vector2::new(1.0, -3.0);
        e.restore(s);
        e.update(&ControlCommand::default(), 600.0);
        let before = e.state();
        assert!(before.landed);

        e.set_wind(Vector2::new(50.0, 50.0));
        let cmd = ControlCommand {
            main: 1.0,
            left: 1.0,
            right: 0.5,
            left_gimbal: 0.2,
            right_gimbal: -0.2,
        };
        for _ in 0..10 {
            e.update(&cmd, 600.0);
        }
        assert_eq!(e.state(), before);
    }
}
