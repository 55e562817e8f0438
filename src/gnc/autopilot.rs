use log::info;

use super::controller::Controller;
use super::pid::Pid;
use crate::config::{AutopilotConfig, SimConstants};
use crate::dynamics::state::{ControlCommand, LanderState};
use crate::sensing::{detect, pick_best, DetectorConfig, LandingSite, RayHit};

// ---------------------------------------------------------------------------
// Autopilot phases
// ---------------------------------------------------------------------------

/// Landing phase, with the timers that only exist while hovering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Fly toward the target at bounded horizontal speed, holding hover altitude.
    Approach,
    /// Hold position over the target until stable or timed out.
    Hover {
        /// Continuous time with position and rotation stable, s.
        stable_for: f64,
        /// Total time in this hover, s.
        elapsed: f64,
    },
    /// Staged vertical descent to touchdown.
    Descend,
}

impl Phase {
    pub const HOVER: Phase = Phase::Hover { stable_for: 0.0, elapsed: 0.0 };

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Approach => "approach",
            Phase::Hover { .. } => "hover",
            Phase::Descend => "descend",
        }
    }
}

/// Everything the autopilot accumulates between ticks. Replaced wholesale on
/// every phase change and on reset.
#[derive(Debug, Clone, PartialEq)]
struct Session {
    phase: Phase,
    horizontal: Pid, // vx error -> attitude target (PI)
    vertical: Pid,   // vy error -> throttle trim (PID)
}

impl Session {
    fn new(config: &AutopilotConfig, phase: Phase) -> Self {
        Self {
            phase,
            horizontal: Pid::new(config.vx_kp, config.vx_ki, 0.0, config.vx_integral_limit),
            vertical: Pid::new(config.vy_kp, config.vy_ki, config.vy_kd, config.vy_integral_limit),
        }
    }
}

/// Where the autopilot is steering this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Target {
    x: f64,
    ground_y: f64,
}

// ---------------------------------------------------------------------------
// Landing controller
// ---------------------------------------------------------------------------

/// Phased autopilot: approach a landing site, hover over it, then descend.
#[derive(Debug, Clone)]
pub struct LandingController {
    constants: SimConstants,
    config: AutopilotConfig,
    detector: DetectorConfig,
    session: Session,
    locked: Option<LandingSite>,
}

impl LandingController {
    pub fn new(constants: SimConstants, config: AutopilotConfig, detector: DetectorConfig) -> Self {
        let session = Session::new(&config, Phase::Approach);
        Self {
            constants,
            config,
            detector,
            session,
            locked: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// Lock a site; it is used until cleared, reset, or abandoned after
    /// drifting off it during descent.
    pub fn set_landing_target(&mut self, site: LandingSite) {
        self.locked = Some(site);
    }

    pub fn clear_landing_target(&mut self) {
        self.locked = None;
    }

    pub fn has_landing_target(&self) -> bool {
        self.locked.is_some()
    }

    pub fn landing_target(&self) -> Option<&LandingSite> {
        self.locked.as_ref()
    }

    /// Back to Approach with zeroed timers and integrators, target unlocked.
    pub fn reset(&mut self) {
        self.session = Session::new(&self.config, Phase::Approach);
        self.locked = None;
    }

    /// One tick of guidance and control.
    pub fn compute(&mut self, state: &LanderState, hits: &[RayHit]) -> ControlCommand {
        let target = self.resolve_target(state, hits);
        let alt = target.ground_y - self.config.target_ground_offset - state.y();
        let dist_x = target.x - state.x();

        self.advance_phase(state, dist_x);

        let target_angle = self.attitude_target(state, dist_x, alt);
        let (side, gimbal) = self.attitude_command(state, target_angle, alt);
        let main = self.main_throttle(state, alt);

        ControlCommand {
            main,
            left: side,
            right: side,
            left_gimbal: -gimbal,
            right_gimbal: gimbal,
        }
    }

    /// Locked site, else the best freshly detected one, else straight down to
    /// the nearest radar return (or a fixed depth when blind).
    fn resolve_target(&self, state: &LanderState, hits: &[RayHit]) -> Target {
        let site = self
            .locked
            .or_else(|| pick_best(&detect(hits, state.x(), &self.detector)));
        match site {
            Some(site) => Target { x: site.center_x, ground_y: site.y_mean },
            None => Target {
                x: state.x(),
                ground_y: nearest_ground_y(hits)
                    .unwrap_or(state.y() + self.config.blind_ground_depth),
            },
        }
    }

    fn enter(&mut self, phase: Phase) {
        info!("autopilot: {} -> {}", self.session.phase.label(), phase.label());
        self.session = Session::new(&self.config, phase);
    }

    fn advance_phase(&mut self, state: &LanderState, dist_x: f64) {
        let cfg = &self.config;
        let dt = self.constants.dt;
        let omega = state.angular_vel.abs();

        if self.session.phase == Phase::Descend && dist_x.abs() > cfg.drift_abort_x {
            info!("autopilot: drifted {dist_x:.1} off target during descent, releasing lock");
            self.locked = None;
            self.enter(Phase::Approach);
        }

        let cfg = &self.config;
        match self.session.phase {
            Phase::Approach => {
                if dist_x.abs() < cfg.hover_entry_x && state.vx().abs() < cfg.hover_entry_vx {
                    self.enter(Phase::HOVER);
                }
            }
            Phase::Hover { stable_for, elapsed } => {
                let elapsed = elapsed + dt;
                let stable = omega < cfg.stable_angular_vel
                    && dist_x.abs() < cfg.x_tolerance
                    && state.vx().abs() < cfg.stable_vx;
                let stable_for = if stable { stable_for + dt } else { 0.0 };

                let settled = stable_for >= cfg.stable_time;
                let timed_out = elapsed > cfg.hover_timeout && omega < cfg.timeout_angular_vel;
                if settled || timed_out {
                    info!(
                        "autopilot: descent initiated ({})",
                        if settled { "stable" } else { "hover timeout" }
                    );
                    self.enter(Phase::Descend);
                } else {
                    self.session.phase = Phase::Hover { stable_for, elapsed };
                }
            }
            Phase::Descend => {}
        }
    }

    /// Attitude setpoint from the horizontal velocity loop.
    fn attitude_target(&mut self, state: &LanderState, dist_x: f64, alt: f64) -> f64 {
        let cfg = &self.config;
        let target_vx = match self.session.phase {
            Phase::Approach => {
                (dist_x * cfg.approach_gain).clamp(-cfg.max_approach_speed, cfg.max_approach_speed)
            }
            _ => 0.0,
        };
        let error = target_vx - state.vx();
        let out = if state.is_terminal() {
            self.session.horizontal.hold(error)
        } else {
            self.session.horizontal.update(error, self.constants.dt)
        };
        let angle = out.clamp(-cfg.max_tilt, cfg.max_tilt);

        if self.session.phase == Phase::Descend {
            angle * level_ratio(alt, cfg.level_end_alt, cfg.level_start_alt)
        } else {
            angle
        }
    }

    /// PD attitude hold through the side thrusters. Returns (throttle, gimbal)
    /// applied symmetrically: equal throttles, opposite gimbals.
    fn attitude_command(&self, state: &LanderState, target_angle: f64, alt: f64) -> (f64, f64) {
        let cfg = &self.config;
        let error = target_angle - state.angle;
        let deadband = if self.session.phase == Phase::Descend && alt < cfg.fine_deadband_alt {
            cfg.fine_angle_deadband
        } else {
            cfg.angle_deadband
        };
        if error.abs() < deadband && state.angular_vel.abs() < cfg.angular_vel_deadband {
            return (0.0, 0.0);
        }

        let (kp, kd, max_gimbal) = if alt < cfg.low_alt {
            (cfg.low_alt_kp, cfg.low_alt_kd, cfg.low_alt_max_gimbal)
        } else {
            (cfg.attitude_kp, cfg.attitude_kd, cfg.max_gimbal)
        };
        let turn = (error * kp - state.angular_vel * kd).clamp(-1.0, 1.0);
        (turn.abs(), turn * max_gimbal)
    }

    /// Vertical speed loop on top of tilt-compensated hover throttle.
    fn main_throttle(&mut self, state: &LanderState, alt: f64) -> f64 {
        let cfg = &self.config;
        let target_vy = match self.session.phase {
            Phase::Descend => -descent_rate(cfg, alt),
            _ => ((cfg.hover_altitude - alt) * cfg.hover_alt_gain)
                .clamp(-cfg.max_climb_rate, cfg.max_climb_rate),
        };
        let trim = self.session.vertical.update(target_vy - state.vy(), self.constants.dt);

        let cos_tilt = state.angle.cos().abs().max(cfg.min_tilt_cos);
        let base = self.constants.hover_throttle() / cos_tilt;
        let throttle = (base + trim).clamp(0.0, 1.0);

        if alt < cfg.brake_alt && state.vy() < -cfg.brake_descent_rate {
            1.0
        } else if throttle.is_finite() {
            throttle
        } else {
            0.0
        }
    }
}

impl Controller for LandingController {
    fn control(&mut self, state: &LanderState, hits: &[RayHit]) -> ControlCommand {
        self.compute(state, hits)
    }

    fn reset(&mut self) {
        LandingController::reset(self);
    }

    fn name(&self) -> &str {
        "autopilot"
    }
}

/// Height of the closest radar return, if any ray hit.
fn nearest_ground_y(hits: &[RayHit]) -> Option<f64> {
    hits.iter()
        .filter(|h| h.hit)
        .min_by(|a, b| a.t.total_cmp(&b.t))
        .map(|h| h.point.y)
}

/// Target descent speed for the altitude band, from the staged profile.
fn descent_rate(cfg: &AutopilotConfig, alt: f64) -> f64 {
    cfg.descent_profile
        .iter()
        .filter(|(below, _)| alt < *below)
        .last()
        .map_or(cfg.cruise_descent_rate, |&(_, rate)| rate)
}

/// 1 above `start`, 0 below `end`, linear in between.
fn level_ratio(alt: f64, end: f64, start: f64) -> f64 {
    if alt < end {
        0.0
    } else {
        ((alt - end) / (start - end)).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::{scan, RadarConfig};
    use crate::terrain::Terrain;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    const SITE: LandingSite = LandingSite {
        x0: 470.0,
        x1: 530.0,
        center_x: 500.0,
        y_mean: 600.0,
        slope: 0.0,
        score: 60.0,
    };

    fn controller() -> LandingController {
        let constants = SimConstants::default();
        let detector = DetectorConfig::for_landing_angle(constants.max_landing_angle);
        LandingController::new(constants, AutopilotConfig::default(), detector)
    }

    /// Lander at `x` with `alt` above the site's aim point.
    fn lander(x: f64, alt: f64) -> LanderState {
        let aim = SITE.y_mean - AutopilotConfig::default().target_ground_offset;
        LanderState::new(x, aim - alt, 500.0, vec![])
    }

    fn assert_valid(cmd: &ControlCommand) {
        for v in [cmd.main, cmd.left, cmd.right, cmd.left_gimbal, cmd.right_gimbal] {
            assert!(v.is_finite());
        }
        for t in [cmd.main, cmd.left, cmd.right] {
            assert!((0.0..=1.0).contains(&t));
        }
    }

    fn hover_until_descend(ctl: &mut LandingController, state: &LanderState) -> usize {
        for tick in 1..=400 {
            ctl.compute(state, &[]);
            if ctl.phase() == Phase::Descend {
                return tick;
            }
            assert!(matches!(ctl.phase(), Phase::Hover { .. }), "left hover at tick {tick}");
        }
        panic!("never descended");
    }

    #[test]
    fn phases_progress_in_order() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let mut seen = vec![ctl.phase().label()];

        ctl.compute(&lander(100.0, 120.0), &[]);
        seen.push(ctl.phase().label());
        assert_eq!(ctl.phase(), Phase::Approach);

        let over = lander(500.0, 120.0);
        ctl.compute(&over, &[]);
        assert_eq!(ctl.phase(), Phase::HOVER);

        let ticks = hover_until_descend(&mut ctl, &over);
        seen.push("hover");
        seen.push(ctl.phase().label());
        assert!((25..=26).contains(&ticks), "descended after {ticks} stable ticks");

        seen.dedup();
        assert_eq!(seen, vec!["approach", "hover", "descend"]);
    }

    #[test]
    fn hover_times_out_when_never_settled() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let mut state = lander(500.0, 120.0);
        state.vel.x = 10.0; // below hover entry, above stable limit
        ctl.compute(&state, &[]);
        assert_eq!(ctl.phase(), Phase::HOVER);
        let ticks = hover_until_descend(&mut ctl, &state);
        assert!((150..=151).contains(&ticks), "timed out after {ticks} ticks");
    }

    #[test]
    fn hover_timeout_waits_for_rotation_to_settle() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let mut state = lander(500.0, 120.0);
        state.vel.x = 10.0;
        ctl.compute(&state, &[]);
        state.angular_vel = 0.6;
        for _ in 0..300 {
            ctl.compute(&state, &[]);
        }
        assert!(matches!(ctl.phase(), Phase::Hover { .. }));
    }

    #[test]
    fn unstable_tick_restarts_stable_timer() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let over = lander(500.0, 120.0);
        ctl.compute(&over, &[]);
        for _ in 0..20 {
            ctl.compute(&over, &[]);
        }
        let mut spinning = over.clone();
        spinning.angular_vel = 0.4;
        ctl.compute(&spinning, &[]);
        match ctl.phase() {
            Phase::Hover { stable_for, elapsed } => {
                assert_eq!(stable_for, 0.0);
                assert!(elapsed > 0.8);
            }
            other => panic!("expected hover, got {other:?}"),
        }
    }

    #[test]
    fn drifting_during_descent_returns_to_approach_and_unlocks() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let over = lander(500.0, 120.0);
        ctl.compute(&over, &[]);
        hover_until_descend(&mut ctl, &over);

        // Small drift keeps descending.
        ctl.compute(&lander(540.0, 100.0), &[]);
        assert_eq!(ctl.phase(), Phase::Descend);
        assert!(ctl.has_landing_target());

        ctl.compute(&lander(600.0, 100.0), &[]);
        assert_eq!(ctl.phase(), Phase::Approach);
        assert!(!ctl.has_landing_target());
    }

    #[test]
    fn reset_restores_initial_session() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let over = lander(500.0, 120.0);
        ctl.compute(&lander(100.0, 60.0), &[]);
        ctl.compute(&over, &[]);
        ctl.compute(&over, &[]);
        assert_ne!(ctl.session, Session::new(&ctl.config, Phase::Approach));

        ctl.reset();
        assert_eq!(ctl.phase(), Phase::Approach);
        assert_eq!(ctl.session, Session::new(&ctl.config, Phase::Approach));
        assert_eq!(ctl.session.horizontal.integral(), 0.0);
        assert_eq!(ctl.session.vertical.prev_error(), 0.0);
        assert!(!ctl.has_landing_target());
    }

    #[test]
    fn landing_target_lock_roundtrip() {
        let mut ctl = controller();
        assert!(!ctl.has_landing_target());
        assert_eq!(ctl.landing_target(), None);
        ctl.set_landing_target(SITE);
        assert_eq!(ctl.landing_target(), Some(&SITE));
        ctl.clear_landing_target();
        assert!(!ctl.has_landing_target());
    }

    #[test]
    fn blind_autopilot_still_commands() {
        let mut ctl = controller();
        let state = LanderState::new(300.0, 100.0, 500.0, vec![]);
        let cmd = ctl.compute(&state, &[]);
        assert_valid(&cmd);
        let target = ctl.resolve_target(&state, &[]);
        assert_eq!(target, Target { x: 300.0, ground_y: 300.0 });
    }

    #[test]
    fn unlocked_autopilot_redetects_from_radar() {
        // Mesa flat at y = 500 over x in 380..=500; the flanks drop away out
        // of radar reach.
        let heights: Vec<f64> = (0..900)
            .map(|x| match x {
                x if x < 380 => 500.0 + 8.0 * (380 - x) as f64,
                x if x > 500 => 500.0 + 8.0 * (x - 500) as f64,
                _ => 500.0,
            })
            .collect();
        let terrain = Terrain::from_heights(heights).unwrap();
        let state = LanderState::new(440.0, 400.0, 500.0, vec![]);
        let hits = scan(&terrain, state.pos, 0.0, &RadarConfig::default());

        let ctl = controller();
        let target = ctl.resolve_target(&state, &hits);
        assert_relative_eq!(target.ground_y, 500.0, epsilon = 1e-6);
        assert!((target.x - 440.0).abs() < 3.0, "target x {}", target.x);
        assert!(!ctl.has_landing_target(), "detection alone never locks");
    }

    #[test]
    fn nearest_return_is_fallback_ground() {
        let terrain = Terrain::from_heights(vec![400.0; 200]).unwrap();
        let radar = RadarConfig { ray_count: 3, ..RadarConfig::default() };
        let hits = scan(&terrain, Vector2::new(100.0, 100.0), 0.0, &radar);
        assert_relative_eq!(nearest_ground_y(&hits).unwrap(), 400.0, epsilon = 1e-9);
        assert_eq!(nearest_ground_y(&[]), None);
    }

    #[test]
    fn emergency_brake_fires_low_and_fast() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let mut state = lander(500.0, 50.0);
        state.vel.y = -25.0;
        let cmd = ctl.compute(&state, &[]);
        assert_eq!(cmd.main, 1.0);
    }

    #[test]
    fn tilt_raises_base_throttle() {
        let mut upright = controller();
        let mut tilted = controller();
        upright.set_landing_target(SITE);
        tilted.set_landing_target(SITE);
        let state = lander(100.0, 120.0);
        let mut leaning = state.clone();
        leaning.angle = 0.5;
        let a = upright.compute(&state, &[]).main;
        let b = tilted.compute(&leaning, &[]).main;
        let hover = SimConstants::default().hover_throttle();
        assert_relative_eq!(b - a, hover / 0.5_f64.cos() - hover, epsilon = 1e-9);
    }

    #[test]
    fn level_and_still_inside_deadband() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let over = lander(500.0, 120.0);
        ctl.compute(&over, &[]);
        let cmd = ctl.compute(&over, &[]);
        assert_eq!((cmd.left, cmd.right), (0.0, 0.0));
        assert_eq!((cmd.left_gimbal, cmd.right_gimbal), (0.0, 0.0));
    }

    #[test]
    fn attitude_error_drives_symmetric_side_thrust() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let mut state = lander(500.0, 120.0);
        state.angle = -0.2;
        let cmd = ctl.compute(&state, &[]);
        assert!(cmd.left > 0.0);
        assert_eq!(cmd.left, cmd.right);
        assert_eq!(cmd.left_gimbal, -cmd.right_gimbal);
        assert!(cmd.right_gimbal > 0.0, "positive turn command to raise the angle");
        assert!(cmd.right_gimbal <= AutopilotConfig::default().max_gimbal);
    }

    #[test]
    fn approach_leans_toward_target() {
        let mut ctl = controller();
        ctl.set_landing_target(SITE);
        let state = lander(100.0, 120.0);
        let angle = ctl.attitude_target(&state, SITE.center_x - state.x(), 120.0);
        assert!(angle > 0.0 && angle <= AutopilotConfig::default().max_tilt);
    }

    #[test]
    fn descent_levels_out_near_ground() {
        let mut ctl = controller();
        ctl.session = Session::new(&ctl.config, Phase::Descend);
        let mut state = lander(500.0, 5.0);
        state.vel.x = 20.0;
        assert_eq!(ctl.attitude_target(&state, 0.0, 5.0), 0.0);
        let high = ctl.attitude_target(&state, 0.0, 100.0);
        let mid = ctl.attitude_target(&state, 0.0, 24.0);
        assert!(high < 0.0);
        assert!(mid.abs() < high.abs());
    }

    #[test]
    fn staged_descent_profile() {
        let cfg = AutopilotConfig::default();
        assert_eq!(descent_rate(&cfg, 200.0), 12.0);
        assert_eq!(descent_rate(&cfg, 30.0), 5.0);
        assert_eq!(descent_rate(&cfg, 10.0), 2.0);
        assert_eq!(descent_rate(&cfg, 3.0), 1.0);
        assert_eq!(descent_rate(&cfg, -1.0), 1.0);
    }

    #[test]
    fn level_ratio_window() {
        assert_eq!(level_ratio(50.0, 8.0, 40.0), 1.0);
        assert_eq!(level_ratio(24.0, 8.0, 40.0), 0.5);
        assert_eq!(level_ratio(7.9, 8.0, 40.0), 0.0);
    }
}
