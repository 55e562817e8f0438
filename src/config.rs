use crate::error::{in_range, non_negative, positive, ConfigError};
use crate::sensing::{DetectorConfig, RadarConfig};
use crate::terrain::TerrainConfig;

// ---------------------------------------------------------------------------
// Engineering constants shared by physics and autopilot
// ---------------------------------------------------------------------------

/// Fixed physical constants for one simulation run.
///
/// World frame is screen-style: x grows to the right, y grows downward.
/// Vertical velocity is reported positive-up, so rising lowers `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConstants {
    pub gravity: f64,           // world units/s^2
    pub dt: f64,                // fixed tick, s
    pub max_main_thrust: f64,   // N
    pub max_side_thrust: f64,   // N per side thruster
    pub mass: f64,              // kg (constant, propellant mass ignored)
    pub body_width: f64,        // lever arm = width / 2
    pub body_height: f64,
    pub drag_x: f64,            // linear drag coefficient, 1/s
    pub drag_y: f64,
    pub angular_damping: f64,   // multiplicative factor applied per tick
    pub ground_offset: f64,     // body centre height above terrain at contact
    pub safe_speed: f64,        // per-axis touchdown limit
    pub max_landing_angle: f64, // rad
    pub main_tank_capacity: f64,
    pub fuel_transfer_rate: f64, // per tick
    pub fuel_burn_rate: f64,     // fuel per newton-second
}

impl SimConstants {
    /// Rectangular-body moment of inertia about the centre of mass.
    pub fn inertia(&self) -> f64 {
        self.mass * (self.body_width.powi(2) + self.body_height.powi(2)) / 12.0
    }

    /// Main-engine throttle that balances gravity when upright.
    pub fn hover_throttle(&self) -> f64 {
        self.mass * self.gravity / self.max_main_thrust
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("gravity", self.gravity)?;
        positive("dt", self.dt)?;
        positive("max_main_thrust", self.max_main_thrust)?;
        positive("max_side_thrust", self.max_side_thrust)?;
        positive("mass", self.mass)?;
        positive("body_width", self.body_width)?;
        positive("body_height", self.body_height)?;
        non_negative("drag_x", self.drag_x)?;
        non_negative("drag_y", self.drag_y)?;
        in_range("angular_damping", self.angular_damping, 0.0, 1.0)?;
        non_negative("ground_offset", self.ground_offset)?;
        positive("safe_speed", self.safe_speed)?;
        in_range(
            "max_landing_angle",
            self.max_landing_angle,
            0.0,
            std::f64::consts::FRAC_PI_2,
        )?;
        non_negative("main_tank_capacity", self.main_tank_capacity)?;
        non_negative("fuel_transfer_rate", self.fuel_transfer_rate)?;
        non_negative("fuel_burn_rate", self.fuel_burn_rate)?;
        Ok(())
    }
}

impl Default for SimConstants {
    fn default() -> Self {
        Self {
            gravity: 3.711, // Mars surface
            dt: 1.0 / 25.0,
            max_main_thrust: 100.0,
            max_side_thrust: 20.0,
            mass: 10.0,
            body_width: 20.0,
            body_height: 16.0,
            drag_x: 0.35,
            drag_y: 0.10,
            angular_damping: 0.90,
            ground_offset: 20.0,
            safe_speed: 12.0,
            max_landing_angle: 10.0_f64.to_radians(),
            main_tank_capacity: 100.0,
            fuel_transfer_rate: 5.0,
            fuel_burn_rate: 0.05,
        }
    }
}

// ---------------------------------------------------------------------------
// Autopilot tuning
// ---------------------------------------------------------------------------

/// Tolerances, gains and profile breakpoints of the landing autopilot.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotConfig {
    /// Height above terrain the autopilot aims its target at.
    pub target_ground_offset: f64,
    /// Assumed ground depth below the lander when radar sees nothing.
    pub blind_ground_depth: f64,
    pub hover_altitude: f64,

    // Phase transitions
    pub x_tolerance: f64,
    pub hover_entry_x: f64,
    pub hover_entry_vx: f64,
    pub stable_vx: f64,
    pub stable_angular_vel: f64,
    pub stable_time: f64,
    pub hover_timeout: f64,
    pub timeout_angular_vel: f64,
    pub drift_abort_x: f64,

    // Horizontal loop (velocity target -> attitude target)
    pub approach_gain: f64,
    pub max_approach_speed: f64,
    pub vx_kp: f64,
    pub vx_ki: f64,
    pub vx_integral_limit: f64,
    pub max_tilt: f64,
    pub level_start_alt: f64,
    pub level_end_alt: f64,

    // Attitude loop
    pub angle_deadband: f64,
    pub fine_angle_deadband: f64,
    pub fine_deadband_alt: f64,
    pub angular_vel_deadband: f64,
    pub attitude_kp: f64,
    pub attitude_kd: f64,
    pub max_gimbal: f64,
    pub low_alt: f64,
    pub low_alt_kp: f64,
    pub low_alt_kd: f64,
    pub low_alt_max_gimbal: f64,

    // Vertical loop
    /// (altitude below which the rate applies, descent rate), highest first.
    pub descent_profile: Vec<(f64, f64)>,
    pub cruise_descent_rate: f64,
    pub hover_alt_gain: f64,
    pub max_climb_rate: f64,
    pub vy_kp: f64,
    pub vy_ki: f64,
    pub vy_kd: f64,
    pub vy_integral_limit: f64,
    pub min_tilt_cos: f64,
    pub brake_alt: f64,
    pub brake_descent_rate: f64,
}

impl AutopilotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("x_tolerance", self.x_tolerance)?;
        positive("stable_time", self.stable_time)?;
        positive("hover_timeout", self.hover_timeout)?;
        positive("max_tilt", self.max_tilt)?;
        positive("max_approach_speed", self.max_approach_speed)?;
        in_range("min_tilt_cos", self.min_tilt_cos, 0.01, 1.0)?;
        if self.level_start_alt <= self.level_end_alt {
            return Err(ConfigError::OutOfRange {
                name: "level_start_alt",
                value: self.level_start_alt,
                min: self.level_end_alt,
                max: f64::INFINITY,
            });
        }
        self.validate_descent_profile()
    }

    /// Breakpoints are matched highest first, so they must strictly decrease.
    fn validate_descent_profile(&self) -> Result<(), ConfigError> {
        for &(below, rate) in &self.descent_profile {
            positive("descent_profile altitude", below)?;
            positive("descent_profile rate", rate)?;
        }
        match self.descent_profile.windows(2).position(|w| w[1].0 >= w[0].0) {
            Some(i) => Err(ConfigError::UnsortedProfile { index: i + 1 }),
            None => Ok(()),
        }
    }
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        let x_tolerance = 12.0;
        Self {
            target_ground_offset: 12.0,
            blind_ground_depth: 200.0,
            hover_altitude: 120.0,

            x_tolerance,
            hover_entry_x: 2.0 * x_tolerance,
            hover_entry_vx: 15.0,
            stable_vx: 8.0,
            stable_angular_vel: 0.3,
            stable_time: 1.0,
            hover_timeout: 6.0,
            timeout_angular_vel: 0.5,
            drift_abort_x: 5.0 * x_tolerance,

            approach_gain: 0.45,
            max_approach_speed: 25.0,
            vx_kp: 0.12,
            vx_ki: 0.03,
            vx_integral_limit: 12.0,
            max_tilt: 0.6,
            level_start_alt: 40.0,
            level_end_alt: 8.0,

            angle_deadband: 0.5_f64.to_radians(),
            fine_angle_deadband: 0.1_f64.to_radians(),
            fine_deadband_alt: 15.0,
            angular_vel_deadband: 0.1,
            attitude_kp: 4.5,
            attitude_kd: 8.0,
            max_gimbal: 0.6,
            low_alt: 20.0,
            low_alt_kp: 9.0,
            low_alt_kd: 14.0,
            low_alt_max_gimbal: 1.0,

            descent_profile: vec![(40.0, 5.0), (12.0, 2.0), (4.0, 1.0)],
            cruise_descent_rate: 12.0,
            hover_alt_gain: 0.4,
            max_climb_rate: 10.0,
            vy_kp: 0.22,
            vy_ki: 0.005,
            vy_kd: 0.16,
            vy_integral_limit: 8.0,
            min_tilt_cos: 0.5,
            brake_alt: 70.0,
            brake_descent_rate: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Mission configuration
// ---------------------------------------------------------------------------

/// Everything needed to (re)start a mission.
#[derive(Debug, Clone)]
pub struct MissionConfig {
    pub constants: SimConstants,
    pub autopilot: AutopilotConfig,
    pub radar: RadarConfig,
    pub detector: DetectorConfig,
    pub terrain: TerrainConfig,
    pub start_y: f64,
    pub start_margin: f64,  // keep the spawn x this far from either edge
    pub main_fuel: f64,
    pub aux_tanks: Vec<f64>,
    pub wind_step: f64,
    pub gimbal_slew_rate: f64, // rad/s, manual pilot
    pub max_manual_gimbal: f64,
    pub time_scale: f64,
    pub max_ticks_per_frame: u32,
}

impl MissionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.constants.validate()?;
        self.autopilot.validate()?;
        self.radar.validate()?;
        self.detector.validate()?;
        non_negative("start_margin", self.start_margin)?;
        non_negative("main_fuel", self.main_fuel)?;
        for &tank in &self.aux_tanks {
            non_negative("aux_tanks", tank)?;
        }
        positive("gimbal_slew_rate", self.gimbal_slew_rate)?;
        positive("max_manual_gimbal", self.max_manual_gimbal)?;
        positive("time_scale", self.time_scale)?;
        if self.max_ticks_per_frame == 0 {
            return Err(ConfigError::NotPositive {
                name: "max_ticks_per_frame",
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        let constants = SimConstants::default();
        let detector = DetectorConfig::for_landing_angle(constants.max_landing_angle);
        Self {
            constants,
            autopilot: AutopilotConfig::default(),
            radar: RadarConfig::default(),
            detector,
            terrain: TerrainConfig::default(),
            start_y: 50.0,
            start_margin: 100.0,
            main_fuel: 500.0,
            aux_tanks: vec![100.0, 100.0],
            wind_step: 5.0,
            gimbal_slew_rate: 1.5,
            max_manual_gimbal: 0.8,
            time_scale: 1.0,
            max_ticks_per_frame: 8,
        }
    }
}
