use log::{debug, info};
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::event::{default_detectors, EventDetector, EventKind, SimEvent, Snapshot};
use crate::config::MissionConfig;
use crate::dynamics::{LanderState, PhysicsEngine};
use crate::error::Result;
use crate::gnc::{Controller, LandingController, ManualKeys, ManualPilot, Phase};
use crate::sensing::{detect, pick_best, scan, LandingSite, RayHit};
use crate::terrain::{generate, Terrain};

// ---------------------------------------------------------------------------
// Mission orchestration
// ---------------------------------------------------------------------------

/// Who flies the lander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PilotMode {
    Auto,
    Manual,
}

impl PilotMode {
    pub fn label(&self) -> &'static str {
        match self {
            PilotMode::Auto => "auto",
            PilotMode::Manual => "manual",
        }
    }
}

/// Where a mission's terrain comes from on restart.
#[derive(Debug, Clone)]
enum TerrainSource {
    Generated,
    Fixed(Terrain),
}

/// One landing attempt: terrain, lander, pilots and the fixed-step clock.
pub struct Mission {
    config: MissionConfig,
    source: TerrainSource,
    seed: u64,
    terrain: Terrain,
    physics: PhysicsEngine,
    autopilot: LandingController,
    manual: ManualPilot,
    mode: PilotMode,
    paused: bool,
    wind: f64,
    time: f64,
    accumulator: f64,
    hits: Vec<RayHit>,
    sites: Vec<LandingSite>,
    detectors: Vec<Box<dyn EventDetector>>,
    events: Vec<SimEvent>,
    last: Snapshot,
}

impl Mission {
    /// Mission over procedurally generated terrain.
    pub fn new(config: MissionConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let terrain = generate(&config.terrain, seed)?;
        Ok(Self::build(config, TerrainSource::Generated, terrain, seed))
    }

    /// Mission over a fixed heightfield, kept across restarts.
    pub fn with_terrain(config: MissionConfig, terrain: Terrain, seed: u64) -> Result<Self> {
        config.validate()?;
        let source = TerrainSource::Fixed(terrain.clone());
        Ok(Self::build(config, source, terrain, seed))
    }

    fn build(config: MissionConfig, source: TerrainSource, terrain: Terrain, seed: u64) -> Self {
        let c = &config;
        let physics = PhysicsEngine::new(c.constants.clone());
        let autopilot =
            LandingController::new(c.constants.clone(), c.autopilot.clone(), c.detector.clone());
        let manual = ManualPilot::new(c.gimbal_slew_rate, c.max_manual_gimbal, c.constants.dt);
        let state = physics.state();
        let last = Snapshot {
            time: 0.0,
            state,
            phase: Phase::Approach.label(),
            locked: None,
            wind: 0.0,
        };

        let mut mission = Self {
            config,
            source,
            seed,
            terrain,
            physics,
            autopilot,
            manual,
            mode: PilotMode::Auto,
            paused: false,
            wind: 0.0,
            time: 0.0,
            accumulator: 0.0,
            hits: Vec::new(),
            sites: Vec::new(),
            detectors: default_detectors(),
            events: Vec::new(),
            last,
        };
        mission.reset_flight();
        mission
    }

    /// Start over with `seed`: new terrain (unless fixed), fresh lander at a
    /// seeded spawn point, autopilot reset and unlocked, calm wind.
    pub fn restart(&mut self, seed: u64) -> Result<()> {
        self.terrain = match &self.source {
            TerrainSource::Generated => generate(&self.config.terrain, seed)?,
            TerrainSource::Fixed(terrain) => terrain.clone(),
        };
        self.seed = seed;
        self.reset_flight();
        Ok(())
    }

    fn reset_flight(&mut self) {
        let x = spawn_x(self.seed, self.terrain.width(), self.config.start_margin);
        let y = self.config.start_y;
        self.physics.init(x, y, self.config.main_fuel, &self.config.aux_tanks);
        self.wind = 0.0;
        self.physics.set_wind(Vector2::zeros());
        self.autopilot.reset();
        self.manual.reset();
        self.time = 0.0;
        self.accumulator = 0.0;
        self.detectors = default_detectors();
        self.events.clear();
        self.last = self.snapshot();
        self.rescan();

        info!("mission start: seed {}, lander at ({x:.1}, {y:.1})", self.seed);
        self.events.push(SimEvent {
            time: 0.0,
            kind: EventKind::MissionStart { seed: self.seed },
            state: self.physics.state(),
        });
    }

    /// Scan, lock a site if none is held, and locate landing candidates.
    fn rescan(&mut self) {
        let state = self.physics.state();
        self.hits = scan(&self.terrain, state.pos, state.angle, &self.config.radar);
        self.sites = detect(&self.hits, state.x(), &self.config.detector);
        if !self.autopilot.has_landing_target() {
            if let Some(best) = pick_best(&self.sites) {
                info!(
                    "landing site locked: x {:.1}..{:.1}, y {:.1}",
                    best.x0, best.x1, best.y_mean
                );
                self.autopilot.set_landing_target(best);
            }
        }
    }

    /// One fixed tick. While paused only the radar picture is refreshed.
    pub fn tick(&mut self) {
        self.rescan();
        if !self.paused {
            let state = self.physics.state();
            self.physics.set_wind(Vector2::new(self.wind, 0.0));
            let command = match self.mode {
                PilotMode::Auto => self.autopilot.control(&state, &self.hits),
                PilotMode::Manual => self.manual.control(&state, &self.hits),
            };
            let ground = self.terrain.height_at(state.x());
            self.physics.update(&command, ground);
            if !state.is_terminal() {
                self.time += self.config.constants.dt;
            }
        }
        self.observe();
    }

    /// Run as many ticks as `frame_seconds` of wall time covers, scaled by
    /// the time scale and capped per frame. Returns the ticks run.
    pub fn advance(&mut self, frame_seconds: f64) -> u32 {
        if self.paused {
            self.tick();
            return 0;
        }
        let dt = self.config.constants.dt;
        self.accumulator += frame_seconds.max(0.0) * self.config.time_scale;

        let mut ticks = 0;
        while self.accumulator >= dt && ticks < self.config.max_ticks_per_frame {
            self.tick();
            self.accumulator -= dt;
            ticks += 1;
        }
        if self.accumulator >= dt {
            debug!("frame budget hit, dropping {:.3} s of backlog", self.accumulator);
            self.accumulator = 0.0;
        }
        ticks
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            state: self.physics.state(),
            phase: self.autopilot.phase().label(),
            locked: self.autopilot.landing_target().copied(),
            wind: self.wind,
        }
    }

    fn observe(&mut self) {
        let current = self.snapshot();
        for detector in self.detectors.iter_mut() {
            if let Some(kind) = detector.check(&self.last, &current) {
                self.events.push(SimEvent {
                    time: current.time,
                    kind,
                    state: current.state.clone(),
                });
            }
        }
        self.last = current;
    }

    // --- Operator controls ---

    pub fn mode(&self) -> PilotMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PilotMode) {
        if mode != self.mode {
            info!("pilot mode: {}", mode.label());
        }
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(match self.mode {
            PilotMode::Auto => PilotMode::Manual,
            PilotMode::Manual => PilotMode::Auto,
        });
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn wind(&self) -> f64 {
        self.wind
    }

    /// Constant horizontal wind force, applied from the next unpaused tick.
    pub fn set_wind(&mut self, wind: f64) {
        if wind != self.wind {
            info!("wind changed: {wind:.1}");
        }
        self.wind = wind;
    }

    /// Step the wind by one configured increment in the sign of `direction`.
    pub fn adjust_wind(&mut self, direction: f64) {
        let step = self.config.wind_step.copysign(direction);
        self.set_wind(self.wind + step);
    }

    pub fn set_manual_keys(&mut self, keys: ManualKeys) {
        self.manual.set_keys(keys);
    }

    // --- Read-only views ---

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn state(&self) -> LanderState {
        self.physics.state()
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn hits(&self) -> &[RayHit] {
        &self.hits
    }

    /// Candidate sites from the latest scan, best first.
    pub fn sites(&self) -> &[LandingSite] {
        &self.sites
    }

    pub fn locked_site(&self) -> Option<&LandingSite> {
        self.autopilot.landing_target()
    }

    pub fn phase(&self) -> Phase {
        self.autopilot.phase()
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn is_over(&self) -> bool {
        self.physics.state().is_terminal()
    }
}

/// Spawn column: uniformly within `margin` of either edge, or mid-terrain
/// when the terrain is too narrow for the margins.
fn spawn_x(seed: u64, width: usize, margin: f64) -> f64 {
    let span = width as f64 - 2.0 * margin;
    if span <= 0.0 {
        return 0.5 * width as f64;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    margin + rng.gen_range(0.0..span)
}
