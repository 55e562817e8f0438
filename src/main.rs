use clap::Parser;
use log::error;

use lander_sim::io::{csv, json, FlightSummary};
use lander_sim::sim::{self, EventKind, FlightRecord, Mission, PilotMode};
use lander_sim::MissionConfig;

/// Fly one headless landing and report how it went.
#[derive(Parser, Debug)]
#[command(author, version, about = "2D lander flight with radar site detection and autopilot")]
struct Args {
    /// Terrain and spawn seed
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Stop the flight after this much simulated time, s
    #[arg(short = 't', long, default_value_t = 300.0)]
    max_time: f64,

    /// Fly in manual mode with no keys held (free fall)
    #[arg(long)]
    manual: bool,

    /// Constant horizontal wind force
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    wind: f64,

    /// Write the per-tick trajectory as CSV
    #[arg(long)]
    csv: Option<String>,

    /// Write the flight summary as JSON
    #[arg(long)]
    json: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> lander_sim::Result<()> {
    let config = MissionConfig::default();
    let mut mission = Mission::new(config.clone(), args.seed)?;
    if args.manual {
        mission.set_mode(PilotMode::Manual);
    }
    mission.set_wind(args.wind);

    let record = sim::fly_with(&mut mission, args.max_time);
    let summary = FlightSummary::from_record(&record);

    print_report(&config, &record, &summary, mission.mode());

    if let Some(path) = &args.csv {
        csv::write_trajectory_file(path, &record.samples)?;
        println!("  Trajectory written to {path}");
    }
    if let Some(path) = &args.json {
        json::write_summary_file(path, &summary)?;
        println!("  Summary written to {path}");
    }
    println!();
    Ok(())
}

fn print_report(
    config: &MissionConfig,
    record: &FlightRecord,
    summary: &FlightSummary,
    mode: PilotMode,
) {
    let c = &config.constants;
    let rule = "  ──────────────────────────────────────────────────────────────────";

    println!();
    println!("====================================================================");
    println!("  LANDER FLIGHT: seed {} ({} pilot)", record.seed, mode.label());
    println!("====================================================================");
    println!();
    println!("  Vehicle");
    println!("{rule}");
    println!(
        "  Mass:          {:>8.1}       Gravity:      {:>8.3}",
        c.mass, c.gravity
    );
    println!(
        "  Main thrust:   {:>8.1}       Side thrust:  {:>8.1}",
        c.max_main_thrust, c.max_side_thrust
    );
    println!(
        "  Hover thrott.: {:>8.3}       Fuel:         {:>8.1}",
        c.hover_throttle(),
        config.main_fuel + config.aux_tanks.iter().sum::<f64>()
    );
    println!();

    println!("  Flight Events");
    println!("{rule}");
    for e in &record.events {
        let detail = match &e.kind {
            EventKind::MissionStart { seed } => format!("seed {seed}"),
            EventKind::SiteLocked { center_x, y } => format!("x={center_x:.1} y={y:.1}"),
            EventKind::PhaseChange { from, to } => format!("{from} -> {to}"),
            EventKind::FuelExhausted => String::new(),
            EventKind::WindChanged { wind } => format!("{wind:.1}"),
            EventKind::Landed { vx, vy, angle } | EventKind::Crashed { vx, vy, angle } => {
                format!("vx={vx:.2} vy={vy:.2} angle={:.1} deg", angle.to_degrees())
            }
        };
        println!(
            "  {:<15} t={:>6.2}s   x={:>7.1}   y={:>6.1}   {}",
            e.kind.label().to_uppercase(),
            e.time,
            e.state.x(),
            e.state.y(),
            detail
        );
    }
    println!();

    println!("  Summary");
    println!("{rule}");
    println!("  Outcome:       {:>8}", summary.outcome.label());
    println!("  Flight time:   {:>8.2} s", summary.flight_time);
    println!("  Max speed:     {:>8.2}", summary.max_speed);
    println!(
        "  Fuel used:     {:>8.1}       Fuel left:    {:>8.1}",
        summary.fuel_used, summary.fuel_left
    );
    if let Some(miss) = summary.miss_distance {
        println!("  Miss distance: {miss:>8.2}");
    }
    println!();

    println!("  Telemetry (every 5 s)");
    println!("{rule}");
    println!(
        "  {:>7}  {:>8}  {:>8}  {:>7}  {:>7}  {:>7}  {:>6}  {:>8}",
        "t(s)", "x", "y", "vx", "vy", "ang(d)", "main", "phase"
    );
    let every = (5.0 / c.dt).round().max(1.0) as usize;
    let last = record.samples.len().saturating_sub(1);
    for (i, s) in record.samples.iter().enumerate() {
        if i % every != 0 && i != last {
            continue;
        }
        println!(
            "  {:>7.2}  {:>8.1}  {:>8.1}  {:>7.2}  {:>7.2}  {:>7.2}  {:>6.2}  {:>8}",
            s.time,
            s.state.x(),
            s.state.y(),
            s.state.vx(),
            s.state.vy(),
            s.state.angle.to_degrees(),
            s.command.main,
            s.phase
        );
    }
    println!();
    println!("  Simulation: {} ticks, dt={:.3} s", record.samples.len(), c.dt);
    println!("====================================================================");
}
