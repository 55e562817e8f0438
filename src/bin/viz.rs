use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Points};

use lander_sim::config::MissionConfig;
use lander_sim::sim::{self, FlightRecord, Sample};

const SEED: u64 = 1;
const MAX_TIME: f64 = 300.0;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = MissionConfig::default();
    let record = match sim::fly(&config, SEED, MAX_TIME) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let app = FlightViz { record };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Lander Flight", options, Box::new(|_| Ok(Box::new(app))))
}

struct FlightViz {
    record: FlightRecord,
}

impl eframe::App for FlightViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let step = (self.record.samples.len() / 2000).max(1);
        let sampled: Vec<&Sample> = self.record.samples.iter().step_by(step).collect();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(format!("Seed {}", self.record.seed));
            let max_v = self
                .record
                .samples
                .iter()
                .map(|s| s.state.vel.norm())
                .fold(0.0_f64, f64::max);
            ui.label(format!(
                "Outcome: {}  |  Flight: {:.1} s  |  Max speed: {:.1}  |  Fuel used: {:.1}",
                self.record.outcome().label(),
                self.record.flight_time(),
                max_v,
                self.record.fuel_used(),
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                // Path over terrain; world y grows down, so plot -y.
                ui.vertical(|ui| {
                    ui.label("Trajectory over terrain");
                    let ground: PlotPoints = self
                        .record
                        .terrain
                        .iter()
                        .enumerate()
                        .map(|(x, h)| [x as f64, -h])
                        .collect();
                    let path: PlotPoints =
                        sampled.iter().map(|s| [s.state.x(), -s.state.y()]).collect();
                    let site = self.record.locked_site;
                    Plot::new("profile")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("x")
                        .data_aspect(1.0)
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Terrain", ground));
                            plot_ui.line(Line::new("Lander", path));
                            if let Some(site) = site {
                                let marks = vec![[site.x0, -site.y_mean], [site.x1, -site.y_mean]];
                                plot_ui.points(Points::new("Site", marks).radius(4.0));
                            }
                        });
                });

                // Velocity vs Time
                ui.vertical(|ui| {
                    ui.label("Velocity");
                    let vy: PlotPoints = sampled.iter().map(|s| [s.time, s.state.vy()]).collect();
                    let vx: PlotPoints = sampled.iter().map(|s| [s.time, s.state.vx()]).collect();
                    Plot::new("velocity")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("vy", vy));
                            plot_ui.line(Line::new("vx", vx));
                        });
                });
            });

            ui.horizontal(|ui| {
                // Attitude vs Time
                ui.vertical(|ui| {
                    ui.label("Attitude (deg)");
                    let points: PlotPoints = sampled
                        .iter()
                        .map(|s| [s.time, s.state.angle.to_degrees()])
                        .collect();
                    Plot::new("attitude")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Angle", points));
                        });
                });

                // Throttles vs Time
                ui.vertical(|ui| {
                    ui.label("Throttle");
                    let main: PlotPoints =
                        sampled.iter().map(|s| [s.time, s.command.main]).collect();
                    let side: PlotPoints =
                        sampled.iter().map(|s| [s.time, s.command.left]).collect();
                    Plot::new("throttle")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Main", main));
                            plot_ui.line(Line::new("Side", side));
                        });
                });
            });
        });
    }
}
