use std::io::{self, Write};
use std::path::Path;

use crate::sim::{EventKind, FlightRecord, Outcome};

/// Summary statistics computed from a flight record.
#[derive(Debug, Clone)]
pub struct FlightSummary {
    pub seed: u64,
    pub outcome: Outcome,
    pub flight_time: f64,
    pub touchdown_x: Option<f64>,
    /// Last airborne velocity before contact.
    pub touchdown_vx: Option<f64>,
    pub touchdown_vy: Option<f64>,
    pub touchdown_angle_deg: Option<f64>,
    pub max_speed: f64,
    pub fuel_used: f64,
    pub fuel_left: f64,
    pub site_center_x: Option<f64>,
    pub site_y: Option<f64>,
    /// Horizontal distance from touchdown to the locked site centre.
    pub miss_distance: Option<f64>,
    pub events: usize,
}

impl FlightSummary {
    pub fn from_record(record: &FlightRecord) -> Self {
        let touchdown = record.touchdown().and_then(|e| match e.kind {
            EventKind::Landed { vx, vy, angle } | EventKind::Crashed { vx, vy, angle } => {
                Some((e.state.x(), vx, vy, angle))
            }
            _ => None,
        });

        let max_speed = record
            .samples
            .iter()
            .map(|s| s.state.vel.norm())
            .fold(0.0_f64, f64::max);

        let site = record.locked_site;
        let miss_distance = match (touchdown, site) {
            (Some((x, ..)), Some(site)) => Some((x - site.center_x).abs()),
            _ => None,
        };

        FlightSummary {
            seed: record.seed,
            outcome: record.outcome(),
            flight_time: record.flight_time(),
            touchdown_x: touchdown.map(|t| t.0),
            touchdown_vx: touchdown.map(|t| t.1),
            touchdown_vy: touchdown.map(|t| t.2),
            touchdown_angle_deg: touchdown.map(|t| t.3.to_degrees()),
            max_speed,
            fuel_used: record.fuel_used(),
            fuel_left: record.final_state().map_or(0.0, |s| s.total_fuel()),
            site_center_x: site.map(|s| s.center_x),
            site_y: site.map(|s| s.y_mean),
            miss_distance,
            events: record.events.len(),
        }
    }
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "null".to_string(), |v| format!("{v:.3}"))
}

/// Write flight summary as JSON to a writer.
pub fn write_summary<W: Write>(writer: &mut W, summary: &FlightSummary) -> io::Result<()> {
    writeln!(writer, "{{")?;
    writeln!(writer, "  \"seed\": {},", summary.seed)?;
    writeln!(writer, "  \"outcome\": \"{}\",", summary.outcome.label())?;
    writeln!(writer, "  \"flight_time_s\": {:.2},", summary.flight_time)?;
    writeln!(writer, "  \"touchdown\": {{")?;
    writeln!(writer, "    \"x\": {},", opt(summary.touchdown_x))?;
    writeln!(writer, "    \"vx\": {},", opt(summary.touchdown_vx))?;
    writeln!(writer, "    \"vy\": {},", opt(summary.touchdown_vy))?;
    writeln!(writer, "    \"angle_deg\": {},", opt(summary.touchdown_angle_deg))?;
    writeln!(writer, "    \"miss_distance\": {}", opt(summary.miss_distance))?;
    writeln!(writer, "  }},")?;
    writeln!(writer, "  \"site\": {{")?;
    writeln!(writer, "    \"center_x\": {},", opt(summary.site_center_x))?;
    writeln!(writer, "    \"y\": {}", opt(summary.site_y))?;
    writeln!(writer, "  }},")?;
    writeln!(writer, "  \"max_speed\": {:.3},", summary.max_speed)?;
    writeln!(writer, "  \"fuel_used\": {:.3},", summary.fuel_used)?;
    writeln!(writer, "  \"fuel_left\": {:.3},", summary.fuel_left)?;
    writeln!(writer, "  \"events\": {}", summary.events)?;
    writeln!(writer, "}}")?;
    Ok(())
}

/// Write flight summary JSON to a file.
pub fn write_summary_file<P: AsRef<Path>>(path: P, summary: &FlightSummary) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::{ControlCommand, LanderState};
    use crate::sensing::LandingSite;
    use crate::sim::{Sample, SimEvent};

    fn landed_record() -> FlightRecord {
        let start = LanderState::new(300.0, 50.0, 500.0, vec![100.0]);
        let mut end = LanderState::new(306.0, 580.0, 420.0, vec![60.0]);
        end.landed = true;
        let sample = |time: f64, state: LanderState| Sample {
            time,
            state,
            command: ControlCommand::default(),
            phase: "descend",
        };
        FlightRecord {
            seed: 3,
            samples: vec![sample(0.0, start), sample(42.0, end.clone())],
            events: vec![SimEvent {
                time: 42.0,
                kind: EventKind::Landed { vx: 0.5, vy: -3.0, angle: 0.0 },
                state: end,
            }],
            locked_site: Some(LandingSite { center_x: 300.0, y_mean: 600.0, ..Default::default() }),
            terrain: vec![600.0; 10],
        }
    }

    #[test]
    fn summary_from_landed_record() {
        let s = FlightSummary::from_record(&landed_record());
        assert_eq!(s.outcome, Outcome::Landed);
        assert_eq!(s.flight_time, 42.0);
        assert_eq!(s.touchdown_vy, Some(-3.0));
        assert_eq!(s.miss_distance, Some(6.0));
        assert_eq!(s.fuel_used, 120.0);
        assert_eq!(s.fuel_left, 480.0);
    }

    #[test]
    fn json_output_is_valid() {
        let summary = FlightSummary::from_record(&landed_record());
        let mut buf = Vec::new();
        write_summary(&mut buf, &summary).unwrap();
        let json = String::from_utf8(buf).unwrap();
        assert!(json.contains("\"outcome\": \"landed\""));
        assert!(json.contains("\"miss_distance\": 6.000"));
        assert_eq!(json.matches('{').count(), json.matches('}').count());
    }

    #[test]
    fn missing_touchdown_writes_null() {
        let mut record = landed_record();
        record.events.clear();
        record.locked_site = None;
        let summary = FlightSummary::from_record(&record);
        let mut buf = Vec::new();
        write_summary(&mut buf, &summary).unwrap();
        let json = String::from_utf8(buf).unwrap();
        assert!(json.contains("\"x\": null"));
        assert!(json.contains("\"center_x\": null"));
    }
}
