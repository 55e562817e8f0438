use log::debug;
use nalgebra::Vector2;

use super::radar::RayHit;
use crate::error::{non_negative, positive, ConfigError};

// ---------------------------------------------------------------------------
// Landing-site detection from radar returns
// ---------------------------------------------------------------------------

const MIN_DX: f64 = 1e-5;

/// Limits a run of radar points must respect to count as landable.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub max_gap_x: f64,  // largest x gap between consecutive points
    pub min_len_x: f64,  // shortest accepted run
    pub max_slope: f64,  // |dy/dx| between consecutive points
    pub max_band_y: f64, // max - min height within a run
}

impl DetectorConfig {
    /// Defaults with the slope limit matched to a maximum landing angle.
    pub fn for_landing_angle(angle: f64) -> Self {
        let base = Self::default();
        let max_slope = angle.tan().abs();
        Self {
            max_slope,
            max_band_y: base.max_band_y.max(max_slope * base.min_len_x),
            ..base
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("max_gap_x", self.max_gap_x)?;
        non_negative("min_len_x", self.min_len_x)?;
        non_negative("max_slope", self.max_slope)?;
        non_negative("max_band_y", self.max_band_y)?;
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_gap_x: 10.0,
            min_len_x: 60.0,
            max_slope: 0.02,
            max_band_y: 2.0,
        }
    }
}

/// A flat run of terrain judged landable. Higher score is better.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LandingSite {
    pub x0: f64,
    pub x1: f64,
    pub center_x: f64,
    pub y_mean: f64,
    pub slope: f64,
    pub score: f64,
}

impl LandingSite {
    pub fn length(&self) -> f64 {
        self.x1 - self.x0
    }
}

/// Group radar hit points into flat runs and score them, best first.
///
/// Output depends only on `hits`, `rover_x` and `config`; equal inputs give
/// identical output.
pub fn detect(hits: &[RayHit], rover_x: f64, config: &DetectorConfig) -> Vec<LandingSite> {
    let mut points: Vec<Vector2<f64>> = hits.iter().filter(|h| h.hit).map(|h| h.point).collect();
    if points.len() < 2 {
        return Vec::new();
    }
    points.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut sites = Vec::new();
    let mut start = 0;
    while start + 1 < points.len() {
        let end = run_end(&points, start, config);
        if let Some(site) = score_run(&points[start..=end], rover_x, config) {
            sites.push(site);
        }
        start = end + 1;
    }

    // Stable sort keeps scan order among equal scores.
    sites.sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!("detector: {} points -> {} candidate sites", points.len(), sites.len());
    sites
}

/// Highest-scoring site of a list already sorted by [`detect`].
pub fn pick_best(sites: &[LandingSite]) -> Option<LandingSite> {
    sites.first().copied()
}

/// Index of the last point of the run that starts at `start`.
fn run_end(points: &[Vector2<f64>], start: usize, config: &DetectorConfig) -> usize {
    let mut end = start;
    let mut y_min = points[start].y;
    let mut y_max = points[start].y;

    while let Some(next) = points.get(end + 1) {
        let prev = points[end];
        let dx = next.x - prev.x;
        if dx > MIN_DX {
            if dx > config.max_gap_x {
                break;
            }
            if ((next.y - prev.y) / dx).abs() > config.max_slope {
                break;
            }
        }
        let lo = y_min.min(next.y);
        let hi = y_max.max(next.y);
        if hi - lo > config.max_band_y {
            break;
        }
        y_min = lo;
        y_max = hi;
        end += 1;
    }
    end
}

fn score_run(run: &[Vector2<f64>], rover_x: f64, config: &DetectorConfig) -> Option<LandingSite> {
    let first = run.first()?;
    let last = run.last()?;
    let length = last.x - first.x;
    if length < config.min_len_x {
        return None;
    }

    let center_x = 0.5 * (first.x + last.x);
    let y_mean = run.iter().map(|p| p.y).sum::<f64>() / run.len() as f64;
    let slope = (last.y - first.y) / length.max(MIN_DX);
    let score = length - 0.25 * (center_x - rover_x).abs() - 100.0 * slope.abs();

    Some(LandingSite {
        x0: first.x,
        x1: last.x,
        center_x,
        y_mean,
        slope,
        score,
    })
}
