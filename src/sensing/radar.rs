use nalgebra::{Rotation2, Vector2};

use crate::error::{positive, ConfigError};
use crate::terrain::Terrain;

// ---------------------------------------------------------------------------
// Radar ray-caster
// ---------------------------------------------------------------------------

const PARALLEL_EPS: f64 = 1e-8;

/// Fan geometry of the downward-looking radar.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarConfig {
    pub ray_count: usize,
    pub fov: f64,        // rad, full fan width
    pub max_range: f64,
    pub max_x_span: f64, // only segments within this x distance are tested
}

impl RadarConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ray_count == 0 {
            return Err(ConfigError::NoRays);
        }
        positive("fov", self.fov)?;
        positive("max_range", self.max_range)?;
        positive("max_x_span", self.max_x_span)?;
        Ok(())
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            ray_count: 157,
            fov: 2.0,
            max_range: 1200.0,
            max_x_span: 1200.0,
        }
    }
}

/// Result of one radar ray.
///
/// On a miss `point` sits at `origin + dir * max_range` and `t == max_range`;
/// it is only meant for drawing, not as a ground estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub origin: Vector2<f64>,
    pub dir: Vector2<f64>, // unit, world frame
    pub hit: bool,
    pub point: Vector2<f64>,
    pub t: f64,
    pub segment: Option<usize>,
}

/// Cast the radar fan from `origin` and return one result per ray, in ray
/// order. Ray `i` points `-fov/2 + i * fov/(n-1)` from body "down", rotated
/// into the world by `ship_angle`.
pub fn scan(
    terrain: &Terrain,
    origin: Vector2<f64>,
    ship_angle: f64,
    config: &RadarConfig,
) -> Vec<RayHit> {
    let n = config.ray_count;
    let down = Rotation2::new(ship_angle) * Vector2::new(0.0, 1.0);
    let segments = segment_window(terrain, origin.x, config.max_x_span);

    (0..n)
        .map(|i| {
            let frac = if n == 1 { 0.5 } else { i as f64 / (n - 1) as f64 };
            let offset = -0.5 * config.fov + frac * config.fov;
            let dir = normalize_or_zero(Rotation2::new(offset) * down);
            cast(terrain, segments.clone(), origin, dir, config.max_range)
        })
        .collect()
}

/// Segment indices whose left column lies in `[x - span, x + span]`.
fn segment_window(terrain: &Terrain, x: f64, span: f64) -> std::ops::Range<usize> {
    let last = (terrain.segment_count() - 1) as f64;
    let lo = (x - span).floor().max(0.0);
    let hi = (x + span).ceil().min(last);
    if !(lo <= hi) {
        return 0..0;
    }
    lo as usize..hi as usize + 1
}

fn cast(
    terrain: &Terrain,
    segments: std::ops::Range<usize>,
    origin: Vector2<f64>,
    dir: Vector2<f64>,
    max_range: f64,
) -> RayHit {
    let mut best = RayHit {
        origin,
        dir,
        hit: false,
        point: origin + dir * max_range,
        t: max_range,
        segment: None,
    };

    for i in segments {
        let Some(((ax, ay), (bx, by))) = terrain.segment(i) else {
            continue;
        };
        let a = Vector2::new(ax, ay);
        let b = Vector2::new(bx, by);
        let Some((t, _)) = ray_segment_intersect(origin, dir, a, b) else {
            continue;
        };
        if t > max_range {
            continue;
        }
        if !best.hit || t < best.t {
            best.hit = true;
            best.t = t;
            best.point = origin + dir * t;
            best.segment = Some(i);
        }
    }
    best
}

/// Intersect the ray `o + t*d` with segment `a..b`.
///
/// Returns `(t, u)` with `t >= 0` along the ray and `u` in `[0, 1]` along the
/// segment. Rays parallel to the segment never hit.
pub fn ray_segment_intersect(
    o: Vector2<f64>,
    d: Vector2<f64>,
    a: Vector2<f64>,
    b: Vector2<f64>,
) -> Option<(f64, f64)> {
    let v = b - a;
    let den = d.perp(&v);
    if den.abs() < PARALLEL_EPS {
        return None;
    }
    let w = o - a;
    let t = v.perp(&w) / den;
    let u = d.perp(&w) / den;
    (t >= 0.0 && (0.0..=1.0).contains(&u)).then_some((t, u))
}

fn normalize_or_zero(v: Vector2<f64>) -> Vector2<f64> {
    v.try_normalize(1e-12).unwrap_or_else(Vector2::zeros)
}
