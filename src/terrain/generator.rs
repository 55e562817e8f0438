use log::{debug, warn};
use noise::{Fbm, MultiFractal, NoiseFn, OpenSimplex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Terrain;
use crate::error::TerrainError;

// ---------------------------------------------------------------------------
// Procedural terrain: fractal relief with blended flat landing zones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainConfig {
    pub width: usize,
    pub world_height: f64,
    /// Mean ground level as a fraction of world height (from the top).
    pub base_level: f64,
    pub mountain_scale: f64,
    pub pebble_scale: f64,
    pub pebble_frequency: f64, // relative to the relief frequency
    pub min_height: f64,
    pub bottom_margin: f64,
    pub octaves: usize,
    pub lacunarity: f64,
    pub gain: f64,
    pub frequency: f64,
    pub max_zones: usize,
    pub zone_margin: usize, // minimum distance of a zone centre from either edge
    pub zone_width: usize,
    pub blend_width: usize,
    pub light_smoothing: (usize, usize), // (radius, passes)
    pub heavy_smoothing: (usize, usize),
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            world_height: 720.0,
            base_level: 0.75,
            mountain_scale: 140.0,
            pebble_scale: 1.5,
            pebble_frequency: 15.0,
            min_height: 100.0,
            bottom_margin: 20.0,
            octaves: 3,
            lacunarity: 2.0,
            gain: 0.4,
            frequency: 0.002,
            max_zones: 4,
            zone_margin: 80,
            zone_width: 60,
            blend_width: 30,
            light_smoothing: (2, 1),
            heavy_smoothing: (6, 2),
        }
    }
}

const ZONE_ATTEMPTS: usize = 64;

/// Build a heightfield for `seed`. Same config and seed, same terrain.
pub fn generate(config: &TerrainConfig, seed: u64) -> Result<Terrain, TerrainError> {
    if config.width < 2 {
        return Err(TerrainError::TooNarrow(config.width));
    }
    if !(config.world_height > 0.0) {
        return Err(TerrainError::BadWorldHeight(config.world_height));
    }

    let relief = Fbm::<OpenSimplex>::new(seed as u32)
        .set_octaves(config.octaves)
        .set_lacunarity(config.lacunarity)
        .set_persistence(config.gain)
        .set_frequency(config.frequency);

    let base_y = config.world_height * config.base_level;
    let floor = config.world_height - config.bottom_margin;
    let mut heights: Vec<f64> = (0..config.width)
        .map(|x| {
            let x = x as f64;
            let n = relief.get([x, 0.0]);
            let pebbles = relief.get([x * config.pebble_frequency, 100.0]) * config.pebble_scale;
            (base_y - n * config.mountain_scale + pebbles)
                .clamp(config.min_height, floor.max(config.min_height))
        })
        .collect();

    let (radius, passes) = config.light_smoothing;
    box_smooth(&mut heights, radius, passes);

    let mut rng = StdRng::seed_from_u64(seed);
    let centers = place_zones(config, &mut rng);
    for &center in &centers {
        flatten_zone(&mut heights, center, config.zone_width, config.blend_width);
    }
    debug!("terrain seed {seed}: {} landing zones at {:?}", centers.len(), centers);

    let (radius, passes) = config.heavy_smoothing;
    box_smooth(&mut heights, radius, passes);

    Terrain::from_heights(heights)
}

/// Pick non-overlapping zone centres away from the edges.
fn place_zones(config: &TerrainConfig, rng: &mut StdRng) -> Vec<usize> {
    let edge = config.zone_margin;
    if config.max_zones == 0 || config.width <= 2 * edge {
        return Vec::new();
    }
    let wanted = rng.gen_range(1..=config.max_zones);
    let spacing = config.zone_width + 2 * config.blend_width;

    let mut centers: Vec<usize> = Vec::with_capacity(wanted);
    let mut attempts = 0;
    while centers.len() < wanted {
        if attempts == ZONE_ATTEMPTS {
            warn!(
                "placed {} of {} landing zones before giving up",
                centers.len(),
                wanted
            );
            break;
        }
        attempts += 1;
        let candidate = rng.gen_range(edge..config.width - edge);
        if centers.iter().all(|&c| c.abs_diff(candidate) >= spacing) {
            centers.push(candidate);
        }
    }
    centers
}

fn flatten_zone(heights: &mut [f64], center: usize, zone_width: usize, blend_width: usize) {
    let width = heights.len() as isize;
    let level = heights[center];
    let pad_l = center as isize - (zone_width / 2) as isize;
    let pad_r = center as isize + (zone_width / 2) as isize;
    let blend = blend_width as isize;

    for x in pad_l.max(0)..=pad_r.min(width - 1) {
        heights[x as usize] = level;
    }
    if blend == 0 {
        return;
    }
    for x in (pad_l - blend).max(1)..pad_l.min(width) {
        let w = smoothstep((x - (pad_l - blend)) as f64 / blend as f64);
        heights[x as usize] = lerp(heights[x as usize], level, w);
    }
    for x in (pad_r + 1).max(1)..=(pad_r + blend).min(width - 1) {
        let w = smoothstep((x - (pad_r + 1)) as f64 / blend as f64);
        heights[x as usize] = lerp(level, heights[x as usize], w);
    }
}

/// Moving-average smoothing; the `radius` columns at each edge are untouched.
fn box_smooth(heights: &mut [f64], radius: usize, passes: usize) {
    if radius == 0 || heights.len() <= 2 * radius {
        return;
    }
    let window = (2 * radius + 1) as f64;
    for _ in 0..passes {
        let src = heights.to_vec();
        for x in radius..heights.len() - radius {
            heights[x] = src[x - radius..=x + radius].iter().sum::<f64>() / window;
        }
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
