pub mod detector;
pub mod radar;

pub use detector::{detect, pick_best, DetectorConfig, LandingSite};
pub use radar::{scan, RadarConfig, RayHit};
