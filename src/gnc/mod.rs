pub mod autopilot;
pub mod controller;
pub mod manual;
pub mod pid;

pub use autopilot::{LandingController, Phase};
pub use controller::Controller;
pub use manual::{ManualKeys, ManualPilot};
pub use pid::Pid;
