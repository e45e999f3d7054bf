//! The player: lifecycle controller, settings, per-frame metrics and the health reporter.

pub mod config;
pub mod controller;
pub mod health;
pub mod metrics;

pub use config::PlayerConfig;
pub use controller::{LyricDancePlayer, PlayerState};
pub use metrics::{FrameMetrics, Layer};
