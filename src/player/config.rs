use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Fps, LogicalSize};
use crate::foundation::error::{DanceError, DanceResult};
use crate::tuning;

/// Player settings.
///
/// Every field has a default, so a partial JSON object deserializes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial logical surface size.
    pub surface: LogicalSize,
    /// Device pixel ratio of the interactive surface.
    pub device_pixel_ratio: f64,
    /// Logical size the baker positions against.
    pub reference_size: LogicalSize,
    /// Export frame rate.
    pub export_fps: u32,
    /// Cap on simulation steps per second of song time.
    pub sim_fps: f64,
    /// Export video bitrate in kbit/s.
    pub export_bitrate_kbps: u32,
    /// Directory exports are written to.
    pub export_dir: PathBuf,
    /// Font file; system fonts are tried when unset or unreadable.
    pub font_path: Option<PathBuf>,
    /// Badge text drawn in the corner of every frame.
    pub watermark: Option<String>,
    /// Seconds between health log lines; `0` disables the reporter.
    pub health_interval_secs: f64,
    /// Seed for simulators and comet placement.
    pub seed: u64,
    /// Song-progress tolerance for firing emotional events.
    pub event_tolerance: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            surface: LogicalSize::new(540.0, 960.0),
            device_pixel_ratio: 1.0,
            reference_size: LogicalSize::new(540.0, 960.0),
            export_fps: 30,
            sim_fps: tuning::SIM_RATE_HZ,
            export_bitrate_kbps: 8_000,
            export_dir: PathBuf::from("exports"),
            font_path: None,
            watermark: Some("lyric dance".to_owned()),
            health_interval_secs: 5.0,
            seed: 0x5EED,
            event_tolerance: tuning::EVENT_TOLERANCE,
        }
    }
}

impl PlayerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> DanceResult<Self> {
        let mut cfg = Self::default();
        cfg.apply_overrides(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `LYRIC_DANCE_*` overrides read through `lookup`. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("LYRIC_DANCE_SIM_FPS") {
            match v.trim().parse::<f64>() {
                Ok(f) if f.is_finite() && f > 0.0 => self.sim_fps = f,
                _ => tracing::warn!(value = %v, "ignoring LYRIC_DANCE_SIM_FPS"),
            }
        }
        if let Some(v) = lookup("LYRIC_DANCE_EXPORT_DIR").filter(|v| !v.trim().is_empty()) {
            self.export_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LYRIC_DANCE_FONT").filter(|v| !v.trim().is_empty()) {
            self.font_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("LYRIC_DANCE_HEALTH_SECS") {
            match v.trim().parse::<f64>() {
                Ok(f) if f.is_finite() && f >= 0.0 => self.health_interval_secs = f,
                _ => tracing::warn!(value = %v, "ignoring LYRIC_DANCE_HEALTH_SECS"),
            }
        }
    }

    /// Check ranges the player relies on.
    pub fn validate(&self) -> DanceResult<()> {
        if !self.surface.is_valid() || !self.reference_size.is_valid() {
            return Err(DanceError::validation(
                "surface and reference sizes must be finite and > 0",
            ));
        }
        if !self.device_pixel_ratio.is_finite() || self.device_pixel_ratio <= 0.0 {
            return Err(DanceError::validation("device pixel ratio must be > 0"));
        }
        self.export_frame_rate()?;
        if self.export_bitrate_kbps == 0 {
            return Err(DanceError::validation("export bitrate must be > 0"));
        }
        if !self.sim_fps.is_finite() || self.sim_fps <= 0.0 {
            return Err(DanceError::validation("sim_fps must be > 0"));
        }
        if !self.health_interval_secs.is_finite() || self.health_interval_secs < 0.0 {
            return Err(DanceError::validation("health interval must be >= 0"));
        }
        if !self.event_tolerance.is_finite() || self.event_tolerance < 0.0 {
            return Err(DanceError::validation("event tolerance must be >= 0"));
        }
        Ok(())
    }

    /// Export frame rate as [`Fps`].
    pub fn export_frame_rate(&self) -> DanceResult<Fps> {
        Fps::new(self.export_fps, 1)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_validate() {
        PlayerConfig::default().validate().unwrap();
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            ("LYRIC_DANCE_SIM_FPS", "12"),
            ("LYRIC_DANCE_EXPORT_DIR", "/tmp/out"),
            ("LYRIC_DANCE_HEALTH_SECS", "soon"),
        ]
        .into_iter()
        .collect();
        let mut cfg = PlayerConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| (*v).to_owned()));
        assert_eq!(cfg.sim_fps, 12.0);
        assert_eq!(cfg.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.health_interval_secs, 5.0);
        assert!(cfg.font_path.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: PlayerConfig = serde_json::from_str(r#"{"export_fps": 24}"#).unwrap();
        assert_eq!(cfg.export_fps, 24);
        assert_eq!(cfg.sim_fps, tuning::SIM_RATE_HZ);
    }

    #[test]
    fn zero_fps_is_rejected() {
        let cfg = PlayerConfig {
            export_fps: 0,
            ..PlayerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
