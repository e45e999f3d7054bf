//! Export pipeline: fixed-resolution capture of the playing surface into a video file.

pub mod session;
pub mod target;

use std::path::PathBuf;

use crate::foundation::core::LogicalSize;
use crate::foundation::error::{DanceError, DanceResult};

pub use session::ExportSession;
pub use target::{ExportTarget, FfmpegExportTarget, MemoryExportTarget, OpenedExport};

/// Output aspect ratios with their fixed export resolutions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ExportRatio {
    /// 1080x1920 vertical.
    #[serde(rename = "9:16")]
    Portrait,
    /// 1920x1080 horizontal.
    #[serde(rename = "16:9")]
    Landscape,
    /// 1080x1080.
    #[serde(rename = "1:1")]
    Square,
}

impl ExportRatio {
    /// Export surface size (logical px, rendered at a device pixel ratio of 1).
    pub fn resolution(self) -> LogicalSize {
        match self {
            Self::Portrait => LogicalSize::new(1080.0, 1920.0),
            Self::Landscape => LogicalSize::new(1920.0, 1080.0),
            Self::Square => LogicalSize::new(1080.0, 1080.0),
        }
    }

    /// Ratio label as written in file names, e.g. `9x16`.
    pub fn file_label(self) -> &'static str {
        match self {
            Self::Portrait => "9x16",
            Self::Landscape => "16x9",
            Self::Square => "1x1",
        }
    }
}

impl std::fmt::Display for ExportRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Square => "1:1",
        })
    }
}

impl std::str::FromStr for ExportRatio {
    type Err = DanceError;

    fn from_str(s: &str) -> DanceResult<Self> {
        match s.trim() {
            "9:16" | "9x16" | "portrait" => Ok(Self::Portrait),
            "16:9" | "16x9" | "landscape" => Ok(Self::Landscape),
            "1:1" | "1x1" | "square" => Ok(Self::Square),
            other => Err(DanceError::validation(format!(
                "unknown export ratio '{other}' (expected 9:16, 16:9 or 1:1)"
            ))),
        }
    }
}

/// Why an export stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The audio resource reached its natural end.
    AudioEnded,
    /// Playback passed the scene's end bound.
    SongEnd,
    /// `stop_export` was called.
    Requested,
    /// The encoder failed mid-run.
    Failed,
}

/// Result handed to the export completion callback.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExportOutcome {
    /// Ratio that was exported.
    pub ratio: ExportRatio,
    /// Download file name.
    pub file_name: String,
    /// Written file, when the target writes one.
    pub path: Option<PathBuf>,
    /// Frames pushed to the encoder.
    pub frames: u64,
    /// Why the export stopped.
    pub reason: StopReason,
    /// Encoder error, when finalizing failed.
    pub error: Option<String>,
}

/// Callback invoked once per finished export.
pub type ExportCallback = Box<dyn FnMut(&ExportOutcome) + Send>;

/// `{artist}-{song}-{ratio}.{ext}` with path-safe slugs.
pub fn export_file_name(artist: &str, song: &str, ratio: ExportRatio, ext: &str) -> String {
    format!(
        "{}-{}-{}.{}",
        slug(artist, "artist"),
        slug(song, "song"),
        ratio.file_label(),
        ext
    )
}

fn slug(s: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut dash = false;
    for c in s.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() { fallback.to_owned() } else { out }
}
