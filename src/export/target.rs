use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::encode::ffmpeg::{Container, FfmpegSink, FfmpegSinkOpts, probe_container};
use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
use crate::export::{ExportRatio, export_file_name};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{DanceError, DanceResult};
use crate::render::surface::FrameRGBA;

/// A sink ready to receive an export, plus the file name it produces.
pub struct OpenedExport {
    /// Frame consumer.
    pub sink: Box<dyn FrameSink>,
    /// Download file name.
    pub file_name: String,
}

impl std::fmt::Debug for OpenedExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedExport")
            .field("file_name", &self.file_name)
            .field("path", &self.sink.output_path())
            .finish()
    }
}

/// Factory for export sinks.
pub trait ExportTarget: Send {
    /// Open a sink for one export run. Errors here abort the export before anything changes.
    fn open(&mut self, ratio: ExportRatio, artist: &str, song: &str) -> DanceResult<OpenedExport>;
}

/// Writes exports through the system `ffmpeg` into a directory.
#[derive(Debug, Clone)]
pub struct FfmpegExportTarget {
    dir: PathBuf,
    container: Option<Container>,
}

impl FfmpegExportTarget {
    /// Export into `dir`; the container is probed on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            container: None,
        }
    }

    /// Skip probing and always use `container`.
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportTarget for FfmpegExportTarget {
    fn open(&mut self, ratio: ExportRatio, artist: &str, song: &str) -> DanceResult<OpenedExport> {
        let container = match self.container {
            Some(c) => c,
            None => {
                let c = probe_container().ok_or_else(|| {
                    DanceError::encode("ffmpeg offers neither libx264 nor libvpx-vp9")
                })?;
                tracing::info!(container = ?c, "probed export container");
                self.container = Some(c);
                c
            }
        };
        let file_name = export_file_name(artist, song, ratio, container.extension());
        let sink = FfmpegSink::new(FfmpegSinkOpts::new(self.dir.join(&file_name), container));
        Ok(OpenedExport {
            sink: Box::new(sink),
            file_name,
        })
    }
}

/// Captures exports in memory; the handle stays readable after the player took the sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryExportTarget {
    captured: Arc<Mutex<InMemorySink>>,
    unavailable: bool,
    opened: Arc<Mutex<u32>>,
}

impl MemoryExportTarget {
    /// Target that always opens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target whose `open` fails like a missing encoder.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Lock the sink shared with the running export.
    pub fn captured(&self) -> MutexGuard<'_, InMemorySink> {
        self.captured.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Successful `open` calls.
    pub fn opened(&self) -> u32 {
        *self.opened.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExportTarget for MemoryExportTarget {
    fn open(&mut self, ratio: ExportRatio, artist: &str, song: &str) -> DanceResult<OpenedExport> {
        if self.unavailable {
            return Err(DanceError::encode("no video encoder available"));
        }
        *self.opened.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(OpenedExport {
            sink: Box::new(SharedSink(self.captured.clone())),
            file_name: export_file_name(artist, song, ratio, "raw"),
        })
    }
}

struct SharedSink(Arc<Mutex<InMemorySink>>);

impl SharedSink {
    fn lock(&self) -> MutexGuard<'_, InMemorySink> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSink for SharedSink {
    fn begin(&mut self, cfg: SinkConfig) -> DanceResult<()> {
        self.lock().begin(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> DanceResult<()> {
        self.lock().push_frame(idx, frame)
    }

    fn end(&mut self) -> DanceResult<()> {
        self.lock().end()
    }
}
