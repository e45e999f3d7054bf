use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::error::DanceResult;
use crate::player::metrics::FrameMetrics;

/// Background thread that logs the latest frame metrics at a fixed interval.
#[derive(Debug)]
pub struct HealthReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    reports: Arc<AtomicU64>,
}

impl HealthReporter {
    /// Start reporting `latest` every `interval`.
    pub fn spawn(interval: Duration, latest: Arc<Mutex<FrameMetrics>>) -> DanceResult<Self> {
        let (tx, rx) = mpsc::channel::<()>();
        let reports = Arc::new(AtomicU64::new(0));
        let counter = reports.clone();
        let handle = std::thread::Builder::new()
            .name("lyric-dance-health".to_owned())
            .spawn(move || {
                loop {
                    match rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let m = latest.lock().unwrap_or_else(PoisonError::into_inner).clone();
                            tracing::info!(
                                frame = m.frame,
                                song_time = m.song_time,
                                keyframe = ?m.keyframe_index,
                                drawn = m.words.drawn,
                                missing = m.missing_total,
                                events = m.active_events,
                                emitters = m.emitters,
                                comets = m.comets,
                                draw_errors = m.draw_errors,
                                exporting = m.exporting,
                                draw_ms = m.draw_ms,
                                "player health"
                            );
                            counter.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .context("spawn health reporter thread")?;
        Ok(Self {
            stop: Some(tx),
            handle: Some(handle),
            reports,
        })
    }

    /// Stop and join the thread. Further calls are no-ops.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.handle.take()
            && h.join().is_err()
        {
            tracing::warn!("health reporter thread panicked");
        }
    }

    /// Whether the thread is still owned by this reporter.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Health lines logged so far.
    pub fn reports(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }
}

impl Drop for HealthReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
