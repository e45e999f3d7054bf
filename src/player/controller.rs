use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::audio::{AudioResource, PlayOutcome};
use crate::bake::baker::SceneBaker;
use crate::bake::registry::{BakeRegistry, SharedBake, run_bake};
use crate::chunks::cache::ChunkCache;
use crate::encode::sink::{AudioTrack, SinkConfig};
use crate::export::session::{ExportSession, RestoreState};
use crate::export::target::{ExportTarget, FfmpegExportTarget};
use crate::export::{ExportCallback, ExportOutcome, ExportRatio, StopReason};
use crate::foundation::core::LogicalSize;
use crate::foundation::error::{DanceError, DanceResult};
use crate::player::config::PlayerConfig;
use crate::player::health::HealthReporter;
use crate::player::metrics::FrameMetrics;
use crate::render::comets::CometOverlay;
use crate::render::frame::{ComposerSettings, FrameComposer, FrameInput};
use crate::render::painter::Painter;
use crate::render::surface::{FrameRGBA, SurfacePair};
use crate::scene::model::{CinematicDirection, SceneInput, SessionKey};
use crate::text::fonts::FontBook;
use crate::text::shaper::TextShaper;
use crate::timeline::store::Timeline;
use crate::tuning;

/// Lifecycle of a [`LyricDancePlayer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    /// Constructed; `init` not called yet.
    Created,
    /// Bake adopted; frames can be drawn.
    Ready,
    /// Torn down; every call is a no-op or an error.
    Destroyed,
}

/// Real-time lyric video player.
///
/// The host drives frames by calling [`LyricDancePlayer::tick`] once per display refresh. The
/// audio resource is the clock: every tick re-reads its position.
pub struct LyricDancePlayer {
    scene: SceneInput,
    config: PlayerConfig,
    baker: Arc<dyn SceneBaker>,
    registry: Arc<BakeRegistry>,
    audio: Box<dyn AudioResource>,
    export_target: Box<dyn ExportTarget>,
    surfaces: SurfacePair,
    shaper: TextShaper,
    state: PlayerState,
    bake: Option<Arc<SharedBake>>,
    timeline: Option<Timeline>,
    chunks: Arc<ChunkCache>,
    composer: Option<FrameComposer>,
    comets: CometOverlay,
    cursor: f64,
    frame: u64,
    draw_errors: u64,
    metrics: FrameMetrics,
    shared_metrics: Arc<Mutex<FrameMetrics>>,
    health: Option<HealthReporter>,
    export: Option<ExportSession>,
    on_export: Option<ExportCallback>,
    last_export: Option<ExportOutcome>,
    pending_size: Option<(LogicalSize, f64)>,
    play_blocked: bool,
}

impl std::fmt::Debug for LyricDancePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyricDancePlayer")
            .field("scene", &self.scene.scene_id)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("frame", &self.frame)
            .field("surfaces", &self.surfaces)
            .field("export", &self.export)
            .finish()
    }
}

impl LyricDancePlayer {
    /// Create a player. Nothing is baked until [`LyricDancePlayer::init`].
    ///
    /// A missing font is logged and falls back to approximate metrics.
    pub fn new(
        scene: SceneInput,
        baker: Arc<dyn SceneBaker>,
        registry: Arc<BakeRegistry>,
        audio: Box<dyn AudioResource>,
        config: PlayerConfig,
    ) -> DanceResult<Self> {
        scene.validate()?;
        config.validate()?;
        let surfaces = SurfacePair::new(config.surface, config.device_pixel_ratio)?;
        let shaper = TextShaper::new(FontBook::load(config.font_path.as_deref()));
        let export_target: Box<dyn ExportTarget> =
            Box::new(FfmpegExportTarget::new(config.export_dir.clone()));
        let cursor = scene.song_start;
        Ok(Self {
            comets: CometOverlay::new(config.seed ^ 0xC0_4E75),
            scene,
            config,
            baker,
            registry,
            audio,
            export_target,
            surfaces,
            shaper,
            state: PlayerState::Created,
            bake: None,
            timeline: None,
            chunks: Arc::new(ChunkCache::default()),
            composer: None,
            cursor,
            frame: 0,
            draw_errors: 0,
            metrics: FrameMetrics::default(),
            shared_metrics: Arc::new(Mutex::new(FrameMetrics::default())),
            health: None,
            export: None,
            on_export: None,
            last_export: None,
            pending_size: None,
            play_blocked: false,
        })
    }

    /// Replace where exports are written.
    pub fn with_export_target(mut self, target: Box<dyn ExportTarget>) -> Self {
        self.export_target = target;
        self
    }

    /// Callback run once per finished export.
    pub fn on_export_complete(mut self, cb: impl FnMut(&ExportOutcome) + Send + 'static) -> Self {
        self.on_export = Some(Box::new(cb));
        self
    }

    /// Obtain (or join) the shared bake, build the drawing systems and start audio.
    ///
    /// Bake failures are returned; no fallback timeline is substituted. Calling `init` on a
    /// ready player is a no-op.
    #[tracing::instrument(skip_all, fields(session = %self.scene.session_key()))]
    pub fn init(&mut self) -> DanceResult<()> {
        match self.state {
            PlayerState::Destroyed => {
                return Err(DanceError::validation("player was destroyed"));
            }
            PlayerState::Ready => return Ok(()),
            PlayerState::Created => {}
        }

        let key = self.scene.session_key();
        let bake = {
            let scene = &self.scene;
            let baker = self.baker.as_ref();
            let shaper = &mut self.shaper;
            let reference = self.config.reference_size;
            self.registry.acquire(&key, scene.has_direction(), || {
                run_bake(scene, baker, reference, shaper)
            })?
        };
        self.adopt_bake(bake)?;

        let size = self.surfaces.logical();
        self.composer = Some(FrameComposer::build(&self.scene, size, self.composer_settings())?);

        self.audio.seek(self.scene.song_start);
        self.cursor = self.scene.song_start;
        if let Err(e) = self.start_audio() {
            tracing::warn!(error = %e, "audio failed to start");
        }
        self.start_health();

        self.state = PlayerState::Ready;
        tracing::info!(
            keyframes = self.timeline.as_ref().map_or(0, Timeline::len),
            chunks = self.chunks.len(),
            "player ready"
        );
        Ok(())
    }

    /// Resume audio. Returns `false` when the host blocked playback until a user gesture.
    pub fn play(&mut self) -> DanceResult<bool> {
        self.ensure_alive()?;
        self.start_audio()?;
        Ok(!self.play_blocked)
    }

    /// Pause audio. Frames keep drawing.
    pub fn pause(&mut self) {
        self.audio.pause();
    }

    /// Move playback to `time_sec`, clamped to the song window.
    pub fn seek(&mut self, time_sec: f64) {
        let t = self.scene.clamp_time(time_sec);
        self.audio.seek(t);
        self.cursor = t;
    }

    /// [`LyricDancePlayer::seek`], then forget which words already spawned emitters.
    pub fn seek_to(&mut self, time_sec: f64) {
        self.seek(time_sec);
        if let Some(c) = self.composer.as_mut() {
            c.clear_fired();
        }
    }

    /// Resize the surfaces and rescale the adopted timeline. The baker is never re-run.
    ///
    /// While an export runs, the request is held and applied when the export stops.
    pub fn resize(&mut self, size: LogicalSize, dpr: f64) -> DanceResult<()> {
        self.ensure_alive()?;
        if self.export.is_some() {
            tracing::debug!(w = size.width, h = size.height, "resize deferred until export stops");
            self.pending_size = Some((size, dpr));
            return Ok(());
        }
        self.apply_size(size, dpr)
    }

    /// Mute or unmute. Unmuting retries playback that was blocked.
    pub fn set_muted(&mut self, muted: bool) {
        self.audio.set_muted(muted);
        if !muted
            && self.play_blocked
            && self.state == PlayerState::Ready
            && let Err(e) = self.start_audio()
        {
            tracing::warn!(error = %e, "audio failed to resume after unmute");
        }
    }

    /// Swap the cinematic direction and rebuild everything derived from it.
    ///
    /// Playback is not restarted. A shared bake that ran without direction is invalidated so the
    /// next player to `init` bakes with it.
    pub fn update_cinematic_direction(
        &mut self,
        direction: Option<CinematicDirection>,
    ) -> DanceResult<()> {
        self.ensure_alive()?;
        let previous = std::mem::replace(&mut self.scene.cinematic_direction, direction);
        if let Err(e) = self.scene.validate() {
            self.scene.cinematic_direction = previous;
            return Err(e);
        }
        if self.scene.has_direction() && self.registry.invalidate_for_direction(&self.scene.session_key()) {
            tracing::info!("shared bake invalidated; next init bakes with direction");
        }

        let mut chunks = ChunkCache::build(&self.scene, &mut self.shaper);
        chunks.absorb_missing(&self.chunks);
        self.chunks = Arc::new(chunks);

        let size = self.surfaces.logical();
        if let Some(c) = self.composer.as_mut() {
            c.rebuild_for_direction(&self.scene, size)?;
        }
        Ok(())
    }

    /// Start capturing the song at a fixed export resolution.
    ///
    /// Returns `Ok(false)` when an export is already running. On failure the loop flag and
    /// resolution are put back before the error is returned.
    #[tracing::instrument(skip(self))]
    pub fn start_export(&mut self, ratio: ExportRatio) -> DanceResult<bool> {
        self.ensure_ready()?;
        if self.export.is_some() {
            tracing::debug!("export already running");
            return Ok(false);
        }
        let fps = self.config.export_frame_rate()?;
        let opened = self
            .export_target
            .open(ratio, &self.scene.song.artist, &self.scene.song.title)?;

        let restore = RestoreState {
            looping: self.audio.looping(),
            size: self.surfaces.logical(),
            dpr: self.surfaces.dpr(),
        };
        self.audio.set_looping(false);
        if let Err(e) = self.apply_size(ratio.resolution(), 1.0) {
            self.revert(restore);
            return Err(e);
        }
        self.restart_pass();

        let canvas = self.surfaces.canvas();
        let cfg = SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps,
            bitrate_kbps: self.config.export_bitrate_kbps,
            audio: self.audio_track(),
        };
        let file_name = opened.file_name.clone();
        match ExportSession::start(opened, ratio, cfg, restore) {
            Ok(s) => self.export = Some(s),
            Err(e) => {
                tracing::error!(error = %e, "export failed to start");
                self.revert(restore);
                return Err(e);
            }
        }
        if let Err(e) = self.start_audio() {
            tracing::warn!(error = %e, "audio failed to start for export");
        }
        tracing::info!(file = %file_name, w = canvas.width, h = canvas.height, "export started");
        Ok(true)
    }

    /// Stop a running export. Returns its outcome, or `None` when none was running.
    pub fn stop_export(&mut self) -> Option<ExportOutcome> {
        self.finish_export(StopReason::Requested)
    }

    /// Draw one frame at the audio's current time. Returns `false` when the player is not ready.
    ///
    /// Draw failures are counted and logged; they never stop later frames.
    pub fn tick(&mut self, host_ms: f64) -> bool {
        if self.state != PlayerState::Ready {
            return false;
        }

        let t = self.audio.current_time();
        if self.export.is_some() {
            if self.audio.has_ended() {
                self.finish_export(StopReason::AudioEnded);
            } else if t >= self.scene.song_end {
                self.finish_export(StopReason::SongEnd);
            }
        } else if self.audio.looping() {
            if t >= self.scene.song_end {
                self.restart_pass();
            } else if t + tuning::LOOP_WRAP_BACKSTEP_SEC < self.cursor {
                // The audio resource wrapped on its own.
                tracing::debug!(from = self.cursor, to = t, "playback looped");
                self.rearm_pass();
            }
        }
        self.cursor = self.scene.clamp_time(self.audio.current_time());

        let started = Instant::now();
        let mut metrics = FrameMetrics {
            frame: self.frame + 1,
            song_time: self.cursor,
            progress: self.scene.progress_ratio(self.cursor),
            ..FrameMetrics::default()
        };
        if let Err(e) = self.render_frame(host_ms, &mut metrics) {
            self.draw_errors += 1;
            tracing::error!(error = %e, frame = self.frame + 1, "frame draw failed");
        }
        self.frame += 1;

        let elapsed = self.cursor - self.scene.song_start;
        let captured = self.export.as_mut().map(|session| {
            let frame = self.surfaces.read_primary();
            session.capture(&frame, elapsed)
        });
        if let Some(Err(e)) = captured {
            tracing::error!(error = %e, "export capture failed");
            self.finish_export(StopReason::Failed);
        }

        metrics.draw_errors = self.draw_errors;
        metrics.exporting = self.export.is_some();
        metrics.export_frames = self.export.as_ref().map_or(0, ExportSession::frames);
        metrics.draw_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.publish(metrics);
        true
    }

    /// Launch a flying comment at host time `now_ms` (same clock as [`LyricDancePlayer::tick`]).
    pub fn fire_comment(&mut self, text: &str, now_ms: f64) {
        self.comets.fire(text, now_ms);
    }

    /// Tear down: stop any export and the health reporter, release audio.
    ///
    /// The shared bake is left for future players of the same session. Further calls are no-ops.
    pub fn destroy(&mut self) {
        if self.state == PlayerState::Destroyed {
            return;
        }
        if self.export.is_some() {
            self.finish_export(StopReason::Requested);
        }
        if let Some(mut h) = self.health.take() {
            h.stop();
        }
        self.audio.pause();
        self.audio.release();
        self.state = PlayerState::Destroyed;
        tracing::debug!(scene = %self.scene.scene_id, frames = self.frame, "player destroyed");
    }

    /// Metrics of the last drawn frame.
    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    /// Shared handle to the latest metrics, as read by the health reporter.
    pub fn metrics_handle(&self) -> Arc<Mutex<FrameMetrics>> {
        self.shared_metrics.clone()
    }

    /// Song time shown by the last frame (or set by the last seek).
    pub fn current_time(&self) -> f64 {
        self.cursor
    }

    /// Whether audio is currently running.
    pub fn is_playing(&self) -> bool {
        self.audio.is_playing()
    }

    /// Lifecycle state.
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Scene being played.
    pub fn scene(&self) -> &SceneInput {
        &self.scene
    }

    /// Key the shared bake is stored under.
    pub fn session_key(&self) -> SessionKey {
        self.scene.session_key()
    }

    /// Adopted timeline, scaled to the current surface.
    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    /// Chunk cache in use.
    pub fn chunks(&self) -> &Arc<ChunkCache> {
        &self.chunks
    }

    /// The shared bake this player adopted.
    pub fn shared_bake(&self) -> Option<&Arc<SharedBake>> {
        self.bake.as_ref()
    }

    /// Drawing surfaces.
    pub fn surfaces(&self) -> &SurfacePair {
        &self.surfaces
    }

    /// Copy of the last drawn frame.
    pub fn read_frame(&self) -> FrameRGBA {
        self.surfaces.read_primary()
    }

    /// Frame composer, once ready.
    pub fn composer(&self) -> Option<&FrameComposer> {
        self.composer.as_ref()
    }

    /// Comment comets.
    pub fn comets(&self) -> &CometOverlay {
        &self.comets
    }

    /// Whether an export is capturing.
    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    /// Outcome of the most recent finished export.
    pub fn last_export(&self) -> Option<&ExportOutcome> {
        self.last_export.as_ref()
    }

    /// Frames that failed to draw.
    pub fn draw_errors(&self) -> u64 {
        self.draw_errors
    }

    /// Whether the health reporter thread is running.
    pub fn health_running(&self) -> bool {
        self.health.as_ref().is_some_and(HealthReporter::is_running)
    }

    fn adopt_bake(&mut self, bake: Arc<SharedBake>) -> DanceResult<()> {
        let mut timeline = bake.timeline.clone();
        timeline.rescale_to(self.surfaces.logical())?;
        self.timeline = Some(timeline);
        self.chunks = bake.chunks.clone();
        self.bake = Some(bake);
        Ok(())
    }

    fn composer_settings(&self) -> ComposerSettings {
        ComposerSettings {
            seed: self.config.seed,
            sim_fps: self.config.sim_fps,
            event_tolerance: self.config.event_tolerance,
            watermark: self.config.watermark.clone(),
        }
    }

    fn start_audio(&mut self) -> DanceResult<()> {
        match self.audio.play()? {
            PlayOutcome::Started => self.play_blocked = false,
            PlayOutcome::Blocked => {
                self.play_blocked = true;
                tracing::info!("audio playback blocked until unmuted");
            }
        }
        Ok(())
    }

    fn start_health(&mut self) {
        if self.health.is_some() || self.config.health_interval_secs <= 0.0 {
            return;
        }
        let Ok(interval) = Duration::try_from_secs_f64(self.config.health_interval_secs) else {
            tracing::warn!(secs = self.config.health_interval_secs, "health interval out of range");
            return;
        };
        match HealthReporter::spawn(interval, self.shared_metrics.clone()) {
            Ok(h) => self.health = Some(h),
            Err(e) => tracing::warn!(error = %e, "health reporter unavailable"),
        }
    }

    /// Rewind to the song start for a fresh pass.
    fn restart_pass(&mut self) {
        self.seek(self.scene.song_start);
        self.rearm_pass();
    }

    fn rearm_pass(&mut self) {
        if let Some(c) = self.composer.as_mut() {
            c.rearm_pass();
        }
    }

    fn apply_size(&mut self, size: LogicalSize, dpr: f64) -> DanceResult<()> {
        if !self.surfaces.resize(size, dpr)? {
            return Ok(());
        }
        if let Some(tl) = self.timeline.as_mut() {
            tl.rescale_to(size)?;
        }
        if let Some(c) = self.composer.as_mut() {
            c.resize(&self.scene, size)?;
        }
        tracing::debug!(w = size.width, h = size.height, dpr, "surfaces resized");
        Ok(())
    }

    fn revert(&mut self, restore: RestoreState) {
        self.audio.set_looping(restore.looping);
        if let Err(e) = self.apply_size(restore.size, restore.dpr) {
            tracing::error!(error = %e, "failed to restore surface size");
        }
    }

    fn audio_track(&self) -> Option<AudioTrack> {
        self.scene
            .song
            .audio_path
            .clone()
            .or_else(|| self.audio.source().map(Path::to_path_buf))
            .map(|path| AudioTrack {
                path,
                offset_sec: self.scene.song_start,
            })
    }

    #[tracing::instrument(skip(self))]
    fn finish_export(&mut self, reason: StopReason) -> Option<ExportOutcome> {
        let session = self.export.take()?;
        let restore = session.restore();
        let outcome = session.finish(reason);

        self.audio.set_looping(restore.looping);
        let (size, dpr) = self.pending_size.take().unwrap_or((restore.size, restore.dpr));
        if let Err(e) = self.apply_size(size, dpr) {
            tracing::error!(error = %e, "failed to restore surface size after export");
        }
        if matches!(reason, StopReason::AudioEnded | StopReason::SongEnd) {
            self.restart_pass();
            if restore.looping
                && let Err(e) = self.start_audio()
            {
                tracing::warn!(error = %e, "audio failed to restart after export");
            }
        }

        tracing::info!(
            file = %outcome.file_name,
            frames = outcome.frames,
            reason = ?outcome.reason,
            "export finished"
        );
        if let Some(cb) = self.on_export.as_mut() {
            cb(&outcome);
        }
        self.last_export = Some(outcome.clone());
        Some(outcome)
    }

    fn render_frame(&mut self, host_ms: f64, metrics: &mut FrameMetrics) -> DanceResult<()> {
        let Some(composer) = self.composer.as_mut() else {
            return Err(DanceError::render("frame composer not built"));
        };
        let timeline = self.timeline.as_ref();
        let index = timeline.and_then(|tl| tl.index_at(self.cursor * 1000.0));
        metrics.keyframe_index = index;
        let keyframe = timeline.zip(index).and_then(|(tl, i)| tl.frames().get(i));
        let input = FrameInput {
            scene: &self.scene,
            keyframe,
            chunks: &self.chunks,
            time_sec: self.cursor,
            now_ms: host_ms,
            size: self.surfaces.logical(),
            dpr: self.surfaces.dpr(),
            size_scale: timeline.map_or(1.0, Timeline::size_scale),
        };

        let dpr = input.dpr;
        let mut painter = Painter::new(self.surfaces.begin(), dpr);
        let result = composer.compose(&mut painter, input, &mut self.shaper, &mut self.comets, metrics);
        drop(painter);
        self.surfaces.finish();
        result
    }

    fn publish(&mut self, metrics: FrameMetrics) {
        *self
            .shared_metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = metrics.clone();
        self.metrics = metrics;
    }

    fn ensure_alive(&self) -> DanceResult<()> {
        if self.state == PlayerState::Destroyed {
            return Err(DanceError::validation("player was destroyed"));
        }
        Ok(())
    }

    fn ensure_ready(&self) -> DanceResult<()> {
        match self.state {
            PlayerState::Ready => Ok(()),
            PlayerState::Created => Err(DanceError::validation("player is not initialized")),
            PlayerState::Destroyed => Err(DanceError::validation("player was destroyed")),
        }
    }
}

impl Drop for LyricDancePlayer {
    fn drop(&mut self) {
        self.destroy();
    }
}
