#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lyric_dance::bake::baker::{BakeOutput, BakePayload, SceneBaker};
use lyric_dance::chunks::cache::assign_chunk_keys;
use lyric_dance::{
    BakeRegistry, BakedKeyframe, CHUNK_KEY_SCHEMA, DanceError, DanceResult, LogicalSize,
    LyricDancePlayer, PlayerConfig, SceneInput, SteppedAudio,
};

/// Scene with `lines` lyric lines of three words each; every word lasts 0.4 s.
pub fn scene(id: &str, lines: usize, direction: bool) -> SceneInput {
    let mut line_json = Vec::new();
    let mut word_json = Vec::new();
    for l in 0..lines {
        let start = l as f64 * 1.5;
        line_json.push(format!(
            r#"{{"text": "line {l}", "start": {start}, "end": {}}}"#,
            start + 1.4
        ));
        for w in 0..3 {
            let ws = start + w as f64 * 0.45;
            word_json.push(format!(
                r#"{{"word": "w{l}x{w}", "start": {ws}, "end": {}}}"#,
                ws + 0.4
            ));
        }
    }
    let song_end = (lines as f64 * 1.5).max(1.0);
    let direction_json = if direction {
        r##", "cinematic_direction": {
            "chapters": [
                {"title": "open", "start_ratio": 0.0, "end_ratio": 0.5, "background": "rain",
                 "emotional_intensity": 0.4},
                {"title": "peak", "start_ratio": 0.5, "end_ratio": 1.0, "background": "fire",
                 "emotional_intensity": 0.9, "dominant_color": "#aa3300"}
            ],
            "tension_curve": [{"ratio": 0.0, "tension": 0.1}, {"ratio": 1.0, "tension": 0.9}],
            "climax": {"time_ratio": 0.7, "max_intensity": 1.0}
        }"##
    } else {
        ""
    };
    SceneInput::from_json(&format!(
        r##"{{
            "scene_id": "{id}",
            "song": {{"artist": "Test Artist", "title": "Test Song"}},
            "lines": [{}],
            "words": [{}],
            "beat_grid": {{"bpm": 120, "beats": [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0]}},
            "palette": ["#101020", "#ffcc00"],
            "song_start": 0.0,
            "song_end": {song_end}
            {direction_json}
        }}"##,
        line_json.join(","),
        word_json.join(",")
    ))
    .expect("fixture scene parses")
}

/// Baker that places every active word of the scene, one keyframe per 100 ms.
#[derive(Debug, Default)]
pub struct ScriptedBaker {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
    /// Key the baker emits that no scene word produces.
    pub orphan: bool,
}

impl ScriptedBaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SceneBaker for ScriptedBaker {
    fn bake(
        &self,
        payload: &BakePayload<'_>,
        progress: &mut dyn FnMut(f32),
    ) -> DanceResult<BakeOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress(0.0);
        std::thread::sleep(self.delay);
        if self.fail {
            return Err(DanceError::bake("baker offline"));
        }
        let scene = payload.scene;
        let keys = assign_chunk_keys(&scene.lines, &scene.words);
        let steps = (scene.song_end * 10.0).ceil() as usize + 1;
        let mut keyframes = Vec::with_capacity(steps);
        for i in 0..steps {
            let t = i as f64 * 0.1;
            let chunks: Vec<serde_json::Value> = keys
                .iter()
                .enumerate()
                .filter(|(_, (_, w))| t >= w.start && t < w.end)
                .map(|(n, (k, _))| {
                    serde_json::json!({
                        "key": k.to_string(),
                        "x": payload.reference.width * 0.5,
                        "y": payload.reference.height * 0.5 + n as f64,
                        "font_size": 32.0,
                        "visible": true,
                        "glow": 0.5,
                        "emitter": "spark"
                    })
                })
                .chain(self.orphan.then(|| {
                    serde_json::json!({
                        "key": "99:0:0",
                        "x": 10.0,
                        "y": 10.0,
                        "font_size": 20.0,
                        "visible": true
                    })
                }))
                .collect();
            let kf: BakedKeyframe = serde_json::from_value(serde_json::json!({
                "time_ms": t * 1000.0,
                "camera_x": 4.0,
                "camera_zoom": 1.0,
                "bg_blend": t / scene.song_end.max(0.1),
                "particles": [{"x": 20.0, "y": 30.0, "size": 2.0, "alpha": 0.5}],
                "chunks": chunks
            }))
            .map_err(|e| DanceError::bake(format!("fixture keyframe: {e}")))?;
            keyframes.push(kf);
        }
        progress(1.0);
        Ok(BakeOutput {
            key_schema: CHUNK_KEY_SCHEMA,
            reference: Some(payload.reference),
            keyframes,
            chunk_texts: Default::default(),
        })
    }
}

/// Small, quiet configuration for fast tests.
pub fn config() -> PlayerConfig {
    PlayerConfig {
        surface: LogicalSize::new(90.0, 160.0),
        reference_size: LogicalSize::new(90.0, 160.0),
        health_interval_secs: 0.0,
        export_fps: 4,
        watermark: Some("test".to_owned()),
        ..PlayerConfig::default()
    }
}

pub fn player(
    scene: SceneInput,
    baker: Arc<ScriptedBaker>,
    registry: Arc<BakeRegistry>,
) -> (LyricDancePlayer, SteppedAudio) {
    let audio = SteppedAudio::new(scene.song_end).expect("audio clock");
    let player = LyricDancePlayer::new(scene, baker, registry, Box::new(audio.clone()), config())
        .expect("player builds");
    (player, audio)
}
