use super::*;
use crate::bake::baker::BakeOutput;
use crate::chunks::cache::ApproxMeasure;
use crate::chunks::key::{CHUNK_KEY_SCHEMA, ChunkKey};
use crate::timeline::keyframe::BakedKeyframe;
use std::sync::Barrier;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

fn scene(id: &str, words: usize) -> SceneInput {
    let words_json: Vec<String> = (0..words)
        .map(|i| format!(r#"{{"word": "w{i}", "start": {}, "end": {}}}"#, i, i as f64 + 0.5))
        .collect();
    SceneInput::from_json(&format!(
        r#"{{
            "scene_id": "{id}",
            "song": {{"artist": "a", "title": "t"}},
            "lines": [{{"text": "line", "start": 0.0, "end": 100.0}}],
            "words": [{}],
            "song_start": 0.0,
            "song_end": 100.0
        }}"#,
        words_json.join(",")
    ))
    .unwrap()
}

struct CountingBaker {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingBaker {
    fn new(delay_ms: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
        }
    }
}

impl SceneBaker for CountingBaker {
    fn bake(
        &self,
        _payload: &BakePayload<'_>,
        progress: &mut dyn FnMut(f32),
    ) -> DanceResult<BakeOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress(0.0);
        std::thread::sleep(self.delay);
        progress(1.0);
        let keyframes = (0..10)
            .map(|i| {
                serde_json::from_str::<BakedKeyframe>(&format!(r#"{{"time_ms": {}}}"#, i * 100))
                    .unwrap()
            })
            .collect();
        Ok(BakeOutput {
            key_schema: CHUNK_KEY_SCHEMA,
            reference: None,
            keyframes,
            chunk_texts: [(ChunkKey::new(9, 0, 0), "extra".to_owned())].into(),
        })
    }
}

struct FailingBaker;

impl SceneBaker for FailingBaker {
    fn bake(&self, _: &BakePayload<'_>, _: &mut dyn FnMut(f32)) -> DanceResult<BakeOutput> {
        Err(DanceError::bake("baker offline"))
    }
}

fn bake_with(
    reg: &BakeRegistry,
    scene: &SceneInput,
    baker: &dyn SceneBaker,
) -> DanceResult<Arc<SharedBake>> {
    reg.acquire(&scene.session_key(), scene.has_direction(), || {
        run_bake(
            scene,
            baker,
            LogicalSize::new(960.0, 540.0),
            &mut ApproxMeasure,
        )
    })
}

#[test]
fn concurrent_acquire_runs_one_bake() {
    let reg = BakeRegistry::new();
    let baker = CountingBaker::new(50);
    let s = scene("song", 6);
    let barrier = Barrier::new(8);

    let results: Vec<Arc<SharedBake>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    bake_with(&reg, &s, &baker).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(baker.calls.load(Ordering::SeqCst), 1);
    assert_eq!(reg.bakes_started(), 1);
    for r in &results {
        assert!(Arc::ptr_eq(r, &results[0]));
        assert_eq!(r.timeline.len(), 10);
        // Six scene words plus one chunk only the baker knows about.
        assert_eq!(r.chunks.len(), 7);
    }
}

#[test]
fn same_key_reuses_completed_bake() {
    let reg = BakeRegistry::new();
    let baker = CountingBaker::new(0);
    let s = scene("song", 3);
    let a = bake_with(&reg, &s, &baker).unwrap();
    let b = bake_with(&reg, &s, &baker).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(baker.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn changed_word_count_forces_rebake() {
    let reg = BakeRegistry::new();
    let baker = CountingBaker::new(0);
    bake_with(&reg, &scene("song", 3), &baker).unwrap();
    bake_with(&reg, &scene("song", 4), &baker).unwrap();
    bake_with(&reg, &scene("other", 4), &baker).unwrap();
    assert_eq!(baker.calls.load(Ordering::SeqCst), 3);
    assert_eq!(reg.current_key().unwrap().as_str(), "other:4");
}

#[test]
fn direction_arriving_later_forces_rebake_once() {
    let reg = BakeRegistry::new();
    let baker = CountingBaker::new(0);
    let plain = scene("song", 2);
    let mut directed = plain.clone();
    directed.cinematic_direction = Some(Default::default());

    bake_with(&reg, &plain, &baker).unwrap();
    let b = bake_with(&reg, &directed, &baker).unwrap();
    assert!(b.had_direction);
    // A bake with direction satisfies later requests with or without it.
    bake_with(&reg, &plain, &baker).unwrap();
    bake_with(&reg, &directed, &baker).unwrap();
    assert_eq!(baker.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn failure_reaches_caller_and_next_acquire_retries() {
    let reg = BakeRegistry::new();
    let s = scene("song", 2);
    let err = bake_with(&reg, &s, &FailingBaker).unwrap_err();
    assert_eq!(err.to_string(), "bake error: baker offline");
    assert!(reg.current().is_none());

    let baker = CountingBaker::new(0);
    bake_with(&reg, &s, &baker).unwrap();
    assert_eq!(reg.bakes_started(), 2);
}

#[test]
fn invalidate_for_direction_only_clears_directionless_slot() {
    let reg = BakeRegistry::new();
    let baker = CountingBaker::new(0);
    let s = scene("song", 1);
    bake_with(&reg, &s, &baker).unwrap();
    assert!(!reg.invalidate_for_direction(&SessionKey::new("other", 1)));
    assert!(reg.invalidate_for_direction(&s.session_key()));
    assert!(reg.current().is_none());
}

#[test]
fn unresolved_keys_are_counted() {
    struct StrayKeyBaker;
    impl SceneBaker for StrayKeyBaker {
        fn bake(&self, _: &BakePayload<'_>, _: &mut dyn FnMut(f32)) -> DanceResult<BakeOutput> {
            let kf: BakedKeyframe = serde_json::from_str(
                r#"{"time_ms": 0, "chunks": [
                    {"key": "0:0:0", "x": 0, "y": 0, "font_size": 10, "visible": true},
                    {"key": "7:7:7", "x": 0, "y": 0, "font_size": 10, "visible": true}
                ]}"#,
            )
            .unwrap();
            Ok(BakeOutput {
                key_schema: CHUNK_KEY_SCHEMA,
                reference: None,
                keyframes: vec![kf],
                chunk_texts: Default::default(),
            })
        }
    }
    let reg = BakeRegistry::new();
    let b = bake_with(&reg, &scene("song", 1), &StrayKeyBaker).unwrap();
    assert_eq!(b.unresolved_keys, 1);
}
