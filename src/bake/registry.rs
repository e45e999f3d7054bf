use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::bake::baker::{BakePayload, SceneBaker};
use crate::chunks::cache::{ChunkCache, TextMeasure, expected_chunks};
use crate::foundation::core::LogicalSize;
use crate::foundation::error::{DanceError, DanceResult};
use crate::scene::model::{SceneInput, SessionKey};
use crate::timeline::store::Timeline;

/// Result of one bake, shared by every player with the same session key.
#[derive(Debug)]
pub struct SharedBake {
    /// Session the bake belongs to.
    pub key: SessionKey,
    /// Timeline at reference scale. Players clone it and rescale their copy.
    pub timeline: Timeline,
    /// Chunk cache snapshot taken before the bake started, plus baker-only chunks.
    pub chunks: Arc<ChunkCache>,
    /// Whether cinematic direction was part of the baked payload.
    pub had_direction: bool,
    /// Keyframe chunk references with no cache entry.
    pub unresolved_keys: usize,
}

struct BakeSlot {
    key: SessionKey,
    with_direction: bool,
    cell: OnceLock<Result<Arc<SharedBake>, DanceError>>,
}

/// Session-keyed single-flight bake cache.
///
/// One slot at a time. A slot is created on miss, replaced on key mismatch or when direction
/// becomes available after a bake that ran without it, and cleared when its bake fails. Dropping
/// a player never clears it.
#[derive(Default)]
pub struct BakeRegistry {
    slot: Mutex<Option<Arc<BakeSlot>>>,
    started: AtomicUsize,
}

impl std::fmt::Debug for BakeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BakeRegistry")
            .field("current", &self.current_key())
            .field("bakes_started", &self.bakes_started())
            .finish()
    }
}

impl BakeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared bake for `key`, running `produce` only if no usable slot exists.
    ///
    /// Concurrent callers with the same key block on the same slot and observe the same result.
    /// A failed bake is reported to every waiter and the slot is cleared so the next call retries.
    pub fn acquire<F>(
        &self,
        key: &SessionKey,
        has_direction: bool,
        produce: F,
    ) -> DanceResult<Arc<SharedBake>>
    where
        F: FnOnce() -> DanceResult<SharedBake>,
    {
        let slot = {
            let mut guard = self.lock()?;
            match guard.as_ref() {
                Some(s) if s.key == *key && (s.with_direction || !has_direction) => s.clone(),
                other => {
                    if let Some(old) = other {
                        tracing::info!(
                            old = %old.key,
                            new = %key,
                            direction = has_direction,
                            "bake slot invalidated"
                        );
                    }
                    let s = Arc::new(BakeSlot {
                        key: key.clone(),
                        with_direction: has_direction,
                        cell: OnceLock::new(),
                    });
                    *guard = Some(s.clone());
                    s
                }
            }
        };

        let result = slot.cell.get_or_init(|| {
            self.started.fetch_add(1, Ordering::SeqCst);
            produce().map(Arc::new)
        });

        match result {
            Ok(bake) => Ok(bake.clone()),
            Err(e) => {
                self.evict(&slot);
                Err(replay_error(e))
            }
        }
    }

    /// Clear the slot so the next [`BakeRegistry::acquire`] bakes again.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = None;
        }
    }

    /// Clear the slot if it baked `key` without direction.
    ///
    /// Returns `true` when the slot was cleared.
    pub fn invalidate_for_direction(&self, key: &SessionKey) -> bool {
        let Ok(mut guard) = self.slot.lock() else {
            return false;
        };
        let stale = guard
            .as_ref()
            .is_some_and(|s| s.key == *key && !s.with_direction);
        if stale {
            *guard = None;
        }
        stale
    }

    /// Completed bake for the current slot, if any.
    pub fn current(&self) -> Option<Arc<SharedBake>> {
        let guard = self.slot.lock().ok()?;
        let slot = guard.as_ref()?;
        match slot.cell.get()? {
            Ok(b) => Some(b.clone()),
            Err(_) => None,
        }
    }

    /// Session key of the current slot.
    pub fn current_key(&self) -> Option<SessionKey> {
        let guard = self.slot.lock().ok()?;
        guard.as_ref().map(|s| s.key.clone())
    }

    /// Number of bake executions started over the registry lifetime.
    pub fn bakes_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn evict(&self, slot: &Arc<BakeSlot>) {
        if let Ok(mut guard) = self.slot.lock()
            && guard.as_ref().is_some_and(|s| Arc::ptr_eq(s, slot))
        {
            *guard = None;
        }
    }

    fn lock(&self) -> DanceResult<std::sync::MutexGuard<'_, Option<Arc<BakeSlot>>>> {
        self.slot
            .lock()
            .map_err(|_| DanceError::bake("bake registry lock poisoned"))
    }
}

fn replay_error(e: &DanceError) -> DanceError {
    match e {
        DanceError::Validation(m) => DanceError::Validation(m.clone()),
        DanceError::Bake(m) => DanceError::Bake(m.clone()),
        DanceError::Render(m) => DanceError::Render(m.clone()),
        DanceError::Encode(m) => DanceError::Encode(m.clone()),
        DanceError::Audio(m) => DanceError::Audio(m.clone()),
        DanceError::Other(err) => DanceError::Bake(format!("{err:#}")),
    }
}

/// Run one bake: snapshot the chunk cache, call the baker, then assemble the shared result.
///
/// The snapshot is owned by this call before the baker runs, so nothing a concurrent player does
/// can touch it.
#[tracing::instrument(skip_all, fields(scene = %scene.scene_id))]
pub fn run_bake(
    scene: &SceneInput,
    baker: &dyn SceneBaker,
    reference: LogicalSize,
    measure: &mut dyn TextMeasure,
) -> DanceResult<SharedBake> {
    let mut chunks = ChunkCache::build(scene, measure);
    let coverage = chunks.coverage(expected_chunks(&scene.words));
    if !coverage.is_complete() {
        return Err(DanceError::validation(format!(
            "chunk cache covers {} of {} words",
            coverage.entries, coverage.expected
        )));
    }

    let payload = BakePayload { scene, reference };
    let mut last_decile = -1i32;
    let mut progress = |p: f32| {
        let decile = (p.clamp(0.0, 1.0) * 10.0).floor() as i32;
        if decile != last_decile {
            last_decile = decile;
            tracing::debug!(progress = f64::from(p), "bake progress");
        }
    };
    let output = baker.bake(&payload, &mut progress)?;
    output.check_schema()?;

    let added = chunks.merge_missing(
        &output.chunk_texts,
        scene.physics.font_size,
        scene.physics.font_weight,
        measure,
    );
    let timeline = Timeline::new(output.keyframes, output.reference.unwrap_or(reference))?;

    let unresolved_keys = timeline
        .frames()
        .iter()
        .flat_map(|f| f.chunks.iter())
        .filter(|c| chunks.get(&c.key).is_none())
        .map(|c| c.key)
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    if unresolved_keys > 0 {
        tracing::warn!(
            unresolved_keys,
            "baked keyframes reference chunk keys missing from the cache"
        );
    }
    tracing::info!(
        keyframes = timeline.len(),
        chunks = chunks.len(),
        baker_chunks = added,
        "bake complete"
    );

    Ok(SharedBake {
        key: scene.session_key(),
        timeline,
        chunks: Arc::new(chunks),
        had_direction: scene.has_direction(),
        unresolved_keys,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/bake/registry.rs"]
mod tests;
