use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

use crate::chunks::key::{CHUNK_KEY_SCHEMA, ChunkKey};
use crate::foundation::core::LogicalSize;
use crate::foundation::error::{DanceError, DanceResult};
use crate::scene::model::SceneInput;
use crate::timeline::keyframe::BakedKeyframe;

/// Input handed to a [`SceneBaker`].
#[derive(Clone, Copy, Debug)]
pub struct BakePayload<'a> {
    /// Scene (lines, words, beat grid, physics, palette, direction, bounds).
    pub scene: &'a SceneInput,
    /// Logical size positions should be baked against.
    pub reference: LogicalSize,
}

/// What a baker returns.
#[derive(Clone, Debug, Deserialize)]
pub struct BakeOutput {
    /// Chunk key schema the baker keyed its chunks with.
    pub key_schema: u32,
    /// Logical size the positions were baked at; defaults to the requested reference.
    #[serde(default)]
    pub reference: Option<LogicalSize>,
    /// Keyframes ordered by time.
    pub keyframes: Vec<BakedKeyframe>,
    /// Text for chunk keys the baker introduced on its own.
    #[serde(default)]
    pub chunk_texts: BTreeMap<ChunkKey, String>,
}

impl BakeOutput {
    /// Reject output keyed with a different schema.
    pub fn check_schema(&self) -> DanceResult<()> {
        if self.key_schema != CHUNK_KEY_SCHEMA {
            return Err(DanceError::validation(format!(
                "baker chunk key schema {} does not match engine schema {}",
                self.key_schema, CHUNK_KEY_SCHEMA
            )));
        }
        Ok(())
    }
}

/// External collaborator that turns a scene into a keyframe timeline.
///
/// The engine calls it at most once per session key. It may be slow and may report fractional
/// progress in `0..=1`.
pub trait SceneBaker: Send + Sync {
    /// Bake the full timeline.
    fn bake(
        &self,
        payload: &BakePayload<'_>,
        progress: &mut dyn FnMut(f32),
    ) -> DanceResult<BakeOutput>;
}

/// Baker that loads a timeline JSON produced by an out-of-process bake.
#[derive(Clone, Debug)]
pub struct TimelineFileBaker {
    path: PathBuf,
}

impl TimelineFileBaker {
    /// Read keyframes from `path` when asked to bake.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Source file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SceneBaker for TimelineFileBaker {
    fn bake(
        &self,
        payload: &BakePayload<'_>,
        progress: &mut dyn FnMut(f32),
    ) -> DanceResult<BakeOutput> {
        progress(0.0);
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read timeline '{}'", self.path.display()))?;
        progress(0.5);
        let out: BakeOutput = serde_json::from_str(&text).map_err(|e| {
            DanceError::bake(format!("parse timeline '{}': {e}", self.path.display()))
        })?;
        tracing::debug!(
            scene = %payload.scene.scene_id,
            keyframes = out.keyframes.len(),
            "loaded timeline file"
        );
        progress(1.0);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_with_foreign_schema_is_rejected() {
        let out: BakeOutput =
            serde_json::from_str(r#"{"key_schema": 99, "keyframes": []}"#).unwrap();
        let err = out.check_schema().unwrap_err();
        assert!(err.to_string().starts_with("validation error:"));
    }

    #[test]
    fn chunk_texts_use_string_keys() {
        let out: BakeOutput = serde_json::from_str(
            r#"{"key_schema": 1, "keyframes": [], "chunk_texts": {"0:1:2": "la"}}"#,
        )
        .unwrap();
        out.check_schema().unwrap();
        assert_eq!(out.chunk_texts[&ChunkKey::new(0, 1, 2)], "la");
    }
}
