#![forbid(unsafe_code)]
//! Real-time lyric video engine.
//!
//! A [`LyricDancePlayer`] adopts a pre-baked keyframe timeline (shared across players of the same
//! session through a [`BakeRegistry`]), re-reads the audio clock every frame and paints chapter
//! backgrounds, pixel simulations, scripted events, animated words and ephemeral overlays onto a
//! CPU surface. Exports capture the same surface into a video file.

pub mod audio;
pub mod bake;
pub mod chunks;
pub mod compositor;
pub mod encode;
pub mod events;
pub mod export;
mod foundation;
pub mod player;
pub mod render;
pub mod scene;
pub mod sim;
pub mod text;
pub mod timeline;
pub mod tuning;

pub use audio::{AudioResource, PlayOutcome, SteppedAudio, WallClockAudio};
pub use bake::baker::{BakeOutput, BakePayload, SceneBaker, TimelineFileBaker};
pub use bake::registry::{BakeRegistry, SharedBake};
pub use chunks::cache::{ChunkCache, ChunkVisual};
pub use chunks::key::{CHUNK_KEY_SCHEMA, ChunkKey};
pub use encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use export::{ExportOutcome, ExportRatio, ExportTarget, MemoryExportTarget, StopReason};
pub use foundation::core::{Affine, Canvas, Fps, FrameIndex, LogicalSize, Point, Rect, Rgba8Premul};
pub use foundation::ease::Ease;
pub use foundation::error::{DanceError, DanceResult};
pub use player::{FrameMetrics, Layer, LyricDancePlayer, PlayerConfig, PlayerState};
pub use render::surface::FrameRGBA;
pub use scene::color::Color;
pub use scene::model::{CinematicDirection, SceneInput, SessionKey};
pub use timeline::keyframe::{BakedChunk, BakedKeyframe};
pub use timeline::store::Timeline;
