/// Convenience result type used across the engine.
pub type DanceResult<T> = Result<T, DanceError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum DanceError {
    /// Invalid scene input, timeline data, or caller arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// The external scene baker failed (shared with every waiter of that bake).
    #[error("bake error: {0}")]
    Bake(String),

    /// Errors raised while drawing a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Errors from frame sinks and the export encoder.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors reported by the audio resource.
    #[error("audio error: {0}")]
    Audio(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DanceError {
    /// Build a [`DanceError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DanceError::Bake`] value.
    pub fn bake(msg: impl Into<String>) -> Self {
        Self::Bake(msg.into())
    }

    /// Build a [`DanceError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`DanceError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`DanceError::Audio`] value.
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
