use std::path::PathBuf;

/// Convenience result type used across layercut.
pub type EditorResult<T> = Result<T, EditorError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Decode misses are not errors (they surface as `None`), and effect failures are recovered
/// inside the effect pipeline. The variants here are what callers can actually observe.
#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    /// Invalid user-provided or project data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A media file could not be opened or has no video stream.
    #[error("failed to open source '{}': {reason}", path.display())]
    SourceOpen {
        /// Path of the media file.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// Decoder failure that the caller asked to see (most call sites swallow these).
    #[error("decode error: {0}")]
    Decode(String),

    /// An effect failed internally. Never escapes [`crate::EffectPipeline`].
    #[error("effect error: {0}")]
    Effect(String),

    /// The external encoder could not start or its input pipe broke.
    #[error("render io error: {0}")]
    RenderIo(String),

    /// The render job was cancelled by the user.
    #[error("render cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing project data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EditorError {
    /// Build an [`EditorError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`EditorError::SourceOpen`] value.
    pub fn source_open(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceOpen {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`EditorError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build an [`EditorError::Effect`] value.
    pub fn effect(msg: impl Into<String>) -> Self {
        Self::Effect(msg.into())
    }

    /// Build an [`EditorError::RenderIo`] value.
    pub fn render_io(msg: impl Into<String>) -> Self {
        Self::RenderIo(msg.into())
    }

    /// Build an [`EditorError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for [`EditorError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
