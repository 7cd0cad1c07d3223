use crate::export::job::ExportKind;

/// Convenience result type used across rectfit.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Top-level error taxonomy used by the timeline, rasterizer, and exporters.
#[derive(thiserror::Error, Debug)]
pub enum TimelineError {
    /// Invalid caller-provided input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// The optimization engine failed to produce a frame sequence.
    #[error("algorithm failure: {0}")]
    Algorithm(String),

    /// A scene could not be decoded or resolved to a non-empty surface.
    #[error("rasterization failure: {0}")]
    Rasterization(String),

    /// A still, animated, or archive encoder failed.
    #[error("encoding failure: {0}")]
    Encoding(String),

    /// The frame sequence was reset or re-run while an export was reading it.
    #[error("stale sequence: export captured generation {captured}, sequence is at {live}")]
    StaleSequence {
        /// Generation captured when the export job started.
        captured: u64,
        /// Generation observed on the live sequence.
        live: u64,
    },

    /// Another export job of the same kind is still running.
    #[error("export busy: a {0} export is already running")]
    Busy(ExportKind),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimelineError {
    /// Build a [`TimelineError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TimelineError::Algorithm`] value.
    pub fn algorithm(msg: impl Into<String>) -> Self {
        Self::Algorithm(msg.into())
    }

    /// Build a [`TimelineError::Rasterization`] value.
    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization(msg.into())
    }

    /// Build a [`TimelineError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Short machine-friendly name of the failure class.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Algorithm(_) => "algorithm",
            Self::Rasterization(_) => "rasterization",
            Self::Encoding(_) => "encoding",
            Self::StaleSequence { .. } => "stale-sequence",
            Self::Busy(_) => "busy",
            Self::Other(_) => "other",
        }
    }

    /// Whether this error terminates an export job (as opposed to being rejected up front).
    pub fn is_export_fatal(&self) -> bool {
        matches!(
            self,
            Self::Rasterization(_) | Self::Encoding(_) | Self::StaleSequence { .. } | Self::Other(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
