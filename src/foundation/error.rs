/// Crate-wide result alias.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised by timeline operations, the remote client, and the renderer.
///
/// Lookup misses (unknown fixture, missing background combination) are not errors; they are
/// logged at the call site and treated as "nothing to render".
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// Malformed input (bad configuration, unreadable bundle, empty instruction).
    #[error("validation error: {0}")]
    Validation(String),

    /// A programming error inside one operation; that update is aborted.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// A domain rule refused the edit; the timeline is left unchanged.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The generation service answered with an unrecognized shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Network failure talking to the generation service or task host.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Image decode/encode failure.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SceneError {
    /// Build a [`SceneError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SceneError::Invariant`] value.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Build a [`SceneError::Rejected`] value.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Build a [`SceneError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`SceneError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for the user-visible domain rule rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl From<serde_json::Error> for SceneError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
