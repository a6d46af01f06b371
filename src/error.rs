use thiserror::Error;

/// Failure inside a text classifier backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("classifier backend failed: {0}")]
    Backend(String),

    #[error("classifier returned invalid output: {0}")]
    InvalidOutput(String),
}

impl InferenceError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn invalid_output(msg: impl Into<String>) -> Self {
        Self::InvalidOutput(msg.into())
    }
}

/// Failure local to the risk model (training or inference).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("risk model has not been trained")]
    NotTrained,

    #[error("malformed feature vector: {0}")]
    MalformedFeatures(String),

    #[error("degenerate training set: {0}")]
    DegenerateTrainingSet(String),

    #[error("invalid model parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to read model parameters: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode model parameters: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::engine::RiskEngine`] entry points.
///
/// These are the only failures a caller has to handle; both are retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Models are still loading in the background.
    #[error("models are still loading, try again shortly")]
    NotReady,

    /// Loading finished but the named model is not available.
    #[error("{0} is not available")]
    ModelUnavailable(&'static str),
}
