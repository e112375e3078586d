//! Error types for Framewise

/// Result type alias using Framewise's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Framewise operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The structural model failed validation
    #[error("invalid structural model: {}", .0.join("; "))]
    InvalidModel(Vec<String>),

    /// Malformed request input
    #[error("input error: {0}")]
    Input(String),

    /// A classifier stage (or one it depends on) has not been trained
    #[error("stage '{stage}' not ready: {reason}")]
    NotReady { stage: String, reason: String },

    /// Training pipeline errors
    #[error("training error: {0}")]
    Training(String),

    /// A retraining job is already running
    #[error("retraining already in progress")]
    RetrainInProgress,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a new not-ready error for a stage
    pub fn not_ready(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotReady {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Create a new training error
    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller supplied bad input (as opposed to a service-side condition)
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidModel(_) | Self::Input(_))
    }

    /// Whether the error means the service is not ready to answer yet
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_message_joins_errors() {
        let err = Error::InvalidModel(vec!["no nodes".into(), "no members".into()]);
        assert_eq!(err.to_string(), "invalid structural model: no nodes; no members");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_not_ready_classification() {
        let err = Error::not_ready("building_type", "frame_system stage missing");
        assert!(err.is_not_ready());
        assert!(!err.is_input_error());
        assert!(err.to_string().contains("building_type"));
    }
}
