use thiserror::Error;

/// Fallback shown when a fetch failure carries no message of its own.
pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// Message reported when the user declines location access.
pub const PERMISSION_DENIED_MESSAGE: &str = "Permission to access location was denied";

/// Failures of the position provider. Both are terminal for the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Failures while mapping a raw record into the display shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("Weather response contained no condition entries")]
    MissingCondition,

    #[error("Weather timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

/// Failures of a single fetch cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Weather request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("{}", .0.as_deref().unwrap_or(INTERNAL_SERVER_ERROR))]
    Server(Option<String>),
}

impl FetchError {
    /// The string stored in fetch state for this failure.
    pub fn message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() {
            INTERNAL_SERVER_ERROR.to_string()
        } else {
            msg
        }
    }
}
