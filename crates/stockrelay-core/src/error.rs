use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker connection failed after {attempts} attempts: {reason}")]
    Connection { attempts: u32, reason: String },

    #[error("Broker not connected")]
    BrokerUnavailable,

    #[error("Publish to {queue} failed: {reason}")]
    Publish { queue: String, reason: String },

    #[error("Unparseable delivery on {queue}: {reason}")]
    Parse { queue: String, reason: String },

    #[error("Subscriber transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Short machine-readable code for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "CONFIG_ERROR",
            RelayError::Connection { .. } => "CONNECTION_ERROR",
            RelayError::BrokerUnavailable => "BROKER_UNAVAILABLE",
            RelayError::Publish { .. } => "PUBLISH_ERROR",
            RelayError::Parse { .. } => "PARSE_ERROR",
            RelayError::Transport(_) => "TRANSPORT_ERROR",
            RelayError::Serialization(_) => "SERIALIZATION_ERROR",
            RelayError::Timeout { .. } => "TIMEOUT",
            RelayError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
