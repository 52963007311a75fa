use stockrelay_core::RelayError;
use thiserror::Error;

/// Errors raised while talking to the message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A single connection attempt failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Every attempt in the retry budget failed.
    #[error("Broker unreachable after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// Declaring a queue was refused.
    #[error("Declare of {queue} failed: {reason}")]
    Declare { queue: String, reason: String },

    /// A publish was rejected or the channel broke mid-write.
    #[error("Publish to {queue} failed: {reason}")]
    Publish { queue: String, reason: String },

    /// Consuming from a queue failed or the consumer stream ended.
    #[error("Consumer on {queue} stopped: {reason}")]
    Consume { queue: String, reason: String },

    /// An operation exceeded its allowed time budget.
    #[error("{op} timed out after {ms}ms")]
    Timeout { op: &'static str, ms: u64 },
}

impl From<BrokerError> for RelayError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Exhausted { attempts, last_error } => RelayError::Connection {
                attempts,
                reason: last_error,
            },
            BrokerError::Publish { queue, reason } | BrokerError::Declare { queue, reason } => {
                RelayError::Publish { queue, reason }
            }
            BrokerError::Timeout { ms, .. } => RelayError::Timeout { ms },
            other => RelayError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
