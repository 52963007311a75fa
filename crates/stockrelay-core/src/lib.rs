pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use schema::{monitor_queue, FieldRule, FieldSpec, QueueSchema};
pub use types::{Direction, Envelope, EnvelopeId};
