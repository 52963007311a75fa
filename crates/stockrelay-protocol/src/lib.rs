pub mod frames;
pub mod normalize;

pub use frames::{ErrorBody, HealthBody, HistoryFrame, SubmitRequest, SubmitResponse};
pub use normalize::{normalize, resolve, ValidationError};
