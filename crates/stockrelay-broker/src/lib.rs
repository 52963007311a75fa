pub mod amqp;
pub mod broker;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod retry;

pub use amqp::AmqpBroker;
pub use broker::{publish_with_monitor, Broker};
pub use consumer::Disposition;
pub use error::BrokerError;
pub use memory::MemoryBroker;
pub use retry::{connect_with_retry, RetryPolicy};
