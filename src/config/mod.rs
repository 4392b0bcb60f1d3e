//! Consumer configuration
//!
//! Everything a push consumer and its process queues read at runtime:
//! group identity, credentials, cache thresholds, batch size, timeouts and
//! retry delays. Configuration can be built in code or loaded from TOML.

mod consumer;
mod error;

pub use consumer::{
    default_config_path, ConsumerConfig, Credentials, DEFAULT_INVISIBLE_DURATION,
    PROCESS_QUEUE_EXPIRATION_THRESHOLD,
};
pub use error::{ConfigError, ConfigResult};
