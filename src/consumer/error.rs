//! Consumer Error Types

use crate::config::ConfigError;
use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsumerError {
    #[error("Invalid subscription for topic '{topic}': {message}")]
    InvalidSubscription { topic: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Synchronisation error: {message}")]
    Synchronisation { message: String },

    #[error("Consumer has been shut down")]
    ShutDown,
}

impl ContextualError for ConsumerError {
    fn is_user_actionable(&self) -> bool {
        match self {
            ConsumerError::InvalidSubscription { .. } => true,
            ConsumerError::Config(inner) => inner.is_user_actionable(),
            ConsumerError::Synchronisation { .. } | ConsumerError::ShutDown => false,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConsumerError::InvalidSubscription { message, .. } => Some(message),
            ConsumerError::Config(inner) => inner.user_message(),
            ConsumerError::Synchronisation { .. } | ConsumerError::ShutDown => None,
        }
    }
}

pub type ConsumerResult<T> = Result<T, ConsumerError>;
