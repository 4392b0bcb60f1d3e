//! Configuration Error Types

use std::path::PathBuf;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },

    #[error("Cannot read configuration file {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Cannot parse configuration: {message}")]
    Parse { message: String },
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        match self {
            ConfigError::Invalid { .. } => true,
            ConfigError::Parse { .. } => true,
            ConfigError::Io { .. } => false,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Invalid { message, .. } => Some(message),
            ConfigError::Parse { message } => Some(message),
            ConfigError::Io { .. } => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
