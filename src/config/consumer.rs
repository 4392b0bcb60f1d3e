//! Consumer configuration and its TOML representation

use crate::config::error::{ConfigError, ConfigResult};
use crate::core::validation::{validate_consumer_group, validate_non_zero_duration, validate_positive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lease duration granted to popped messages unless configured otherwise
pub const DEFAULT_INVISIBLE_DURATION: Duration = Duration::from_secs(30);

/// Idle time after which a process queue is considered abandoned
///
/// Crate-wide: every process queue of every consumer uses the same value.
pub const PROCESS_QUEUE_EXPIRATION_THRESHOLD: Duration = Duration::from_secs(120);

/// Access credentials used to sign requests
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub access_secret: String,
    #[serde(default)]
    pub security_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, access_secret: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            access_secret: access_secret.into(),
            security_token: None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("access_secret", &"***")
            .field("security_token", &self.security_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Settings of a push consumer and of every process queue it owns
///
/// Durations are expressed in milliseconds in TOML:
///
/// ```toml
/// group = "GID_orders"
/// endpoints = "10.0.0.1:8081"
/// polling_timeout_ms = 20000
/// max_cached_message_quantity = 512
///
/// [credentials]
/// access_key = "ak"
/// access_secret = "sk"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    pub group: String,
    pub endpoints: String,
    pub namespace: String,
    pub region: String,
    pub credentials: Option<Credentials>,
    #[serde(rename = "request_timeout_ms", with = "duration_ms")]
    pub request_timeout: Duration,
    /// Long-polling await time granted to the broker per pop request
    #[serde(rename = "polling_timeout_ms", with = "duration_ms")]
    pub polling_timeout: Duration,
    pub receive_batch_size: u32,
    pub max_cached_message_quantity: u64,
    /// Zero disables the memory threshold
    pub max_cached_message_memory: u64,
    #[serde(rename = "invisible_duration_ms", with = "duration_ms")]
    pub invisible_duration: Duration,
    #[serde(rename = "throttled_retry_delay_ms", with = "duration_ms")]
    pub throttled_retry_delay: Duration,
    #[serde(rename = "failure_retry_delay_ms", with = "duration_ms")]
    pub failure_retry_delay: Duration,
    #[serde(rename = "cache_full_retry_delay_ms", with = "duration_ms")]
    pub cache_full_retry_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group: String::new(),
            endpoints: "127.0.0.1:8081".to_string(),
            namespace: String::new(),
            region: "cn-hangzhou".to_string(),
            credentials: None,
            request_timeout: Duration::from_secs(3),
            polling_timeout: Duration::from_secs(30),
            receive_batch_size: 32,
            max_cached_message_quantity: 1024,
            max_cached_message_memory: 64 * 1024 * 1024,
            invisible_duration: DEFAULT_INVISIBLE_DURATION,
            throttled_retry_delay: Duration::from_millis(20),
            failure_retry_delay: Duration::from_secs(1),
            cache_full_retry_delay: Duration::from_secs(1),
        }
    }
}

impl ConsumerConfig {
    /// Defaults for everything but the consumer group
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Self::default()
        }
    }

    /// Total time the transport waits for a pop request to complete
    pub fn receive_timeout(&self) -> Duration {
        self.polling_timeout + self.request_timeout
    }

    /// Check every setting, reporting the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str| {
            let field = field.to_string();
            move |message: String| ConfigError::Invalid { field, message }
        };

        validate_consumer_group(&self.group).map_err(invalid("group"))?;
        if self.endpoints.trim().is_empty() {
            return Err(invalid("endpoints")("endpoints cannot be empty".to_string()));
        }
        validate_positive("receive_batch_size", u64::from(self.receive_batch_size))
            .map_err(invalid("receive_batch_size"))?;
        validate_positive("max_cached_message_quantity", self.max_cached_message_quantity)
            .map_err(invalid("max_cached_message_quantity"))?;
        validate_non_zero_duration("invisible_duration", self.invisible_duration)
            .map_err(invalid("invisible_duration_ms"))?;
        validate_non_zero_duration("request_timeout", self.request_timeout)
            .map_err(invalid("request_timeout_ms"))?;
        if let Some(credentials) = &self.credentials {
            if credentials.access_key.is_empty() || credentials.access_secret.is_empty() {
                return Err(invalid("credentials")(
                    "credentials need both access_key and access_secret".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        log::debug!("Loaded consumer configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Load `<config dir>/popqueue/consumer.toml` if it exists
    pub async fn load_default() -> ConfigResult<Option<Self>> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path).await.map(Some),
            _ => Ok(None),
        }
    }
}

/// Location of the per-user default configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("popqueue").join("consumer.toml"))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
