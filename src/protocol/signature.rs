//! Request metadata and signing
//!
//! Every request carries a small set of headers identifying the client.
//! When credentials are configured the `x-mq-date-time` header is signed
//! with HMAC-SHA1 under the access secret.

use crate::config::ConsumerConfig;
use crate::core::unique_id::next_attempt_id;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;

/// Request headers
pub type Metadata = BTreeMap<String, String>;

pub const LANGUAGE_KEY: &str = "x-mq-language";
pub const PROTOCOL_VERSION_KEY: &str = "x-mq-protocol";
pub const CLIENT_VERSION_KEY: &str = "x-mq-client-version";
pub const DATE_TIME_KEY: &str = "x-mq-date-time";
pub const REQUEST_ID_KEY: &str = "x-mq-request-id";
pub const CLIENT_ID_KEY: &str = "x-mq-client-id";
pub const NAMESPACE_KEY: &str = "x-mq-namespace";
pub const SESSION_TOKEN_KEY: &str = "x-mq-session-token";
pub const AUTHORIZATION_KEY: &str = "authorization";

const ALGORITHM: &str = "MQv2-HMAC-SHA1";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Build the metadata for a request sent now
pub fn sign(config: &ConsumerConfig, client_id: &str) -> Metadata {
    sign_at(config, client_id, Utc::now())
}

/// Build the metadata for a request sent at `now`
pub fn sign_at(config: &ConsumerConfig, client_id: &str, now: DateTime<Utc>) -> Metadata {
    let mut metadata = Metadata::new();
    let date_time = now.format(DATE_TIME_FORMAT).to_string();

    metadata.insert(LANGUAGE_KEY.to_string(), "RUST".to_string());
    metadata.insert(PROTOCOL_VERSION_KEY.to_string(), "v2".to_string());
    metadata.insert(
        CLIENT_VERSION_KEY.to_string(),
        crate::CLIENT_VERSION.to_string(),
    );
    metadata.insert(DATE_TIME_KEY.to_string(), date_time.clone());
    metadata.insert(CLIENT_ID_KEY.to_string(), client_id.to_string());
    if let Some(request_id) = next_attempt_id() {
        metadata.insert(REQUEST_ID_KEY.to_string(), request_id);
    }
    if !config.namespace.is_empty() {
        metadata.insert(NAMESPACE_KEY.to_string(), config.namespace.clone());
    }

    let Some(credentials) = &config.credentials else {
        return metadata;
    };

    if let Some(token) = &credentials.security_token {
        metadata.insert(SESSION_TOKEN_KEY.to_string(), token.clone());
    }

    match Hmac::<Sha1>::new_from_slice(credentials.access_secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(date_time.as_bytes());
            let signature = hex::encode(mac.finalize().into_bytes());
            metadata.insert(
                AUTHORIZATION_KEY.to_string(),
                format!(
                    "{} Credential={}, SignedHeaders={}, Signature={}",
                    ALGORITHM, credentials.access_key, DATE_TIME_KEY, signature
                ),
            );
        }
        Err(e) => log::warn!("Cannot sign request, HMAC key rejected: {}", e),
    }

    metadata
}
