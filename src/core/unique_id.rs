//! Process-wide unique identifier generator
//!
//! Raw identifiers are 32 upper-case hex characters:
//!
//! ```text
//! ┌──────────────────┬──────────┬──────────────────┬──────────────────┐
//! │ host fingerprint │   pid    │ secs since epoch │     sequence     │
//! │     6 bytes      │ 2 bytes  │     4 bytes      │     4 bytes      │
//! └──────────────────┴──────────┴──────────────────┴──────────────────┘
//! ```
//!
//! The epoch is 2021-01-01T00:00:00Z. The generator is created lazily on
//! first use and lives for the rest of the process.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shortest raw identifier that can be turned into an attempt id
pub const MIN_RAW_ID_LEN: usize = 32;

const CUSTOM_EPOCH_SECS: u64 = 1_609_459_200;

static GENERATOR: LazyLock<UniqueIdGenerator> = LazyLock::new(|| {
    log::trace!("Initializing unique id generator");
    UniqueIdGenerator::new()
});

/// Thread-safe generator of collision-resistant identifiers
#[derive(Debug)]
pub struct UniqueIdGenerator {
    prefix: String,
    sequence: AtomicU32,
}

impl UniqueIdGenerator {
    /// The single generator shared by the whole process
    pub fn instance() -> &'static UniqueIdGenerator {
        &GENERATOR
    }

    fn new() -> Self {
        let fingerprint = Sha256::digest(host_name().as_bytes());
        let pid = (std::process::id() & 0xFFFF) as u16;
        Self {
            prefix: format!("{}{:04X}", hex::encode_upper(&fingerprint[..6]), pid),
            sequence: AtomicU32::new(0),
        }
    }

    /// Produce the next raw identifier
    pub fn next(&self) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            .saturating_sub(CUSTOM_EPOCH_SECS) as u32;
        format!("{}{:08X}{:08X}", self.prefix, seconds, sequence)
    }
}

/// Group a raw identifier as 8-4-4-4-12
///
/// Returns `None` when the raw identifier is too short to fill all groups.
pub fn format_attempt_id(raw: &str) -> Option<String> {
    if raw.len() < MIN_RAW_ID_LEN || !raw.is_ascii() {
        return None;
    }
    Some(format!(
        "{}-{}-{}-{}-{}",
        &raw[0..8],
        &raw[8..12],
        &raw[12..16],
        &raw[16..20],
        &raw[20..32]
    ))
}

/// Fresh hyphen-grouped identifier from the process-wide generator
pub fn next_attempt_id() -> Option<String> {
    format_attempt_id(&UniqueIdGenerator::instance().next())
}

/// Host name of this machine, `localhost` if it cannot be read
pub fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
