use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Store-assigned identity of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored URL record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Assigned by the repository on first save; `None` for unsaved records.
    pub id: Option<RecordId>,
    pub code: ShortCode,
    /// The original URL that was shortened.
    pub long_url: String,
    pub created_at: Timestamp,
    /// When the record expires, if ever.
    pub expires_at: Option<Timestamp>,
    /// Best-effort popularity counter. May under-count, never decreases.
    pub hit_count: u64,
}

impl UrlRecord {
    /// Builds an unsaved record created at `now`.
    ///
    /// A `ttl` of `None` or zero produces a record that never expires.
    pub fn new(
        code: ShortCode,
        long_url: impl Into<String>,
        now: Timestamp,
        ttl: Option<Duration>,
    ) -> std::result::Result<Self, StorageError> {
        let expires_at = match ttl.filter(|ttl| !ttl.is_zero()) {
            Some(ttl) => {
                let ttl = SignedDuration::try_from(ttl)
                    .map_err(|e| StorageError::InvalidData(format!("invalid ttl: {e}")))?;
                let expires_at = now
                    .checked_add(ttl)
                    .map_err(|e| StorageError::InvalidData(format!("invalid expiry: {e}")))?;
                Some(expires_at)
            }
            None => None,
        };

        Ok(Self {
            id: None,
            code,
            long_url: long_url.into(),
            created_at: now,
            expires_at,
            hit_count: 0,
        })
    }

    /// A record is expired once `now` has reached its expiry instant.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Lifetime left at `now`.
    ///
    /// `None` means the record never expires. Expired records report zero.
    pub fn remaining_ttl(&self, now: Timestamp) -> Option<Duration> {
        self.expires_at.map(|expires_at| {
            Duration::try_from(expires_at.duration_since(now)).unwrap_or(Duration::ZERO)
        })
    }
}

/// Durable keyed storage for URL records.
///
/// Lookups return records exactly as stored, including records whose expiry
/// has passed but which the backend has not purged yet. Callers decide
/// visibility.
#[async_trait]
pub trait UrlRepository: Send + Sync + 'static {
    /// Checks whether any retained record uses this code.
    async fn exists_by_code(&self, code: &ShortCode) -> Result<bool>;

    /// Retrieves the record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Inserts or updates a record.
    ///
    /// Records without an id are inserted and returned with their assigned id;
    /// `Err(Conflict)` if the code is already taken. Records with an id
    /// replace the stored record with that id.
    async fn save(&self, record: UrlRecord) -> Result<UrlRecord>;
}
