use async_trait::async_trait;
use burrow_core::repository::Result;
use burrow_core::{RecordId, ShortCode, StorageError, UrlRecord, UrlRepository};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct Inner {
    records: DashMap<RecordId, UrlRecord>,
    /// Unique index: code → owning record.
    codes: DashMap<String, RecordId>,
    next_id: AtomicU64,
}

/// In-memory implementation of [`UrlRepository`] using DashMap.
///
/// Records are keyed by id with a separate unique index on the code. The
/// code index is claimed through DashMap's entry API, so two concurrent
/// inserts of the same code cannot both succeed.
///
/// Like a store with a TTL index, expired records stay visible until
/// [`purge_expired`](Self::purge_expired) removes them.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Inner>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically removes records whose expiry is at or before `now`.
    /// Returns the number of records removed.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let expired: Vec<(RecordId, ShortCode)> = self
            .inner
            .records
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| (*entry.key(), entry.value().code.clone()))
            .collect();

        for (id, code) in &expired {
            self.inner.records.remove(id);
            self.inner
                .codes
                .remove_if(code.as_str(), |_, owner| owner == id);
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "purged expired records");
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    fn insert(&self, mut record: UrlRecord) -> Result<UrlRecord> {
        match self.inner.codes.entry(record.code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.code.to_string())),
            Entry::Vacant(slot) => {
                let id = RecordId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
                record.id = Some(id);
                self.inner.records.insert(id, record.clone());
                slot.insert(id);
                trace!(code = %record.code, id = %id, "inserted record");
                Ok(record)
            }
        }
    }

    fn update(&self, id: RecordId, record: UrlRecord) -> Result<UrlRecord> {
        let Some(mut stored) = self.inner.records.get_mut(&id) else {
            return Err(StorageError::NotFound(format!("record {id}")));
        };

        if stored.code != record.code {
            return Err(StorageError::InvalidData(format!(
                "code of record {id} cannot change from '{}' to '{}'",
                stored.code, record.code
            )));
        }

        *stored = record.clone();
        Ok(record)
    }
}

#[async_trait]
impl UrlRepository for InMemoryRepository {
    async fn exists_by_code(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.inner.codes.contains_key(code.as_str()))
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let Some(id) = self.inner.codes.get(code.as_str()).map(|id| *id) else {
            return Ok(None);
        };

        Ok(self.inner.records.get(&id).map(|record| record.clone()))
    }

    async fn save(&self, record: UrlRecord) -> Result<UrlRecord> {
        match record.id {
            None => self.insert(record),
            Some(id) => self.update(id, record),
        }
    }
}
