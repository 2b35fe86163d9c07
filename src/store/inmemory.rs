use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::store::{AuditRecord, FetchRecord, InsertRecord};

/// An in-memory audit store for testing or local usage.
///
/// Records get sequential identifiers starting at 1, like an
/// auto-increment column. Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryStore {
    /// Snapshot of all stored records, in insertion order.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl InsertRecord for InMemoryStore {
    type Error = InMemoryStoreError;
    type ID = u64;

    /// Append the record; its id is its 1-based position.
    async fn insert_record(&self, record: AuditRecord) -> Result<u64, InMemoryStoreError> {
        let mut records = self.records.lock().await;
        records.push(record);
        u64::try_from(records.len()).map_err(|_| InMemoryStoreError::full())
    }
}

#[async_trait]
impl FetchRecord for InMemoryStore {
    type Error = InMemoryStoreError;
    type ID = u64;

    async fn fetch_record(&self, id: &u64) -> Result<Option<AuditRecord>, InMemoryStoreError> {
        let Some(index) = id.checked_sub(1).and_then(|i| usize::try_from(i).ok()) else {
            return Ok(None);
        };
        Ok(self.records.lock().await.get(index).cloned())
    }
}

/// Error type for `InMemoryStore` operations.
#[derive(Debug)]
pub struct InMemoryStoreError {
    kind: InMemoryStoreErrorKind,
}

impl InMemoryStoreError {
    fn full() -> Self {
        Self {
            kind: InMemoryStoreErrorKind::Full,
        }
    }
}

impl std::fmt::Display for InMemoryStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            InMemoryStoreErrorKind::Full => write!(f, "In-memory store ran out of identifiers"),
        }
    }
}

impl std::error::Error for InMemoryStoreError {}

#[derive(Debug)]
enum InMemoryStoreErrorKind {
    Full,
}
