//! Audit store abstractions and backend drivers.
//!
//! The store persists one [`AuditRecord`] per outgoing message into the
//! `tx_sentmail_mail` table and hands back the identifier it assigned.
//! Records are append-only: nothing in this crate updates or deletes them.
//!
//! ## Components
//!
//! - [`AuditLog`]: High-level façade over a store backend
//! - [`InsertRecord`]: Trait for inserting a record
//! - [`FetchRecord`]: Trait for reading a record back by id
//!
//! Concrete implementations are provided by backend modules such as
//! [`inmemory`] and [`sqlx`] (feature-gated).

pub mod inmemory;

#[cfg(feature = "sqlx")]
pub mod sqlx;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use tracing_error::SpanTrace;

use crate::BoxError;

/// Name of the audit table.
pub const TABLE_NAME: &str = "tx_sentmail_mail";

/// Snapshot of one outgoing message.
///
/// Address columns hold JSON arrays of `{"name", "email", "_string"}`
/// objects, `settings` holds the redacted mail settings as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub crdate: DateTime<Utc>,
    pub subject: String,
    pub sender: String,
    pub receiver: String,
    pub cc: String,
    pub bcc: String,
    /// Reserved, always empty.
    pub debug: String,
    pub message_id: String,
    pub internal_id: String,
    pub message: String,
    pub original_message: String,
    pub envelope_original: String,
    pub email_serialized: String,
    pub settings: String,
}

/// Error returned by audit store operations.
///
/// Wraps the underlying backend error and captures a tracing span backtrace
/// for improved diagnostics.
#[derive(Debug)]
pub struct StoreError {
    context: SpanTrace,
    source: BoxError,
}

impl StoreError {
    /// Create a backend-related store error.
    fn backend(err: BoxError) -> Self {
        Self {
            context: SpanTrace::capture(),
            source: err,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Backend error: {}", self.source)?;
        self.context.fmt(f)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// High-level façade over an audit store backend.
#[derive(Debug, Clone)]
pub struct AuditLog<D>(D);

impl<D> AuditLog<D> {
    /// Create a new audit log backed by the given backend implementation.
    pub fn new(driver: D) -> Self {
        Self(driver)
    }

    /// Access the backend.
    pub fn driver(&self) -> &D {
        &self.0
    }

    /// Insert a record and return the identifier assigned by the backend.
    #[instrument(skip_all, fields(message_id = %record.message_id))]
    pub async fn insert(&self, record: AuditRecord) -> Result<D::ID, StoreError>
    where
        D: InsertRecord,
        D::Error: Into<BoxError>,
    {
        self.0
            .insert_record(record)
            .await
            .map_err(|e| StoreError::backend(e.into()))
    }

    /// Read a record back by its identifier.
    #[instrument(skip_all)]
    pub async fn fetch(
        &self,
        id: &<D as FetchRecord>::ID,
    ) -> Result<Option<AuditRecord>, StoreError>
    where
        D: FetchRecord,
        <D as FetchRecord>::Error: Into<BoxError>,
    {
        self.0
            .fetch_record(id)
            .await
            .map_err(|e| StoreError::backend(e.into()))
    }
}

/// Trait for inserting audit records.
///
/// The insert is a single atomic write; implementations assign the record
/// identifier.
#[async_trait::async_trait]
pub trait InsertRecord {
    /// Backend-specific error type.
    type Error;
    /// Identifier type assigned to stored records.
    type ID: std::fmt::Display + Send;

    /// Insert one record, returning its new identifier.
    async fn insert_record(&self, record: AuditRecord) -> Result<Self::ID, Self::Error>;
}

/// Trait for reading audit records back.
#[async_trait::async_trait]
pub trait FetchRecord {
    /// Backend-specific error type.
    type Error;
    /// Identifier type for stored records.
    type ID: Sync;

    /// Fetch a record by identifier, `None` when it does not exist.
    async fn fetch_record(&self, id: &Self::ID) -> Result<Option<AuditRecord>, Self::Error>;
}
