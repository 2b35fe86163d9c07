use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Database, Pool, Row};

use crate::store::{AuditRecord, FetchRecord, InsertRecord};

/// Type alias for the Postgres audit store.
pub type PgAuditStore = SqlxAuditStore<sqlx::Postgres>;

/// SQLx-based audit store driver.
pub struct SqlxAuditStore<DB>
where
    DB: Database,
{
    pool: Pool<DB>,
}

impl<DB> Clone for SqlxAuditStore<DB>
where
    DB: Database,
{
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<DB> SqlxAuditStore<DB>
where
    DB: Database,
{
    /// Creates a store on a pool without touching the schema.
    pub fn new_uninitialized(pool: Pool<DB>) -> Self {
        Self { pool }
    }
}

impl SqlxAuditStore<sqlx::Postgres> {
    /// Creates a new Postgres store and ensures the audit table exists.
    #[tracing::instrument(skip_all)]
    pub async fn try_new(pool: sqlx::PgPool) -> Result<Self, Error> {
        create_table(&pool).await?;
        Ok(Self::new_uninitialized(pool))
    }
}

#[async_trait]
impl InsertRecord for SqlxAuditStore<sqlx::Postgres> {
    type Error = Error;
    type ID = i64;

    #[tracing::instrument(skip_all)]
    async fn insert_record(&self, record: AuditRecord) -> Result<i64, Error> {
        let uid: i64 = sqlx::query_scalar(
            "INSERT INTO tx_sentmail_mail (
                crdate, subject, sender, receiver, cc, bcc, debug, message_id, internal_id,
                message, original_message, envelope_original, email_serialized, settings
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING uid",
        )
        .bind(record.crdate.timestamp())
        .bind(record.subject)
        .bind(record.sender)
        .bind(record.receiver)
        .bind(record.cc)
        .bind(record.bcc)
        .bind(record.debug)
        .bind(record.message_id)
        .bind(record.internal_id)
        .bind(record.message)
        .bind(record.original_message)
        .bind(record.envelope_original)
        .bind(record.email_serialized)
        .bind(record.settings)
        .fetch_one(&self.pool)
        .await?;

        Ok(uid)
    }
}

#[async_trait]
impl FetchRecord for SqlxAuditStore<sqlx::Postgres> {
    type Error = Error;
    type ID = i64;

    #[tracing::instrument(skip_all, fields(uid = id))]
    async fn fetch_record(&self, id: &i64) -> Result<Option<AuditRecord>, Error> {
        let row = sqlx::query(
            "SELECT crdate, subject, sender, receiver, cc, bcc, debug, message_id, internal_id,
                message, original_message, envelope_original, email_serialized, settings
            FROM tx_sentmail_mail WHERE uid = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let crdate: i64 = row.try_get("crdate")?;
        let crdate = DateTime::<Utc>::from_timestamp(crdate, 0)
            .ok_or_else(|| Error::invalid_timestamp(crdate))?;

        Ok(Some(AuditRecord {
            crdate,
            subject: row.try_get("subject")?,
            sender: row.try_get("sender")?,
            receiver: row.try_get("receiver")?,
            cc: row.try_get("cc")?,
            bcc: row.try_get("bcc")?,
            debug: row.try_get("debug")?,
            message_id: row.try_get("message_id")?,
            internal_id: row.try_get("internal_id")?,
            message: row.try_get("message")?,
            original_message: row.try_get("original_message")?,
            envelope_original: row.try_get("envelope_original")?,
            email_serialized: row.try_get("email_serialized")?,
            settings: row.try_get("settings")?,
        }))
    }
}

/// Ensures the audit table exists.
async fn create_table(pool: &sqlx::PgPool) -> Result<(), Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tx_sentmail_mail (
            uid BIGSERIAL PRIMARY KEY,
            crdate BIGINT NOT NULL DEFAULT 0,
            subject TEXT NOT NULL DEFAULT '',
            sender TEXT NOT NULL DEFAULT '',
            receiver TEXT NOT NULL DEFAULT '',
            cc TEXT NOT NULL DEFAULT '',
            bcc TEXT NOT NULL DEFAULT '',
            debug TEXT NOT NULL DEFAULT '',
            message_id VARCHAR(255) NOT NULL DEFAULT '',
            internal_id VARCHAR(255) NOT NULL DEFAULT '',
            message TEXT NOT NULL DEFAULT '',
            original_message TEXT NOT NULL DEFAULT '',
            envelope_original TEXT NOT NULL DEFAULT '',
            email_serialized TEXT NOT NULL DEFAULT '',
            settings TEXT NOT NULL DEFAULT ''
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Sqlx audit store errors.
#[derive(Debug)]
pub struct Error {
    context: tracing_error::SpanTrace,
    kind: SqlxDriverErrorKind,
}

/// Kinds of SQLx audit store errors.
#[derive(Debug)]
pub enum SqlxDriverErrorKind {
    Database(sqlx::Error),
    /// A stored `crdate` is out of range.
    InvalidTimestamp(i64),
}

impl Error {
    fn invalid_timestamp(secs: i64) -> Self {
        Self {
            context: tracing_error::SpanTrace::capture(),
            kind: SqlxDriverErrorKind::InvalidTimestamp(secs),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SqlxDriverErrorKind::Database(err) => writeln!(f, "Database error: {}", err),
            SqlxDriverErrorKind::InvalidTimestamp(secs) => {
                writeln!(f, "Invalid crdate timestamp: {}", secs)
            }
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SqlxDriverErrorKind::Database(err) => Some(err),
            SqlxDriverErrorKind::InvalidTimestamp(_) => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self {
            context: tracing_error::SpanTrace::capture(),
            kind: SqlxDriverErrorKind::Database(err),
        }
    }
}
