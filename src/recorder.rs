//! Audit recorder for outgoing mail.
//!
//! [`MailAuditRecorder`] is a [`BeforeMailSent`] listener. For every message
//! about to be sent it:
//!
//! - Stamps the message with a fresh correlation id (`X-SentMail_Custom`)
//! - Stores an [`AuditRecord`] snapshot of the message, its envelope and the
//!   redacted mail settings
//! - Stamps the message with the id the store assigned (`X-SentMail_ID`)
//!
//! Recording is best effort. Whatever goes wrong is reported to the
//! [`RecorderHook`] and the send carries on.

use std::fmt::Display;

use chrono::Utc;
use serde::Serialize;
use tracing_error::SpanTrace;

use crate::{
    BoxError, DeliveryEnvelope, EnvelopeError,
    event::{BeforeMailSent, BeforeMailSentEvent},
    message::Mailbox,
    settings::MailSettings,
    store::{AuditLog, AuditRecord, InsertRecord, StoreError},
};

/// Header carrying the correlation id. Added once per send, never removed.
pub const CORRELATION_HEADER: &str = "X-SentMail_Custom";

/// Header carrying the store-assigned record id.
pub const ID_HEADER: &str = "X-SentMail_ID";

/// Prefix of every correlation id.
pub const CORRELATION_PREFIX: &str = "mail_";

/// Outgoing mail recorder.
///
/// Generic parameters:
/// - `D`: Audit store backend
/// - `HK`: Hook implementation for recording outcomes
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use sentmail::{BeforeMailSentEvent, Email, MailAuditRecorder, MailSettings};
/// use sentmail::store::inmemory::InMemoryStore;
///
/// let store = InMemoryStore::default();
/// let recorder = MailAuditRecorder::new(store.clone(), MailSettings::new());
///
/// let email = Email::new()
///     .with_from("a@x.com".parse().unwrap())
///     .with_to("b@x.com".parse().unwrap())
///     .with_subject("Hello");
/// let mut event = BeforeMailSentEvent::new(email, None);
///
/// recorder.record(&mut event).await;
///
/// assert_eq!(event.message().headers().get("X-SentMail_ID"), Some("1"));
/// assert_eq!(store.records().await[0].subject, "Hello");
/// # }
/// ```
pub struct MailAuditRecorder<D, HK = DefaultRecorderHook> {
    store: AuditLog<D>,
    settings: MailSettings,
    hook: HK,
}

impl<D> MailAuditRecorder<D, DefaultRecorderHook> {
    /// Create a new recorder with the default hook implementation.
    pub fn new(store: D, settings: MailSettings) -> Self {
        Self {
            store: AuditLog::new(store),
            settings,
            hook: DefaultRecorderHook,
        }
    }
}

impl<D, HK> MailAuditRecorder<D, HK>
where
    D: InsertRecord + Send + Sync,
    D::Error: Into<BoxError>,
    HK: RecorderHook,
{
    /// Replace the recorder hook while keeping the store and settings.
    pub fn with_hook<HK2: RecorderHook>(self, hook: HK2) -> MailAuditRecorder<D, HK2> {
        MailAuditRecorder {
            store: self.store,
            settings: self.settings,
            hook,
        }
    }

    /// Mail settings as they get stored: sensitive values masked, keys
    /// sorted naturally at every level.
    pub fn settings(&self) -> serde_json::Value {
        self.settings.redacted()
    }

    /// Record the message of `event` and stamp it.
    ///
    /// Never fails: errors go to [`RecorderHook::on_record_failed`]. On
    /// failure the message keeps its correlation header and gains no
    /// `X-SentMail_ID` header.
    #[tracing::instrument(skip_all)]
    pub async fn record(&self, event: &mut BeforeMailSentEvent) {
        match self.try_record(event).await {
            Ok((message_id, id)) => self.hook.on_recorded(&message_id, &id),
            Err(error) => self.hook.on_record_failed(&error),
        }
    }

    async fn try_record(
        &self,
        event: &mut BeforeMailSentEvent,
    ) -> Result<(String, D::ID), RecordError> {
        let message_id = correlation_id();
        event
            .message_mut()
            .headers_mut()
            .add_text_header(CORRELATION_HEADER, message_id.as_str());

        let record = self.build_record(event, &message_id)?;
        let id = self.store.insert(record).await.map_err(RecordError::store)?;

        let headers = event.message_mut().headers_mut();
        headers.remove(ID_HEADER);
        headers.add_text_header(ID_HEADER, id.to_string());

        Ok((message_id, id))
    }

    fn build_record(
        &self,
        event: &BeforeMailSentEvent,
        message_id: &str,
    ) -> Result<AuditRecord, RecordError> {
        // Both come from the one message on the event, so the "original"
        // already carries the correlation header.
        let sent = event.message();
        let original = event.message();

        let envelope = match event.envelope() {
            Some(envelope) => envelope.clone(),
            None => DeliveryEnvelope::from_message(original).map_err(RecordError::envelope)?,
        };

        let email_serialized = match original.as_email() {
            Some(email) => serde_json::to_string(email)?,
            None => String::new(),
        };

        Ok(AuditRecord {
            crdate: Utc::now(),
            subject: original.subject().to_owned(),
            sender: convert_addresses(original.from())?,
            receiver: convert_addresses(original.to())?,
            cc: convert_addresses(original.cc())?,
            bcc: convert_addresses(original.bcc())?,
            debug: String::new(),
            message_id: message_id.to_owned(),
            internal_id: message_id.to_owned(),
            message: sent.to_string(),
            original_message: original.to_string(),
            envelope_original: serde_json::to_string(&envelope)?,
            email_serialized,
            settings: serde_json::to_string(&self.settings())?,
        })
    }
}

#[async_trait::async_trait]
impl<D, HK> BeforeMailSent for MailAuditRecorder<D, HK>
where
    D: InsertRecord + Send + Sync,
    D::Error: Into<BoxError>,
    HK: RecorderHook,
{
    async fn before_mail_sent(&self, event: &mut BeforeMailSentEvent) {
        self.record(event).await
    }
}

fn correlation_id() -> String {
    format!("{CORRELATION_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

#[derive(Serialize)]
struct ConvertedAddress<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(rename = "_string")]
    string: String,
}

/// Encode mailboxes as a JSON array of `{"name", "email", "_string"}`
/// objects, `_string` being the canonical rendering.
///
/// A single mailbox goes through [`std::slice::from_ref`] and encodes the
/// same as a one-element list.
///
/// ```rust
/// use sentmail::{Mailbox, recorder::convert_addresses};
///
/// let jane: Mailbox = "Jane <jane@x.com>".parse().unwrap();
/// assert_eq!(
///     convert_addresses(std::slice::from_ref(&jane)).unwrap(),
///     r#"[{"name":"Jane","email":"jane@x.com","_string":"Jane <jane@x.com>"}]"#,
/// );
/// ```
pub fn convert_addresses<'a>(
    addresses: impl IntoIterator<Item = &'a Mailbox>,
) -> Result<String, serde_json::Error> {
    let converted: Vec<ConvertedAddress<'_>> = addresses
        .into_iter()
        .map(|address| ConvertedAddress {
            name: address.name(),
            email: address.email(),
            string: address.to_string(),
        })
        .collect();

    serde_json::to_string(&converted)
}

/// Error raised while recording a message.
///
/// Only ever surfaces through [`RecorderHook::on_record_failed`].
#[derive(Debug)]
pub struct RecordError {
    context: SpanTrace,
    kind: RecordErrorKind,
}

/// Classification of recording errors.
#[derive(Debug)]
pub enum RecordErrorKind {
    /// No envelope on the event and none derivable from the message.
    Envelope(EnvelopeError),
    /// Encoding a column failed.
    Serde(serde_json::Error),
    /// The store rejected the insert.
    Store(StoreError),
}

impl RecordError {
    fn new(kind: RecordErrorKind) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind,
        }
    }

    fn envelope(err: EnvelopeError) -> Self {
        Self::new(RecordErrorKind::Envelope(err))
    }

    fn store(err: StoreError) -> Self {
        Self::new(RecordErrorKind::Store(err))
    }

    /// What went wrong.
    pub fn kind(&self) -> &RecordErrorKind {
        &self.kind
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(RecordErrorKind::Serde(err))
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            RecordErrorKind::Envelope(err) => writeln!(f, "Envelope error: {err}"),
            RecordErrorKind::Serde(err) => writeln!(f, "Serde error: {err}"),
            RecordErrorKind::Store(err) => writeln!(f, "Store error: {err}"),
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            RecordErrorKind::Envelope(err) => Some(err),
            RecordErrorKind::Serde(err) => Some(err),
            RecordErrorKind::Store(err) => Some(err),
        }
    }
}

/// Hook trait for observing recording outcomes.
///
/// Hooks are invoked synchronously on the sending task and should avoid
/// heavy or blocking work.
pub trait RecorderHook: Send + Sync {
    fn on_recorded(&self, message_id: &str, id: &dyn Display);
    fn on_record_failed(&self, error: &RecordError);
}

/// Default recorder hook implementation.
///
/// Logs outcomes using `tracing`; failures are logged at `warn` level.
pub struct DefaultRecorderHook;

impl RecorderHook for DefaultRecorderHook {
    fn on_recorded(&self, message_id: &str, id: &dyn Display) {
        tracing::debug!(message_id, %id, "Outgoing mail recorded");
    }

    fn on_record_failed(&self, error: &RecordError) {
        tracing::warn!(%error, "Error while recording outgoing mail");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Email, RawMessage,
        store::{FetchRecord, inmemory::InMemoryStore},
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturingHook {
        recorded: Arc<Mutex<Vec<(String, String)>>>,
        failures: Arc<Mutex<Vec<String>>>,
    }

    impl RecorderHook for CapturingHook {
        fn on_recorded(&self, message_id: &str, id: &dyn Display) {
            self.recorded
                .lock()
                .unwrap()
                .push((message_id.to_owned(), id.to_string()));
        }

        fn on_record_failed(&self, error: &RecordError) {
            self.failures.lock().unwrap().push(error.to_string());
        }
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl InsertRecord for FailingStore {
        type Error = std::io::Error;
        type ID = u64;

        async fn insert_record(&self, _record: AuditRecord) -> Result<u64, std::io::Error> {
            Err(std::io::Error::other("database is gone"))
        }
    }

    fn mailbox(s: &str) -> Mailbox {
        s.parse().unwrap()
    }

    fn hello_email() -> Email {
        Email::new()
            .with_from(mailbox("a@x.com"))
            .with_to(mailbox("b@x.com"))
            .with_subject("Hello")
            .with_text("Hi")
    }

    fn recorder(
        store: &InMemoryStore,
    ) -> (MailAuditRecorder<InMemoryStore, CapturingHook>, CapturingHook) {
        let hook = CapturingHook::default();
        let recorder =
            MailAuditRecorder::new(store.clone(), MailSettings::new()).with_hook(hook.clone());
        (recorder, hook)
    }

    #[tokio::test]
    async fn records_end_to_end() {
        let store = InMemoryStore::default();
        let (recorder, hook) = recorder(&store);
        let mut event = BeforeMailSentEvent::new(hello_email(), None);

        recorder.record(&mut event).await;

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.sender, r#"[{"name":"","email":"a@x.com","_string":"a@x.com"}]"#);
        assert_eq!(record.receiver, r#"[{"name":"","email":"b@x.com","_string":"b@x.com"}]"#);
        assert_eq!(record.cc, "[]");
        assert_eq!(record.bcc, "[]");
        assert_eq!(record.subject, "Hello");
        assert_eq!(record.debug, "");
        assert_eq!(
            Some(record.message_id.as_str()),
            event.message().headers().get(CORRELATION_HEADER)
        );
        assert_eq!(record.internal_id, record.message_id);

        assert!(hook.failures.lock().unwrap().is_empty());
        assert_eq!(
            *hook.recorded.lock().unwrap(),
            vec![(record.message_id.clone(), "1".to_owned())]
        );
    }

    #[tokio::test]
    async fn correlation_id_has_prefix_and_is_unique() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);

        let mut first = BeforeMailSentEvent::new(hello_email(), None);
        let mut second = BeforeMailSentEvent::new(hello_email(), None);
        recorder.record(&mut first).await;
        recorder.record(&mut second).await;

        let first = first.message().headers().get(CORRELATION_HEADER).unwrap().to_owned();
        let second = second.message().headers().get(CORRELATION_HEADER).unwrap().to_owned();

        for id in [&first, &second] {
            let suffix = id.strip_prefix(CORRELATION_PREFIX).unwrap();
            assert_eq!(suffix.len(), 32);
            assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        }
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn id_header_replaces_previous_values() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);
        store
            .insert_record(AuditRecord {
                crdate: Utc::now(),
                subject: String::new(),
                sender: "[]".into(),
                receiver: "[]".into(),
                cc: "[]".into(),
                bcc: "[]".into(),
                debug: String::new(),
                message_id: "mail_previous".into(),
                internal_id: "mail_previous".into(),
                message: String::new(),
                original_message: String::new(),
                envelope_original: String::new(),
                email_serialized: String::new(),
                settings: String::new(),
            })
            .await
            .unwrap();

        let email = hello_email()
            .with_header("X-SentMail_ID", "stale")
            .with_header("x-sentmail_id", "older");
        let mut event = BeforeMailSentEvent::new(email, None);
        recorder.record(&mut event).await;

        let ids: Vec<_> = event.message().headers().get_all(ID_HEADER).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[tokio::test]
    async fn existing_correlation_headers_are_kept() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);
        let email = hello_email().with_header(CORRELATION_HEADER, "mail_upstream");
        let mut event = BeforeMailSentEvent::new(email, None);

        recorder.record(&mut event).await;

        let values: Vec<_> = event.message().headers().get_all(CORRELATION_HEADER).collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], "mail_upstream");
        assert_eq!(store.records().await[0].message_id, values[1]);
    }

    #[tokio::test]
    async fn store_failure_is_swallowed_and_reported() {
        let hook = CapturingHook::default();
        let recorder =
            MailAuditRecorder::new(FailingStore, MailSettings::new()).with_hook(hook.clone());
        let mut event = BeforeMailSentEvent::new(hello_email(), None);

        recorder.record(&mut event).await;

        let failures = hook.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("database is gone"));
        assert!(event.message().headers().contains(CORRELATION_HEADER));
        assert!(!event.message().headers().contains(ID_HEADER));
        assert!(hook.recorded.lock().unwrap().is_empty());
    }

    #[derive(Clone, Default)]
    struct WarnEvents(Arc<Mutex<Vec<String>>>);

    struct ErrorField(String);

    impl tracing::field::Visit for ErrorField {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "error" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut error = ErrorField(String::new());
            event.record(&mut error);
            self.0.lock().unwrap().push(error.0);
        }
    }

    #[tokio::test]
    async fn default_hook_logs_failures_as_warnings() {
        use tracing_subscriber::prelude::*;

        let warnings = WarnEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(warnings.clone()));

        let recorder = MailAuditRecorder::new(FailingStore, MailSettings::new());
        let mut event = BeforeMailSentEvent::new(hello_email(), None);
        recorder.record(&mut event).await;

        let warnings = warnings.0.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("database is gone"));
    }

    #[tokio::test]
    async fn line_breaks_cannot_forge_stored_headers() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);
        let eve = Mailbox::new("Eve\r\nBcc: spy@evil.com", "a@x.com".parse().unwrap());
        let email = Email::new()
            .with_from(eve)
            .with_to(mailbox("b@x.com"))
            .with_subject("Hi\r\nX-SentMail_ID: 999")
            .with_text("body");
        let mut event = BeforeMailSentEvent::new(email, None);

        recorder.record(&mut event).await;

        let record = &store.records().await[0];
        for stored in [&record.message, &record.original_message] {
            let lines: Vec<&str> = stored.split("\r\n").collect();
            assert!(!lines.iter().any(|line| line.starts_with("Bcc:")));
            assert!(!lines.iter().any(|line| line.starts_with(ID_HEADER)));
            assert!(lines.iter().all(|line| !line.contains('\n')));
        }
        assert_eq!(record.subject, "Hi X-SentMail_ID: 999");
        assert_eq!(record.bcc, "[]");

        let ids: Vec<_> = event.message().headers().get_all(ID_HEADER).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[tokio::test]
    async fn message_and_original_message_are_the_stamped_message() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);
        let mut event = BeforeMailSentEvent::new(hello_email(), None);

        recorder.record(&mut event).await;

        let record = &store.records().await[0];
        assert_eq!(record.message, record.original_message);
        assert!(record.message.contains(&format!("{CORRELATION_HEADER}: {}", record.message_id)));
        assert!(!record.message.contains(ID_HEADER));
    }

    #[tokio::test]
    async fn stores_derived_envelope_and_serialized_email() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);
        let email = hello_email().with_bcc(mailbox("Hidden <c@x.com>"));
        let mut event = BeforeMailSentEvent::new(email, None);

        recorder.record(&mut event).await;

        let record = &store.records().await[0];
        let envelope: DeliveryEnvelope = serde_json::from_str(&record.envelope_original).unwrap();
        assert_eq!(envelope.sender(), Some(mailbox("a@x.com").address()));
        assert_eq!(
            envelope.recipients(),
            &[
                mailbox("b@x.com").address().clone(),
                mailbox("c@x.com").address().clone()
            ]
        );

        let email: Email = serde_json::from_str(&record.email_serialized).unwrap();
        assert_eq!(email.subject(), Some("Hello"));
        assert_eq!(email.bcc(), &[mailbox("Hidden <c@x.com>")]);
        assert_eq!(
            record.bcc,
            r#"[{"name":"Hidden","email":"c@x.com","_string":"Hidden <c@x.com>"}]"#
        );
    }

    #[tokio::test]
    async fn explicit_envelope_wins() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);
        let envelope =
            DeliveryEnvelope::try_from((&mailbox("bounce@x.com"), &mailbox("other@x.com")))
                .unwrap();
        let mut event = BeforeMailSentEvent::new(hello_email(), Some(envelope.clone()));

        recorder.record(&mut event).await;

        let record = &store.records().await[0];
        assert_eq!(record.envelope_original, serde_json::to_string(&envelope).unwrap());
    }

    #[tokio::test]
    async fn raw_message_with_envelope_records_empty_fields() {
        let store = InMemoryStore::default();
        let (recorder, _) = recorder(&store);
        let envelope =
            DeliveryEnvelope::try_from((&mailbox("a@x.com"), &mailbox("b@x.com"))).unwrap();
        let raw = RawMessage::new("Subject: Re: Hello\r\n\r\nThanks");
        let mut event = BeforeMailSentEvent::new(raw, Some(envelope));

        recorder.record(&mut event).await;

        let record = &store.records().await[0];
        assert_eq!(record.subject, "");
        assert_eq!(record.sender, "[]");
        assert_eq!(record.receiver, "[]");
        assert_eq!(record.email_serialized, "");
        assert!(record.message.ends_with("Subject: Re: Hello\r\n\r\nThanks"));
        assert_eq!(event.message().headers().get(ID_HEADER), Some("1"));
    }

    #[tokio::test]
    async fn raw_message_without_envelope_fails_softly() {
        let store = InMemoryStore::default();
        let (recorder, hook) = recorder(&store);
        let mut event = BeforeMailSentEvent::new(RawMessage::new("body"), None);

        recorder.record(&mut event).await;

        assert!(store.records().await.is_empty());
        let failures = hook.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("raw message"));
        assert!(event.message().headers().contains(CORRELATION_HEADER));
    }

    #[tokio::test]
    async fn stores_redacted_sorted_settings() {
        let store = InMemoryStore::default();
        let settings = MailSettings::try_from(json!({
            "transport_smtp_server": "mail.example.com:587",
            "transport": "smtp",
            "defaultMailFromAddress": "noreply@example.com",
        }))
        .unwrap();
        let recorder = MailAuditRecorder::new(store.clone(), settings);
        let mut event = BeforeMailSentEvent::new(hello_email(), None);

        recorder.record(&mut event).await;

        assert_eq!(
            store.records().await[0].settings,
            concat!(
                r#"{"defaultMailFromAddress":"noreply@example.com","#,
                r#""transport":"smtp","transport_smtp_server":"******"}"#
            )
        );
    }

    #[tokio::test]
    async fn settings_are_idempotent() {
        let settings = MailSettings::try_from(json!({
            "z": {"transport_smtp_password": "secret", "a": [1]},
            "dsn": "smtp://u:p@h",
        }))
        .unwrap();
        let recorder = MailAuditRecorder::new(InMemoryStore::default(), settings);

        let once = recorder.settings();
        let twice = crate::settings::redact(once.clone());

        assert_eq!(once["z"]["transport_smtp_password"], "******");
        assert_eq!(serde_json::to_string(&once).unwrap(), serde_json::to_string(&twice).unwrap());
    }

    #[tokio::test]
    async fn works_as_listener_trait_object() {
        let store = InMemoryStore::default();
        let listener: Arc<dyn BeforeMailSent> =
            Arc::new(MailAuditRecorder::new(store.clone(), MailSettings::new()));
        let mut event = BeforeMailSentEvent::new(hello_email(), None);

        listener.before_mail_sent(&mut event).await;

        let record = store.fetch_record(&1).await.unwrap().unwrap();
        assert_eq!(record.subject, "Hello");
    }

    #[tokio::test]
    async fn concurrent_sends_get_their_own_rows() {
        let store = InMemoryStore::default();
        let recorder = Arc::new(MailAuditRecorder::new(store.clone(), MailSettings::new()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                tokio::spawn(async move {
                    let mut event = BeforeMailSentEvent::new(hello_email(), None);
                    recorder.record(&mut event).await;
                    event
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            let event = task.await.unwrap();
            ids.push(event.message().headers().get(ID_HEADER).unwrap().to_owned());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.records().await.len(), 8);
    }

    #[test]
    fn single_address_and_one_element_list_encode_the_same() {
        let jane = mailbox("Jane Doe <jane@x.com>");
        let list = vec![jane.clone()];

        assert_eq!(
            convert_addresses(std::slice::from_ref(&jane)).unwrap(),
            convert_addresses(&list).unwrap()
        );
        assert_eq!(
            convert_addresses(Some(&jane)).unwrap(),
            convert_addresses(&list).unwrap()
        );
    }

    #[test]
    fn empty_address_list_encodes_as_empty_array() {
        assert_eq!(convert_addresses(&[]).unwrap(), "[]");
    }
}
