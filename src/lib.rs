#![doc = include_str!("../README.md")]

pub mod envelope;
pub mod event;
pub mod message;
pub mod recorder;
pub mod settings;
pub mod store;

/// Boxed error used at backend boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[doc(inline)]
pub use envelope::{DeliveryEnvelope, EnvelopeError, EnvelopeErrorKind};

#[doc(inline)]
pub use event::{BeforeMailSent, BeforeMailSentEvent};

#[doc(inline)]
pub use message::{Email, Headers, Mailbox, OutgoingMessage, RawMessage};

#[doc(inline)]
pub use recorder::{
    DefaultRecorderHook, MailAuditRecorder, RecordError, RecordErrorKind, RecorderHook,
};

#[doc(inline)]
pub use settings::{MailSettings, SettingsError};

#[doc(inline)]
pub use store::{AuditLog, AuditRecord, StoreError};
