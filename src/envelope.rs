use serde::{Deserialize, Serialize};
use tracing_error::SpanTrace;

use crate::{
    BoxError,
    message::{Mailbox, OutgoingMessage},
};

/// Transport-level sender and recipients of a message.
///
/// The envelope is what the transport actually uses for delivery and may
/// differ from the visible headers, e.g. a bounce address as sender or `Bcc`
/// recipients that never appear in the rendered message.
///
/// Wraps [`lettre::address::Envelope`], so only bare addresses are kept and
/// an envelope always has at least one recipient.
///
/// ## Derivation
///
/// When a send carries no explicit envelope, [`DeliveryEnvelope::from_message`]
/// derives one from a structured message, as `lettre::Message::envelope` does:
///
/// - sender: the `Sender` mailbox if set, otherwise the first `From` mailbox
/// - recipients: `To`, then `Cc`, then `Bcc`
///
/// ```rust
/// use sentmail::{DeliveryEnvelope, Email};
///
/// let email = Email::new()
///     .with_from("Alice <a@x.com>".parse().unwrap())
///     .with_to("b@x.com".parse().unwrap())
///     .with_bcc("c@x.com".parse().unwrap());
///
/// let envelope = DeliveryEnvelope::from_message(&email.into()).unwrap();
/// assert_eq!(AsRef::<str>::as_ref(envelope.sender().unwrap()), "a@x.com");
/// assert_eq!(envelope.recipients().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryEnvelope(lettre::address::Envelope);

impl DeliveryEnvelope {
    /// Create an envelope, failing when there is no recipient.
    ///
    /// A `None` sender is the null reverse path used for bounces.
    pub fn new(
        sender: Option<lettre::Address>,
        recipients: Vec<lettre::Address>,
    ) -> Result<Self, EnvelopeError> {
        lettre::address::Envelope::new(sender, recipients)
            .map(Self)
            .map_err(|err| EnvelopeError::rejected(err.into()))
    }

    /// Derive an envelope from the message's own address fields.
    pub fn from_message(message: &OutgoingMessage) -> Result<Self, EnvelopeError> {
        let email = message
            .as_email()
            .ok_or_else(|| EnvelopeError::new(EnvelopeErrorKind::RawMessage))?;

        let sender = email
            .sender()
            .or_else(|| email.from().first())
            .ok_or_else(|| EnvelopeError::new(EnvelopeErrorKind::MissingSender))?;

        let recipients = email
            .to()
            .iter()
            .chain(email.cc())
            .chain(email.bcc())
            .map(|mailbox| mailbox.address().clone())
            .collect();

        Self::new(Some(sender.address().clone()), recipients)
    }

    pub fn sender(&self) -> Option<&lettre::Address> {
        self.0.from()
    }

    pub fn recipients(&self) -> &[lettre::Address] {
        self.0.to()
    }

    pub fn as_lettre(&self) -> &lettre::address::Envelope {
        &self.0
    }
}

impl From<lettre::address::Envelope> for DeliveryEnvelope {
    fn from(value: lettre::address::Envelope) -> Self {
        Self(value)
    }
}

impl From<DeliveryEnvelope> for lettre::address::Envelope {
    fn from(value: DeliveryEnvelope) -> Self {
        value.0
    }
}

/// Single-recipient envelope from two mailboxes, display names dropped.
impl TryFrom<(&Mailbox, &Mailbox)> for DeliveryEnvelope {
    type Error = EnvelopeError;

    fn try_from((sender, recipient): (&Mailbox, &Mailbox)) -> Result<Self, Self::Error> {
        Self::new(
            Some(sender.address().clone()),
            vec![recipient.address().clone()],
        )
    }
}

/// Error returned when an envelope cannot be built.
#[derive(Debug)]
pub struct EnvelopeError {
    context: SpanTrace,
    kind: EnvelopeErrorKind,
}

/// Envelope error kinds.
#[derive(Debug)]
pub enum EnvelopeErrorKind {
    /// Raw messages carry no addresses to derive an envelope from.
    RawMessage,
    /// Neither a `Sender` nor a `From` address is set.
    MissingSender,
    /// lettre refused the envelope, e.g. because it has no recipient.
    Rejected(BoxError),
}

impl EnvelopeError {
    fn new(kind: EnvelopeErrorKind) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind,
        }
    }

    fn rejected(err: BoxError) -> Self {
        Self::new(EnvelopeErrorKind::Rejected(err))
    }

    pub fn kind(&self) -> &EnvelopeErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            EnvelopeErrorKind::RawMessage => {
                writeln!(f, "Cannot derive an envelope from a raw message")
            }
            EnvelopeErrorKind::MissingSender => {
                writeln!(f, "Cannot derive an envelope: message has no sender or from address")
            }
            EnvelopeErrorKind::Rejected(err) => writeln!(f, "Invalid envelope: {err}"),
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            EnvelopeErrorKind::Rejected(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
