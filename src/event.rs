//! "Before send" notification contract.
//!
//! The mail pipeline that owns the message raises a [`BeforeMailSentEvent`]
//! once per outgoing message, right before handing it to the transport, and
//! passes it to every registered [`BeforeMailSent`] listener. Listeners may
//! mutate the message (e.g. add headers) and the envelope.

use crate::{DeliveryEnvelope, message::OutgoingMessage};

/// Message about to be sent, plus its optional delivery envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct BeforeMailSentEvent {
    message: OutgoingMessage,
    envelope: Option<DeliveryEnvelope>,
}

impl BeforeMailSentEvent {
    pub fn new(message: impl Into<OutgoingMessage>, envelope: Option<DeliveryEnvelope>) -> Self {
        Self {
            message: message.into(),
            envelope,
        }
    }

    pub fn message(&self) -> &OutgoingMessage {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut OutgoingMessage {
        &mut self.message
    }

    pub fn envelope(&self) -> Option<&DeliveryEnvelope> {
        self.envelope.as_ref()
    }

    pub fn set_envelope(&mut self, envelope: DeliveryEnvelope) {
        self.envelope = Some(envelope);
    }

    /// Hand the (possibly mutated) message and envelope back to the pipeline.
    pub fn into_parts(self) -> (OutgoingMessage, Option<DeliveryEnvelope>) {
        (self.message, self.envelope)
    }
}

/// Listener invoked synchronously, in line with the send, before delivery.
///
/// Listeners handle their own failures; nothing flows back into the send.
#[async_trait::async_trait]
pub trait BeforeMailSent: Send + Sync {
    async fn before_mail_sent(&self, event: &mut BeforeMailSentEvent);
}
