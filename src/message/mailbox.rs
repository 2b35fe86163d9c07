use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_error::SpanTrace;

use super::headers::fold_line_breaks;

/// A mail address with an optional display name.
///
/// Thin wrapper around [`lettre::message::Mailbox`], which does the parsing,
/// the quoting of display names and the serde representation. Line breaks in
/// a display name are folded into spaces, so a name always renders on one
/// header line.
///
/// ```rust
/// use sentmail::Mailbox;
///
/// let mailbox: Mailbox = "Jane <jane@example.com>".parse().unwrap();
/// assert_eq!(mailbox.name(), "Jane");
/// assert_eq!(mailbox.email(), "jane@example.com");
/// assert_eq!(mailbox.to_string(), "Jane <jane@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "lettre::message::Mailbox", into = "lettre::message::Mailbox")]
pub struct Mailbox(lettre::message::Mailbox);

impl Mailbox {
    /// Mailbox with a display name; an empty name means none.
    pub fn new(name: impl Into<String>, email: lettre::Address) -> Self {
        let name = name.into();
        let name = (!name.is_empty()).then_some(name);
        lettre::message::Mailbox::new(name, email).into()
    }

    /// Display name, empty when the mailbox has none.
    pub fn name(&self) -> &str {
        self.0.name.as_deref().unwrap_or_default()
    }

    /// Bare email address.
    pub fn email(&self) -> &str {
        self.0.email.as_ref()
    }

    pub fn address(&self) -> &lettre::Address {
        &self.0.email
    }

    pub fn as_lettre(&self) -> &lettre::message::Mailbox {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Mailbox {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<lettre::message::Mailbox>()
            .map(Self::from)
            .map_err(|e| AddressError::invalid(s, e))
    }
}

impl From<lettre::message::Mailbox> for Mailbox {
    fn from(mut mailbox: lettre::message::Mailbox) -> Self {
        if let Some(name) = mailbox.name.as_mut() {
            *name = fold_line_breaks(name).into_owned();
        }
        Self(mailbox)
    }
}

impl From<Mailbox> for lettre::message::Mailbox {
    fn from(value: Mailbox) -> Self {
        value.0
    }
}

impl From<lettre::Address> for Mailbox {
    fn from(email: lettre::Address) -> Self {
        Self(lettre::message::Mailbox::new(None, email))
    }
}

impl TryFrom<&str> for Mailbox {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Error returned when a mailbox cannot be parsed.
#[derive(Debug)]
pub struct AddressError {
    context: SpanTrace,
    kind: AddressErrorKind,
}

/// Address error kinds.
#[derive(Debug)]
pub enum AddressErrorKind {
    /// The input is not a valid mailbox.
    Invalid {
        input: String,
        source: lettre::address::AddressError,
    },
}

impl AddressError {
    fn invalid(input: &str, source: lettre::address::AddressError) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: AddressErrorKind::Invalid {
                input: input.to_owned(),
                source,
            },
        }
    }

    pub fn kind(&self) -> &AddressErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            AddressErrorKind::Invalid { input, source } => {
                writeln!(f, "Invalid address {input:?}: {source}")
            }
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for AddressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AddressErrorKind::Invalid { source, .. } => Some(source),
        }
    }
}
