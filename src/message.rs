//! Mail object model consumed by the recorder.
//!
//! Outgoing mail comes in two shapes, modelled by [`OutgoingMessage`]:
//!
//! - [`Email`]: a structured message with parsed addresses, subject and body
//! - [`RawMessage`]: an opaque, already rendered message
//!
//! Both carry a mutable [`Headers`] list and render to wire format through
//! [`Display`](std::fmt::Display).

mod headers;
mod mailbox;

use std::borrow::Cow;
use std::fmt::{self, Display, Write as _};

use serde::{Deserialize, Serialize};

pub use headers::{Header, Headers};
pub use mailbox::{AddressError, AddressErrorKind, Mailbox};

const CRLF: &str = "\r\n";

/// Headers an [`Email`] renders from its own fields. Extra headers with these
/// names are never rendered.
const GENERATED_HEADERS: [&str; 8] = [
    "From",
    "Sender",
    "To",
    "Cc",
    "Bcc",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
];

fn is_generated(name: &str) -> bool {
    GENERATED_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// An outgoing message as seen by a "before send" listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// Structured message.
    Email(Email),
    /// Pre-rendered message without parsed fields.
    Raw(RawMessage),
}

impl OutgoingMessage {
    pub fn headers(&self) -> &Headers {
        match self {
            OutgoingMessage::Email(email) => &email.headers,
            OutgoingMessage::Raw(raw) => &raw.headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            OutgoingMessage::Email(email) => &mut email.headers,
            OutgoingMessage::Raw(raw) => &mut raw.headers,
        }
    }

    pub fn as_email(&self) -> Option<&Email> {
        match self {
            OutgoingMessage::Email(email) => Some(email),
            OutgoingMessage::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, OutgoingMessage::Raw(_))
    }

    /// Subject line, empty for raw messages.
    pub fn subject(&self) -> &str {
        self.as_email()
            .and_then(Email::subject)
            .unwrap_or_default()
    }

    /// Body of the header called `name` as it is rendered, or an empty string.
    pub fn header_body(&self, name: &str) -> Cow<'_, str> {
        match self {
            OutgoingMessage::Email(email) => email.header_body(name),
            OutgoingMessage::Raw(raw) => Cow::Borrowed(raw.headers.header_body(name)),
        }
    }

    pub fn from(&self) -> &[Mailbox] {
        self.as_email().map(|e| e.from()).unwrap_or_default()
    }

    pub fn to(&self) -> &[Mailbox] {
        self.as_email().map(Email::to).unwrap_or_default()
    }

    pub fn cc(&self) -> &[Mailbox] {
        self.as_email().map(Email::cc).unwrap_or_default()
    }

    pub fn bcc(&self) -> &[Mailbox] {
        self.as_email().map(Email::bcc).unwrap_or_default()
    }
}

impl From<Email> for OutgoingMessage {
    fn from(value: Email) -> Self {
        OutgoingMessage::Email(value)
    }
}

impl From<RawMessage> for OutgoingMessage {
    fn from(value: RawMessage) -> Self {
        OutgoingMessage::Raw(value)
    }
}

impl Display for OutgoingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutgoingMessage::Email(email) => email.fmt(f),
            OutgoingMessage::Raw(raw) => raw.fmt(f),
        }
    }
}

/// Structured email.
///
/// Built with the `with_*` methods:
///
/// ```rust
/// use sentmail::Email;
///
/// let email = Email::new()
///     .with_from("a@x.com".parse().unwrap())
///     .with_to("b@x.com".parse().unwrap())
///     .with_subject("Hello")
///     .with_text("Hi there");
///
/// assert_eq!(email.subject(), Some("Hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    headers: Headers,
    sender: Option<Mailbox>,
    from: Vec<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    text: Option<String>,
    html: Option<String>,
    boundary: String,
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl Email {
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            sender: None,
            from: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            text: None,
            html: None,
            boundary: format!("=_{}", uuid::Uuid::new_v4().simple()),
        }
    }

    pub fn with_sender(mut self, mailbox: Mailbox) -> Self {
        self.sender = Some(mailbox);
        self
    }

    pub fn with_from(mut self, mailbox: Mailbox) -> Self {
        self.from.push(mailbox);
        self
    }

    pub fn with_to(mut self, mailbox: Mailbox) -> Self {
        self.to.push(mailbox);
        self
    }

    pub fn with_cc(mut self, mailbox: Mailbox) -> Self {
        self.cc.push(mailbox);
        self
    }

    pub fn with_bcc(mut self, mailbox: Mailbox) -> Self {
        self.bcc.push(mailbox);
        self
    }

    /// Set the `Subject` header, replacing any previous one.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.headers.remove("Subject");
        self.headers.add_text_header("Subject", subject);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Append a header. `Subject` replaces the subject; address and MIME
    /// headers come from the structured fields and are ignored here.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case("Subject") {
            return self.with_subject(value);
        }
        if is_generated(&name) {
            tracing::warn!(header = %name, "Ignoring header set outside its structured field");
            return self;
        }
        self.headers.add_text_header(name, value);
        self
    }

    /// Subject and extra headers. Address and MIME headers are rendered from
    /// the structured fields, see [`header_body`](Self::header_body).
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn sender(&self) -> Option<&Mailbox> {
        self.sender.as_ref()
    }

    pub fn from(&self) -> &[Mailbox] {
        &self.from
    }

    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    pub fn bcc(&self) -> &[Mailbox] {
        &self.bcc
    }

    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject")
    }

    /// Body of the header called `name` as it is rendered, or an empty string.
    ///
    /// Address headers are answered from the structured fields. `Bcc` is
    /// answered too, although it is never rendered.
    pub fn header_body(&self, name: &str) -> Cow<'_, str> {
        let mailboxes = match name.to_ascii_lowercase().as_str() {
            "from" => &self.from[..],
            "sender" => self.sender.as_slice(),
            "to" => &self.to[..],
            "cc" => &self.cc[..],
            "bcc" => &self.bcc[..],
            _ => return Cow::Borrowed(self.headers.header_body(name)),
        };
        Cow::Owned(join_mailboxes(mailboxes))
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    fn write_body(&self, out: &mut String) -> fmt::Result {
        match (&self.text, &self.html) {
            (Some(text), Some(html)) => {
                let boundary = &self.boundary;
                write!(
                    out,
                    "Content-Type: multipart/alternative; boundary={boundary}{CRLF}{CRLF}"
                )?;
                write!(out, "--{boundary}{CRLF}")?;
                write_part(out, "text/plain", text)?;
                write!(out, "{CRLF}--{boundary}{CRLF}")?;
                write_part(out, "text/html", html)?;
                write!(out, "{CRLF}--{boundary}--{CRLF}")
            }
            (None, Some(html)) => write_part(out, "text/html", html),
            (text, None) => write_part(out, "text/plain", text.as_deref().unwrap_or_default()),
        }
    }
}

fn write_part(out: &mut String, content_type: &str, body: &str) -> fmt::Result {
    write!(out, "Content-Type: {content_type}; charset=utf-8{CRLF}")?;
    write!(out, "Content-Transfer-Encoding: 8bit{CRLF}{CRLF}")?;
    out.write_str(body)
}

fn join_mailboxes(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(Mailbox::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_address_header(out: &mut String, name: &str, mailboxes: &[Mailbox]) -> fmt::Result {
    if mailboxes.is_empty() {
        return Ok(());
    }
    write!(out, "{name}: {}{CRLF}", join_mailboxes(mailboxes))
}

/// Wire format. `Bcc` is never rendered.
impl Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();

        write_address_header(&mut out, "From", &self.from)?;
        if let Some(sender) = &self.sender {
            write!(out, "Sender: {sender}{CRLF}")?;
        }
        write_address_header(&mut out, "To", &self.to)?;
        write_address_header(&mut out, "Cc", &self.cc)?;
        for header in self.headers.iter().filter(|h| !is_generated(&h.name)) {
            write!(out, "{header}{CRLF}")?;
        }
        write!(out, "MIME-Version: 1.0{CRLF}")?;
        self.write_body(&mut out)?;

        f.write_str(&out)
    }
}

/// Pre-rendered message.
///
/// Headers added through [`headers_mut`](Self::headers_mut) are rendered in
/// front of the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    headers: Headers,
    text: String,
}

impl RawMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            headers: Headers::new(),
            text: text.into(),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for header in &self.headers {
            write!(f, "{header}{CRLF}")?;
        }
        f.write_str(&self.text)
    }
}
