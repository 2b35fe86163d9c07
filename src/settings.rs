//! Mail transport settings and their redacted snapshot.
//!
//! The recorder stores a copy of the mail configuration with every audit
//! row. Before that happens the configuration goes through [`redact`]:
//!
//! 1. every key listed in [`SENSITIVE_KEYS`] is overwritten with [`MASK`],
//!    at any depth
//! 2. every object level is sorted by key in natural, case-insensitive order
//!
//! Redacting an already redacted tree yields the same tree.

use std::{cmp::Ordering, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing_error::SpanTrace;

/// Replacement value for sensitive settings.
pub const MASK: &str = "******";

/// Setting keys whose values never reach the audit table.
pub const SENSITIVE_KEYS: [&str; 5] = [
    "dsn",
    "transport_smtp_encrypt",
    "transport_smtp_password",
    "transport_smtp_server",
    "transport_smtp_username",
];

/// Mail transport configuration tree.
///
/// ```rust
/// use sentmail::MailSettings;
///
/// let settings = MailSettings::from_toml_str(r#"
///     transport = "smtp"
///     transport_smtp_password = "hunter2"
/// "#).unwrap();
///
/// let redacted = settings.redacted();
/// assert_eq!(redacted["transport_smtp_password"], "******");
/// assert_eq!(redacted["transport"], "smtp");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailSettings(Map<String, Value>);

impl MailSettings {
    /// Empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON object.
    pub fn from_json_str(s: &str) -> Result<Self, SettingsError> {
        let map = serde_json::from_str(s).map_err(SettingsError::json)?;
        Ok(Self(map))
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        let map = toml::from_str(s).map_err(SettingsError::toml)?;
        Ok(Self(map))
    }

    /// Load settings from a `.toml` or `.json` file.
    ///
    /// Files without a `.json` extension are read as TOML.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(SettingsError::io)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    /// Top-level setting called `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unredacted settings tree.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Masked and key-sorted copy of the settings.
    pub fn redacted(&self) -> Value {
        redact(Value::Object(self.0.clone()))
    }
}

impl From<Map<String, Value>> for MailSettings {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl TryFrom<Value> for MailSettings {
    type Error = SettingsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(SettingsError::not_an_object()),
        }
    }
}

/// Mask sensitive keys anywhere in `value`, then sort every object by key.
pub fn redact(mut value: Value) -> Value {
    mask_sensitive(&mut value);
    sort_keys(&mut value);
    value
}

fn mask_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if SENSITIVE_KEYS.contains(&key.as_str()) {
                    *value = Value::String(MASK.to_owned());
                } else {
                    mask_sensitive(value);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_sensitive),
        _ => {}
    }
}

fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| natural_cmp(a, b));
            for (_, value) in entries.iter_mut() {
                sort_keys(value);
            }
            *map = entries.into_iter().collect();
        }
        Value::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {}
    }
}

/// Natural, case-insensitive string order: digit runs compare by numeric
/// value, so `item2` sorts before `item10`.
///
/// Strings that only differ in case or leading zeros fall back to byte order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut x, mut y) = (a.as_bytes(), b.as_bytes());

    loop {
        match (x.first(), y.first()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(c), Some(d)) if c.is_ascii_digit() && d.is_ascii_digit() => {
                let (n1, rest1) = split_digits(x);
                let (n2, rest2) = split_digits(y);
                match cmp_digits(n1, n2) {
                    Ordering::Equal => (x, y) = (rest1, rest2),
                    ord => return ord,
                }
            }
            (Some(c), Some(d)) => match c.to_ascii_lowercase().cmp(&d.to_ascii_lowercase()) {
                Ordering::Equal => (x, y) = (&x[1..], &y[1..]),
                ord => return ord,
            },
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn cmp_digits(a: &[u8], b: &[u8]) -> Ordering {
    let trim = |s: &[u8]| -> usize { s.iter().take_while(|c| **c == b'0').count() };
    let (a, b) = (&a[trim(a)..], &b[trim(b)..]);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Error returned when settings cannot be loaded.
#[derive(Debug)]
pub struct SettingsError {
    context: SpanTrace,
    kind: SettingsErrorKind,
}

/// Settings error kinds.
#[derive(Debug)]
pub enum SettingsErrorKind {
    Io(std::io::Error),
    Json(serde_json::Error),
    Toml(toml::de::Error),
    /// The settings root is not a key/value table.
    NotAnObject,
}

impl SettingsError {
    fn new(kind: SettingsErrorKind) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind,
        }
    }

    fn io(err: std::io::Error) -> Self {
        Self::new(SettingsErrorKind::Io(err))
    }

    fn json(err: serde_json::Error) -> Self {
        Self::new(SettingsErrorKind::Json(err))
    }

    fn toml(err: toml::de::Error) -> Self {
        Self::new(SettingsErrorKind::Toml(err))
    }

    fn not_an_object() -> Self {
        Self::new(SettingsErrorKind::NotAnObject)
    }

    pub fn kind(&self) -> &SettingsErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SettingsErrorKind::Io(err) => writeln!(f, "IO error: {err}"),
            SettingsErrorKind::Json(err) => writeln!(f, "JSON error: {err}"),
            SettingsErrorKind::Toml(err) => writeln!(f, "TOML error: {err}"),
            SettingsErrorKind::NotAnObject => writeln!(f, "Settings root must be a table"),
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SettingsErrorKind::Io(err) => Some(err),
            SettingsErrorKind::Json(err) => Some(err),
            SettingsErrorKind::Toml(err) => Some(err),
            SettingsErrorKind::NotAnObject => None,
        }
    }
}
