use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Ordered collection of message headers.
///
/// Headers keep their insertion order and several headers may share a name.
/// Names are compared ASCII case-insensitively, as mail headers are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(Vec<Header>);

/// A single `name: value` header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text header. Existing headers with the same name are kept.
    ///
    /// Line breaks in the name or value are folded into spaces.
    pub fn add_text_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.0.push(Header {
            name: fold_line_breaks(&name).into_owned(),
            value: fold_line_breaks(&value).into_owned(),
        });
    }

    /// Remove every header called `name`.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|h| !h.name.eq_ignore_ascii_case(name));
    }

    /// Value of the first header called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Values of all headers called `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.0
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Body of the first header called `name`, or an empty string.
    pub fn header_body(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Join the lines of `value` with single spaces, so it fits on one header line.
pub(crate) fn fold_line_breaks(value: &str) -> Cow<'_, str> {
    if !value.contains(['\r', '\n']) {
        return Cow::Borrowed(value);
    }
    let lines: Vec<&str> = value
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .collect();
    Cow::Owned(lines.join(" "))
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}
