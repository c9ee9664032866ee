//! Response types.
//!
//! - [`OperationResponse`] - what a handler or the error classifier produces
//! - [`HttpResponse`] - the finalized `(status, headers, body)` handed to a transport
//! - [`Headers`] - ordered header map whose values may be newline-joined

use bytes::Bytes;
use http::{StatusCode, Version};
use serde_json::Value;

/// The outcome of an operation: a status and a structured body.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResponse {
    status: StatusCode,
    body: Value,
}

impl OperationResponse {
    /// Create a response with an explicit status.
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `200 OK` with the given body.
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// `201 Created` with the given body.
    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, Value::Null)
    }

    /// The status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The structured body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Split into status and body.
    pub fn into_parts(self) -> (StatusCode, Value) {
        (self.status, self.body)
    }
}

/// Ordered, case-insensitive header map.
///
/// A value may hold several newline-joined entries; transports emit each entry
/// as its own header line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Add a value, joining it to any existing one with a newline.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => {
                let existing = &mut self.entries[index].1;
                existing.push('\n');
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// The (possibly newline-joined) value of a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.entries[index].1.as_str())
    }

    /// Whether a header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterate over `(name, value)` pairs as stored.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Iterate over header lines, one per newline-separated value.
    pub fn lines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(n, v)| v.split('\n').map(move |line| (n.as_str(), line)))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no header is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// A finalized response, ready to be written once to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Protocol version used for the status line.
    pub version: Version,
    /// Numeric status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: Headers,
    /// Encoded body.
    pub body: Bytes,
}

impl HttpResponse {
    /// The body as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
