//! Schema-less event records.
//!
//! [`Msg`] is the single record shape used across cqbridge: it is what
//! subscribers receive, what the message store persists, and what structured
//! error payloads look like. No schema is enforced here; the producer of a
//! record decides which fields it carries.
//!
//! # Example
//!
//! ```rust,ignore
//! use cqbridge_core::Msg;
//!
//! let mut event = Msg::new();
//! event.insert("post_type", "notice");
//! event.insert("group_id", 10001);
//! assert_eq!(event.get_i64("group_id"), Some(10001));
//! ```

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A mapping from field names to arbitrary JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Msg(Map<String, Value>);

impl Msg {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Inserts a field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Adds a field (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns a field as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns a field as an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Returns a nested record.
    pub fn get_msg(&self, key: &str) -> Option<Msg> {
        match self.0.get(key) {
            Some(Value::Object(map)) => Some(Msg(map.clone())),
            _ => None,
        }
    }

    /// Builds a success payload wrapping `data`.
    pub fn ok(data: impl Into<Value>) -> Self {
        Self::new()
            .with("status", "ok")
            .with("retcode", 0)
            .with("data", data)
    }

    /// Builds a structured failure payload.
    ///
    /// `kind` is a stable symbolic error name (e.g. `MEMBER_NOT_FOUND`) and
    /// `wording` a human-readable description.
    pub fn failed(code: i64, kind: &str, wording: impl Into<String>) -> Self {
        Self::new()
            .with("status", "failed")
            .with("retcode", code)
            .with("msg", kind)
            .with("wording", wording.into())
            .with("data", Value::Null)
    }

    /// Returns `true` if this record is a failure payload.
    pub fn is_failed(&self) -> bool {
        self.get_str("status") == Some("failed")
    }

    /// Renders the record as compact JSON text.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Consumes the record, returning it as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Consumes the record, returning the inner map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Msg {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Msg {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Msg {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Msg> for Value {
    fn from(msg: Msg) -> Self {
        msg.into_value()
    }
}

impl TryFrom<Value> for Msg {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}
