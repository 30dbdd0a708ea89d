//! Wire codecs keyed by MIME type.
//!
//! A [`Serializer`] converts between a raw string payload and a typed
//! [`Value`]. Primitive-like targets bypass the structured codec and share the
//! rules in this module:
//!
//! - text passes through unchanged, the empty string included
//! - any other primitive is parsed from the non-empty string; the empty
//!   string deserializes to [`Value::Absent`]
//! - booleans accept `true` / `false` in any case
//! - date/time values render as RFC 3339 in UTC with nanosecond precision;
//!   parsing also accepts the HTTP-date format
//!
//! Rendering mirrors the split. Primitives render through their natural string
//! form and an absent value renders as the empty string, never as a null
//! literal.

mod form;
mod json;

pub use form::FormSerializer;
pub use json::JsonSerializer;

use crate::error::SerializeError;
use crate::value::{ParamType, Value};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

pub trait Serializer: Send + Sync {
    /// Converts `raw` into a value of the declared `target` type.
    fn deserialize(&self, raw: &str, target: ParamType) -> Result<Value, SerializeError>;

    /// Renders `value` as a wire payload.
    fn serialize(&self, value: Value) -> Result<String, SerializeError>;
}

/// Deserializes a primitive-like target, returning `None` for structured and erased targets.
pub fn deserialize_primitive(raw: &str, target: ParamType) -> Option<Result<Value, SerializeError>> {
    let value = match target {
        ParamType::Structured | ParamType::Any => return None,
        ParamType::Text => Ok(Value::Text(raw.to_owned())),
        _ if raw.is_empty() => Ok(Value::Absent),
        ParamType::Bool => parse_bool(raw).map(Value::Bool),
        ParamType::Integer => raw.parse::<i64>().map(Value::Integer).map_err(|e| SerializeError::primitive(target, raw, e)),
        ParamType::Float => raw.parse::<f64>().map(Value::Float).map_err(|e| SerializeError::primitive(target, raw, e)),
        ParamType::DateTime => parse_date_time(raw).map(Value::DateTime),
    };
    Some(value)
}

/// Renders a primitive-like value, returning the value back when it is structured.
pub fn serialize_primitive(value: Value) -> Result<String, Value> {
    match value {
        Value::Absent | Value::Structured(serde_json::Value::Null) => Ok(String::new()),
        Value::Text(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::DateTime(t) => Ok(format_date_time(t)),
        structured @ Value::Structured(_) => Err(structured),
    }
}

pub(crate) fn format_date_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_date_time(raw: &str) -> Result<SystemTime, SerializeError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(time) => Ok(SystemTime::from(time)),
        Err(e) => httpdate::parse_http_date(raw)
            .ok()
            .ok_or_else(|| SerializeError::primitive(ParamType::DateTime, raw, e)),
    }
}

fn parse_bool(raw: &str) -> Result<bool, SerializeError> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(SerializeError::primitive(ParamType::Bool, raw, "expected true or false"))
    }
}

/// The registry of serializers, keyed by lowercased MIME type.
#[derive(Clone)]
pub struct Serializers {
    inner: HashMap<String, Arc<dyn Serializer>>,
}

impl Serializers {
    pub fn builder() -> SerializersBuilder {
        SerializersBuilder::new()
    }

    /// A registry with only the json serializer.
    pub fn default_json() -> Self {
        Self::builder().register(mime::APPLICATION_JSON.as_ref(), JsonSerializer).build()
    }

    pub fn resolve(&self, mime_type: &str) -> Option<&Arc<dyn Serializer>> {
        self.inner.get(&mime_type.to_ascii_lowercase())
    }

    pub fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }
}

/// Registers json and form serializers.
impl Default for Serializers {
    fn default() -> Self {
        Self::builder()
            .register(mime::APPLICATION_JSON.as_ref(), JsonSerializer)
            .register(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(), FormSerializer)
            .build()
    }
}

impl fmt::Debug for Serializers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.keys()).finish()
    }
}

pub struct SerializersBuilder {
    inner: HashMap<String, Arc<dyn Serializer>>,
}

impl fmt::Debug for SerializersBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.keys()).finish()
    }
}

impl SerializersBuilder {
    fn new() -> Self {
        Self { inner: HashMap::new() }
    }

    /// Registers `serializer` for `mime_type`, replacing any earlier registration.
    pub fn register<S: Serializer + 'static>(mut self, mime_type: impl AsRef<str>, serializer: S) -> Self {
        self.inner.insert(mime_type.as_ref().to_ascii_lowercase(), Arc::new(serializer));
        self
    }

    pub fn build(self) -> Serializers {
        Serializers { inner: self.inner }
    }
}
