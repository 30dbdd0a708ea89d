//! `application/x-www-form-urlencoded` payloads.
//!
//! A form is a flat object of scalars. Decoding yields a json object whose
//! values are all strings; when a name repeats, its first value wins. Encoding
//! accepts objects whose members are strings, numbers, booleans or null, the
//! latter rendered as an empty value.

use crate::error::SerializeError;
use crate::serializer::{Serializer, deserialize_primitive, serialize_primitive};
use crate::value::{ParamType, Value};
use serde_json::Map;

#[derive(Debug, Clone, Copy, Default)]
pub struct FormSerializer;

impl Serializer for FormSerializer {
    fn deserialize(&self, raw: &str, target: ParamType) -> Result<Value, SerializeError> {
        if let Some(value) = deserialize_primitive(raw, target) {
            return value;
        }

        if raw.trim().is_empty() {
            return Ok(Value::Absent);
        }

        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(raw)?;
        let mut object = Map::new();
        for (name, value) in pairs {
            object.entry(name).or_insert(serde_json::Value::String(value));
        }
        Ok(Value::Structured(serde_json::Value::Object(object)))
    }

    fn serialize(&self, value: Value) -> Result<String, SerializeError> {
        let object = match serialize_primitive(value) {
            Ok(raw) => return Ok(raw),
            Err(structured) => match structured.into_json() {
                serde_json::Value::Object(object) => object,
                other => return Err(SerializeError::unsupported(format!("form payload must be an object, got {other}"))),
            },
        };

        let pairs = object
            .into_iter()
            .map(|(name, value)| Ok((name, form_scalar(value)?)))
            .collect::<Result<Vec<_>, SerializeError>>()?;
        Ok(serde_urlencoded::to_string(pairs)?)
    }
}

fn form_scalar(value: serde_json::Value) -> Result<String, SerializeError> {
    match value {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        nested => Err(SerializeError::unsupported(format!("form values must be scalars, got {nested}"))),
    }
}
