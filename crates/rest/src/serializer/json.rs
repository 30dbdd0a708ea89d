use crate::error::SerializeError;
use crate::serializer::{Serializer, deserialize_primitive, serialize_primitive};
use crate::value::{ParamType, Value};

/// `application/json`, backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn deserialize(&self, raw: &str, target: ParamType) -> Result<Value, SerializeError> {
        if let Some(value) = deserialize_primitive(raw, target) {
            return value;
        }

        if raw.trim().is_empty() {
            return Ok(Value::Absent);
        }

        match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Null => Ok(Value::Absent),
            json => Ok(Value::Structured(json)),
        }
    }

    fn serialize(&self, value: Value) -> Result<String, SerializeError> {
        match serialize_primitive(value) {
            Ok(raw) => Ok(raw),
            Err(structured) => Ok(serde_json::to_string(&structured.into_json())?),
        }
    }
}
