//! Typed values exchanged between serializers and handlers.
//!
//! A handler's formal parameter types are declared up front as [`ParamType`]s,
//! so the dispatch pipeline never needs to inspect Rust types at runtime.
//! Serializers turn raw request strings into [`Value`]s of the declared type,
//! and [`FromValue`] / [`IntoValue`] bridge those values to ordinary Rust
//! argument and return types.

use crate::error::{ArgumentError, SerializeError};
use crate::serializer::format_date_time;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::SystemTime;

/// The declared type of a handler's formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Text,
    Bool,
    /// Signed 64-bit; unsigned values above `i64::MAX` are out of range.
    Integer,
    Float,
    DateTime,
    Structured,
    /// The fully erased top type, as declared by generic bridge handlers.
    Any,
}

impl ParamType {
    /// Primitive-like types bypass the structured codec.
    #[inline]
    pub fn is_primitive(self) -> bool {
        matches!(self, ParamType::Text | ParamType::Bool | ParamType::Integer | ParamType::Float | ParamType::DateTime)
    }

    #[inline]
    pub fn is_erased(self) -> bool {
        self == ParamType::Any
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    DateTime(SystemTime),
    Structured(serde_json::Value),
}

impl Value {
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::DateTime(_) => "date-time",
            Value::Structured(_) => "structured",
        }
    }

    /// Lowers any value into its json representation.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Absent => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s),
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::DateTime(t) => serde_json::Value::String(format_date_time(t)),
            Value::Structured(v) => v,
        }
    }
}

/// Wraps a structured argument or return value that goes through the structured codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

/// Conversion from a deserialized [`Value`] into a handler argument.
///
/// Every integer type goes through [`Value::Integer`], so an unsigned
/// argument accepts at most `i64::MAX`.
pub trait FromValue: Sized {
    /// The formal type this argument declares.
    fn param_type() -> ParamType;

    fn from_value(value: Value) -> Result<Self, ArgumentError>;
}

/// Conversion from a handler's return value into a [`Value`].
///
/// Returning a `u64` or `usize` above `i64::MAX` fails with
/// [`SerializeError::Unsupported`].
pub trait IntoValue {
    fn into_value(self) -> Result<Value, SerializeError>;
}

impl FromValue for String {
    fn param_type() -> ParamType {
        ParamType::Text
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Absent => Err(ArgumentError::missing(ParamType::Text)),
            other => Err(ArgumentError::mismatch(ParamType::Text, other.kind())),
        }
    }
}

impl FromValue for bool {
    fn param_type() -> ParamType {
        ParamType::Bool
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Absent => Err(ArgumentError::missing(ParamType::Bool)),
            other => Err(ArgumentError::mismatch(ParamType::Bool, other.kind())),
        }
    }
}

macro_rules! impl_integer_value {
    ($($ty:ty)*) => {
        $(
        impl FromValue for $ty {
            fn param_type() -> ParamType {
                ParamType::Integer
            }

            fn from_value(value: Value) -> Result<Self, ArgumentError> {
                match value {
                    Value::Integer(i) => <$ty>::try_from(i)
                        .map_err(|_| ArgumentError::OutOfRange { value: i, target: stringify!($ty) }),
                    Value::Absent => Err(ArgumentError::missing(ParamType::Integer)),
                    other => Err(ArgumentError::mismatch(ParamType::Integer, other.kind())),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Result<Value, SerializeError> {
                i64::try_from(self)
                    .map(Value::Integer)
                    .map_err(|_| SerializeError::unsupported(format!("{} exceeds the integer range", self)))
            }
        }
        )*
    };
}

impl_integer_value! { i8 i16 i32 i64 isize u8 u16 u32 u64 usize }

impl FromValue for f64 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    #[allow(clippy::cast_precision_loss, reason = "integers are accepted wherever floats are declared")]
    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            Value::Absent => Err(ArgumentError::missing(ParamType::Float)),
            other => Err(ArgumentError::mismatch(ParamType::Float, other.kind())),
        }
    }
}

impl FromValue for f32 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    #[allow(clippy::cast_possible_truncation, reason = "narrowing is the caller's declared intent")]
    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(Value::Float(self))
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(Value::Float(f64::from(self)))
    }
}

impl FromValue for SystemTime {
    fn param_type() -> ParamType {
        ParamType::DateTime
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::DateTime(t) => Ok(t),
            Value::Absent => Err(ArgumentError::missing(ParamType::DateTime)),
            other => Err(ArgumentError::mismatch(ParamType::DateTime, other.kind())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn param_type() -> ParamType {
        T::param_type()
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Absent => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn param_type() -> ParamType {
        ParamType::Structured
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Absent => Err(ArgumentError::missing(ParamType::Structured)),
            value => Ok(Json(serde_json::from_value(value.into_json())?)),
        }
    }
}

/// `serde_json::Value` arguments declare the erased top type and accept anything.
impl FromValue for serde_json::Value {
    fn param_type() -> ParamType {
        ParamType::Any
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        Ok(value.into_json())
    }
}

impl FromValue for Value {
    fn param_type() -> ParamType {
        ParamType::Any
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        Ok(value)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(Value::Text(self))
    }
}

impl IntoValue for &'static str {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(Value::Text(self.to_owned()))
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(Value::Bool(self))
    }
}

impl IntoValue for SystemTime {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(Value::DateTime(self))
    }
}

impl IntoValue for () {
    fn into_value(self) -> Result<Value, SerializeError> {
        Ok(Value::Absent)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Result<Value, SerializeError> {
        match self {
            Some(t) => t.into_value(),
            None => Ok(Value::Absent),
        }
    }
}

impl<T: Serialize> IntoValue for Json<T> {
    fn into_value(self) -> Result<Value, SerializeError> {
        serde_json::to_value(self.0)?.into_value()
    }
}

impl IntoValue for serde_json::Value {
    fn into_value(self) -> Result<Value, SerializeError> {
        match self {
            serde_json::Value::Null => Ok(Value::Absent),
            value => Ok(Value::Structured(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::time::{Duration, UNIX_EPOCH};

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn primitive_param_types() {
        assert!(ParamType::Text.is_primitive());
        assert!(ParamType::DateTime.is_primitive());
        assert!(!ParamType::Structured.is_primitive());
        assert!(!ParamType::Any.is_primitive());
        assert!(ParamType::Any.is_erased());
    }

    #[test]
    fn declared_types_follow_rust_types() {
        assert_eq!(String::param_type(), ParamType::Text);
        assert_eq!(u16::param_type(), ParamType::Integer);
        assert_eq!(f32::param_type(), ParamType::Float);
        assert_eq!(Option::<bool>::param_type(), ParamType::Bool);
        assert_eq!(Json::<Item>::param_type(), ParamType::Structured);
        assert_eq!(serde_json::Value::param_type(), ParamType::Any);
    }

    #[test]
    fn integer_out_of_range() {
        let err = u8::from_value(Value::Integer(300)).unwrap_err();
        assert!(matches!(err, ArgumentError::OutOfRange { value: 300, target: "u8" }));
    }

    #[test]
    fn unsigned_values_above_i64_range() {
        assert!(matches!(u64::MAX.into_value(), Err(SerializeError::Unsupported { .. })));
        assert_eq!(u64::from_value(Value::Integer(i64::MAX)).unwrap(), 9_223_372_036_854_775_807);

        let raw = u64::MAX.to_string();
        let parsed = crate::serializer::deserialize_primitive(&raw, ParamType::Integer);
        assert!(matches!(parsed, Some(Err(SerializeError::Primitive { .. }))));
    }

    #[test]
    fn absent_becomes_none_or_missing() {
        assert_eq!(Option::<i32>::from_value(Value::Absent).unwrap(), None);
        assert!(matches!(i32::from_value(Value::Absent), Err(ArgumentError::Missing { .. })));
        assert!(matches!(String::from_value(Value::Bool(true)), Err(ArgumentError::Mismatch { actual: "bool", .. })));
    }

    #[test]
    fn structured_argument() {
        let value = Value::Structured(serde_json::json!({"name": "x"}));
        let Json(item) = Json::<Item>::from_value(value).unwrap();
        assert_eq!(item, Item { name: "x".into() });
    }

    #[test]
    fn return_values() {
        assert_eq!(Json(Item { name: "y".into() }).into_value().unwrap(), Value::Structured(serde_json::json!({"name": "y"})));
        assert_eq!(serde_json::Value::Null.into_value().unwrap(), Value::Absent);
        assert_eq!(().into_value().unwrap(), Value::Absent);
        assert_eq!(Some(7_u32).into_value().unwrap(), Value::Integer(7));
        assert!(u64::MAX.into_value().is_err());
    }

    #[test]
    fn date_time_lowers_to_rfc3339() {
        let t = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(Value::DateTime(t).into_json(), serde_json::json!("1994-11-06T08:49:37.000000000Z"));
    }
}
