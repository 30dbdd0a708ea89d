//! Error types for every stage of the dispatch pipeline.
//!
//! Each concern owns its own enum and they are folded into [`DispatchError`]
//! at the transport boundary, where every fatal condition becomes a single
//! internal-error response.

use crate::value::ParamType;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use std::error::Error;
use std::fmt;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("serialize error: {source}")]
    Serialize {
        #[from]
        source: SerializeError,
    },

    #[error("handler error: {source}")]
    Handler {
        #[from]
        source: HandlerError,
    },

    #[error("service provider error: {source}")]
    Provider {
        #[from]
        source: ProviderError,
    },

    #[error("response error: {source}")]
    Response {
        #[from]
        source: http::Error,
    },
}

impl DispatchError {
    /// Every dispatch failure is fatal for the current request.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn into_response(self) -> Response<String> {
        text_response(self.status_code(), "internal server error")
    }
}

/// A `text/plain` response for the pipeline's own answers.
pub(crate) fn text_response(status: StatusCode, body: &'static str) -> Response<String> {
    let mut response = Response::new(String::from(body));
    *response.status_mut() = status;
    if let Ok(content_type) = HeaderValue::from_str(mime::TEXT_PLAIN_UTF_8.as_ref()) {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

/// Which side of the exchange a serializer was resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => f.write_str("request"),
            Direction::Response => f.write_str("response"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("resolved argument count does not match: {resolved}, expected: {expected}")]
    ArgumentCount { resolved: usize, expected: usize },

    #[error("{direction} serializer for mime type {mime_type} not found")]
    MissingSerializer { direction: Direction, mime_type: String },

    #[error("no execution strategy can handle {handler}")]
    NoStrategy { handler: String },
}

impl ConfigError {
    pub fn argument_count(resolved: usize, expected: usize) -> Self {
        Self::ArgumentCount { resolved, expected }
    }

    pub fn missing_serializer<S: ToString>(direction: Direction, mime_type: S) -> Self {
        Self::MissingSerializer { direction, mime_type: mime_type.to_string() }
    }

    pub fn no_strategy<S: ToString>(handler: S) -> Self {
        Self::NoStrategy { handler: handler.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("can't parse '{raw}' as {target:?}: {reason}")]
    Primitive { target: ParamType, raw: String, reason: String },

    #[error("malformed json payload: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("malformed form payload: {source}")]
    FormDecode {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("can't encode form payload: {source}")]
    FormEncode {
        #[from]
        source: serde_urlencoded::ser::Error,
    },

    #[error("unsupported value: {reason}")]
    Unsupported { reason: String },
}

impl SerializeError {
    pub fn primitive<R: ToString, S: ToString>(target: ParamType, raw: R, reason: S) -> Self {
        Self::Primitive { target, raw: raw.to_string(), reason: reason.to_string() }
    }

    pub fn unsupported<S: ToString>(reason: S) -> Self {
        Self::Unsupported { reason: reason.to_string() }
    }
}

/// Conversion failure between a [`Value`](crate::Value) and a handler's Rust argument type.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("missing value for {expected:?} argument")]
    Missing { expected: ParamType },

    #[error("expected {expected:?} argument, found {actual}")]
    Mismatch { expected: ParamType, actual: &'static str },

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("can't convert structured argument: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl ArgumentError {
    pub fn missing(expected: ParamType) -> Self {
        Self::Missing { expected }
    }

    pub fn mismatch(expected: ParamType, actual: &'static str) -> Self {
        Self::Mismatch { expected, actual }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{reason}")]
    Failed { reason: String },

    #[error("{source}")]
    Custom { source: Box<dyn Error + Send + Sync> },

    #[error("invalid argument: {source}")]
    Argument {
        #[from]
        source: ArgumentError,
    },

    #[error("can't convert return value: {source}")]
    Reply {
        #[from]
        source: SerializeError,
    },

    #[error("handler panicked: {message}")]
    Panicked { message: String },

    #[error("service instance is not a {expected}")]
    ServiceMismatch { expected: &'static str },

    #[error("background execution was cancelled")]
    Cancelled,

    #[error("no async runtime available for background execution")]
    NoRuntime,
}

impl HandlerError {
    pub fn failed<S: ToString>(reason: S) -> Self {
        Self::Failed { reason: reason.to_string() }
    }

    pub fn custom<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Custom { source: e.into() }
    }

    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("unknown panic payload"));
        Self::Panicked { message }
    }
}

impl From<String> for HandlerError {
    fn from(reason: String) -> Self {
        Self::Failed { reason }
    }
}

impl From<&str> for HandlerError {
    fn from(reason: &str) -> Self {
        Self::failed(reason)
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no instance registered for service {service}")]
    Unknown { service: String },

    #[error("can't provide service {service}: {reason}")]
    Failed { service: String, reason: String },
}

impl ProviderError {
    pub fn unknown<S: ToString>(service: S) -> Self {
        Self::Unknown { service: service.to_string() }
    }

    pub fn failed<S: ToString, R: ToString>(service: S, reason: R) -> Self {
        Self::Failed { service: service.to_string(), reason: reason.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid query string: {source}")]
    InvalidQuery {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("request body is not utf8: {source}")]
    InvalidBody {
        #[from]
        source: FromUtf8Error,
    },
}

/// A path template that can't be compiled into a route.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unbalanced braces or invalid placeholder in {template}")]
    Syntax { template: String },

    #[error("can't route {template}: {source}")]
    Insert {
        template: String,
        #[source]
        source: matchit::InsertError,
    },
}

impl TemplateError {
    pub fn syntax<S: ToString>(template: S) -> Self {
        Self::Syntax { template: template.to_string() }
    }

    pub fn insert<S: ToString>(template: S, source: matchit::InsertError) -> Self {
        Self::Insert { template: template.to_string(), source }
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("route table must be set")]
    MissingRouteTable,
    #[error("service provider must be set")]
    MissingServiceProvider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payload_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = HandlerError::panicked(payload.as_ref());
        assert_eq!(err.to_string(), "handler panicked: boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        let err = HandlerError::panicked(payload.as_ref());
        assert_eq!(err.to_string(), "handler panicked: owned boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        let err = HandlerError::panicked(payload.as_ref());
        assert_eq!(err.to_string(), "handler panicked: unknown panic payload");
    }

    #[test]
    fn every_dispatch_error_is_internal() {
        let err: DispatchError = ConfigError::argument_count(1, 2).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], mime::TEXT_PLAIN_UTF_8.as_ref());
        assert_eq!(response.body(), "internal server error");
    }

    #[test]
    fn missing_serializer_message() {
        let err = ConfigError::missing_serializer(Direction::Response, "text/xml");
        assert_eq!(err.to_string(), "response serializer for mime type text/xml not found");
    }
}
