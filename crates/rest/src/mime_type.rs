//! Single-header content negotiation.
//!
//! The request MIME type comes from `Content-Type` and the response MIME type
//! from `Accept`. Only the first media range is looked at: parameters after
//! `;` are dropped, so `application/json; charset=utf-8` resolves to
//! `application/json`, and an `Accept` list is not ranked.

use http::HeaderMap;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderName};

const WILDCARD: &str = "*/*";

/// The MIME type the request body is encoded with.
pub fn request_mime_type(headers: &HeaderMap, default_mime_type: &str) -> String {
    header_mime_type(headers, CONTENT_TYPE).unwrap_or_else(|| default_mime_type.to_owned())
}

/// The MIME type the response body will be encoded with. A wildcard accept
/// falls back to the default.
pub fn response_mime_type(headers: &HeaderMap, default_mime_type: &str) -> String {
    header_mime_type(headers, ACCEPT)
        .filter(|mime_type| mime_type != WILDCARD)
        .unwrap_or_else(|| default_mime_type.to_owned())
}

fn header_mime_type(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    let mime_type = value.split([';', ',']).next().unwrap_or_default().trim();
    if mime_type.is_empty() { None } else { Some(mime_type.to_ascii_lowercase()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const DEFAULT: &str = "application/json";

    fn headers(name: HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn parameters_are_stripped() {
        let headers = headers(CONTENT_TYPE, "application/x-www-form-urlencoded ; charset=UTF-8");
        assert_eq!(request_mime_type(&headers, DEFAULT), "application/x-www-form-urlencoded");
    }

    #[test]
    fn absent_or_empty_header_uses_default() {
        assert_eq!(request_mime_type(&HeaderMap::new(), DEFAULT), DEFAULT);
        assert_eq!(response_mime_type(&HeaderMap::new(), DEFAULT), DEFAULT);
        assert_eq!(request_mime_type(&headers(CONTENT_TYPE, " ; charset=utf-8"), DEFAULT), DEFAULT);
    }

    #[test]
    fn wildcard_accept_uses_default() {
        assert_eq!(response_mime_type(&headers(ACCEPT, "*/*"), DEFAULT), DEFAULT);
        assert_eq!(response_mime_type(&headers(ACCEPT, "*/*; q=0.8"), DEFAULT), DEFAULT);
    }

    #[test]
    fn first_accepted_media_range_wins() {
        let headers = headers(ACCEPT, "application/x-www-form-urlencoded, application/json;q=0.5");
        assert_eq!(response_mime_type(&headers, DEFAULT), "application/x-www-form-urlencoded");
    }

    #[test]
    fn directions_read_their_own_header() {
        let mut map = headers(CONTENT_TYPE, "application/x-www-form-urlencoded");
        map.insert(ACCEPT, HeaderValue::from_static("Text/Plain"));

        assert_eq!(request_mime_type(&map, DEFAULT), "application/x-www-form-urlencoded");
        assert_eq!(response_mime_type(&map, DEFAULT), "text/plain");
    }
}
