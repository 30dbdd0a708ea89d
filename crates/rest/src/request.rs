//! Per-request data handed to the dispatcher.
//!
//! A [`RequestContext`] is created fresh for each incoming request and is never
//! shared between requests. It carries the verb, the path (already stripped of
//! any mount prefix), the headers, the query parameters and the raw body.

use crate::error::RequestError;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request};
use matchit::Params;
use std::collections::HashMap;

/// Query parameters, keeping every value of a repeated name in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    inner: HashMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Result<Self, RequestError> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)?;
        Ok(pairs.into_iter().collect())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(name.into()).or_default().push(value.into());
    }

    /// The first value of `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.inner.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = QueryParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Placeholder values captured from a matched request path, by name.
#[derive(Debug, Clone)]
pub struct PathParams<'route, 'req> {
    kind: PathParamsKind<'route, 'req>,
}

#[derive(Debug, Clone)]
enum PathParamsKind<'route, 'req> {
    None,
    Params(Params<'route, 'req>),
}

impl<'route, 'req> PathParams<'route, 'req> {
    #[inline]
    fn new(params: Params<'route, 'req>) -> Self {
        if params.is_empty() { Self::empty() } else { Self { kind: PathParamsKind::Params(params) } }
    }

    #[inline]
    pub fn empty() -> Self {
        Self { kind: PathParamsKind::None }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            PathParamsKind::None => true,
            PathParamsKind::Params(params) => params.is_empty(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            PathParamsKind::None => 0,
            PathParamsKind::Params(params) => params.len(),
        }
    }

    /// The value captured by placeholder `name`, if the template declares it.
    #[inline]
    pub fn get(&self, name: impl AsRef<str>) -> Option<&'req str> {
        match &self.kind {
            PathParamsKind::Params(params) => params.get(name),
            PathParamsKind::None => None,
        }
    }
}

impl<'route, 'req> From<Params<'route, 'req>> for PathParams<'route, 'req> {
    fn from(params: Params<'route, 'req>) -> Self {
        PathParams::new(params)
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: QueryParams,
    body: String,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: HeaderMap::new(), query: QueryParams::new(), body: String::new() }
    }

    /// Adapts a transport request, stripping `mount_prefix` from the path.
    pub fn from_request(request: Request<Bytes>, mount_prefix: &str) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();

        let full_path = parts.uri.path();
        let path = match full_path.strip_prefix(mount_prefix) {
            Some("") => "/",
            Some(stripped) if stripped.starts_with('/') => stripped,
            _ => full_path,
        };

        let query = match parts.uri.query() {
            Some(query) => QueryParams::parse(query)?,
            None => QueryParams::new(),
        };

        let body = String::from_utf8(body.into())?;

        Ok(Self { method: parts.method, path: path.to_owned(), headers: parts.headers, query, body })
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    #[inline]
    pub fn body(&self) -> &str {
        &self.body
    }
}
