//! The dispatch pipeline.
//!
//! [`Dispatcher::dispatch`] is the single entry point: it matches the route,
//! extracts the raw arguments, deserializes them with the request serializer,
//! runs the handler through the first capable execution strategy, awaits the
//! deferred result and serializes it with the response serializer. An
//! unmatched request is handed back untouched as [`Dispatched::NotHandled`].
//!
//! The only suspension point is the await on the deferred result.

use crate::error::{BuildError, ConfigError, DispatchError, Direction, text_response};
use crate::extract::extract_arguments;
use crate::mime_type::{request_mime_type, response_mime_type};
use crate::provider::ServiceProvider;
use crate::request::RequestContext;
use crate::route::RouteTable;
use crate::serializer::{Serializer, Serializers};
use crate::strategy::Strategies;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The outcome of a dispatch.
#[derive(Debug)]
pub enum Dispatched {
    Handled(Response<String>),
    /// No route matched; the request goes on to the next stage.
    NotHandled(RequestContext),
}

/// The next stage for requests no route matched.
#[async_trait]
pub trait Fallback: Send + Sync {
    async fn handle(&self, request: RequestContext) -> Response<String>;
}

/// Answers every request with `404 Not Found`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

#[async_trait]
impl Fallback for NotFound {
    async fn handle(&self, _request: RequestContext) -> Response<String> {
        text_response(StatusCode::NOT_FOUND, "404 not found")
    }
}

pub struct Dispatcher {
    routes: RouteTable,
    provider: Arc<dyn ServiceProvider>,
    serializers: Serializers,
    strategies: Strategies,
    default_mime_type: String,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    #[inline]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[inline]
    pub fn default_mime_type(&self) -> &str {
        &self.default_mime_type
    }

    pub async fn dispatch(&self, request: RequestContext) -> Result<Dispatched, DispatchError> {
        let Some(route) = self.routes.find(request.method(), request.path()) else {
            return Ok(Dispatched::NotHandled(request));
        };
        let descriptor = route.descriptor();

        let raw_args = extract_arguments(route, request.path(), request.query(), request.body());
        if raw_args.len() != descriptor.arity() {
            return Err(ConfigError::argument_count(raw_args.len(), descriptor.arity()).into());
        }

        let serializer = self.serializer(Direction::Request, request_mime_type(request.headers(), &self.default_mime_type))?.1;
        let args = raw_args
            .iter()
            .zip(descriptor.param_types())
            .map(|(raw, param_type)| serializer.deserialize(raw, *param_type))
            .collect::<Result<Vec<_>, _>>()?;

        let strategy = self.strategies.select(descriptor).ok_or_else(|| ConfigError::no_strategy(descriptor))?;
        let instance = self.provider.instance(descriptor.service())?;

        let value = strategy.execute(descriptor, instance, args).await?;

        let (mime_type, serializer) =
            self.serializer(Direction::Response, response_mime_type(request.headers(), &self.default_mime_type))?;
        let body = serializer.serialize(value)?;

        debug!(handler = %descriptor, mime_type = %mime_type, "request handled");
        let response = Response::builder().status(StatusCode::OK).header(CONTENT_TYPE, mime_type).body(body)?;
        Ok(Dispatched::Handled(response))
    }

    /// Dispatches `request`, handing unmatched requests to `fallback` and
    /// turning every failure into `500 Internal Server Error`.
    pub async fn serve(&self, request: RequestContext, fallback: &dyn Fallback) -> Response<String> {
        match self.dispatch(request).await {
            Ok(Dispatched::Handled(response)) => response,
            Ok(Dispatched::NotHandled(request)) => fallback.handle(request).await,
            Err(e) => {
                error!(cause = %e, "failed to dispatch request");
                e.into_response()
            }
        }
    }

    /// Adapts a transport request mounted under `mount_prefix` and serves it.
    /// Requests that can't be decoded are answered with `400 Bad Request`.
    pub async fn serve_request(
        &self,
        request: Request<Bytes>,
        mount_prefix: &str,
        fallback: &dyn Fallback,
    ) -> Response<String> {
        match RequestContext::from_request(request, mount_prefix) {
            Ok(request) => self.serve(request, fallback).await,
            Err(e) => {
                warn!(cause = %e, "can't decode request");
                text_response(StatusCode::BAD_REQUEST, "400 bad request")
            }
        }
    }

    fn serializer(&self, direction: Direction, mime_type: String) -> Result<(String, &dyn Serializer), ConfigError> {
        match self.serializers.resolve(&mime_type) {
            Some(serializer) => Ok((mime_type, serializer.as_ref())),
            None => Err(ConfigError::missing_serializer(direction, mime_type)),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("serializers", &self.serializers)
            .field("strategies", &self.strategies)
            .field("default_mime_type", &self.default_mime_type)
            .finish_non_exhaustive()
    }
}

pub struct DispatcherBuilder {
    routes: Option<RouteTable>,
    provider: Option<Arc<dyn ServiceProvider>>,
    serializers: Serializers,
    strategies: Strategies,
    default_mime_type: String,
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("routes", &self.routes)
            .field("has_provider", &self.provider.is_some())
            .field("serializers", &self.serializers)
            .field("strategies", &self.strategies)
            .field("default_mime_type", &self.default_mime_type)
            .finish()
    }
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self {
            routes: None,
            provider: None,
            serializers: Serializers::default_json(),
            strategies: Strategies::default(),
            default_mime_type: mime::APPLICATION_JSON.to_string(),
        }
    }

    pub fn route_table(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn service_provider<P: ServiceProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn shared_service_provider(mut self, provider: Arc<dyn ServiceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = serializers;
        self
    }

    pub fn strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// The MIME type used when a request carries no usable content type or accept header.
    pub fn default_mime_type(mut self, mime_type: impl AsRef<str>) -> Self {
        self.default_mime_type = mime_type.as_ref().to_ascii_lowercase();
        self
    }

    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let routes = self.routes.ok_or(BuildError::MissingRouteTable)?;
        let provider = self.provider.ok_or(BuildError::MissingServiceProvider)?;

        if self.serializers.resolve(&self.default_mime_type).is_none() {
            warn!(mime_type = %self.default_mime_type, "no serializer registered for the default mime type");
        }

        Ok(Dispatcher {
            routes,
            provider,
            serializers: self.serializers,
            strategies: self.strategies,
            default_mime_type: self.default_mime_type,
        })
    }
}
