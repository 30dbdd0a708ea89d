//! Route resolution and request dispatch for REST handlers declared as data.
//!
//! Application code declares each handler method with a [`HandlerMethod`]: an
//! HTTP verb, a path template such as `/users/{id}`, the source of every formal
//! parameter and the function to run. A [`RouteTable`] is built from those
//! declarations once at startup, and a [`Dispatcher`] maps each incoming
//! [`RequestContext`] onto the matching handler:
//!
//! 1. match the verb and path against the route table
//! 2. extract one raw string per parameter from the query, path or body
//! 3. deserialize the raw strings with the serializer for the request content type
//! 4. run the handler through the first capable [`ExecutionStrategy`]
//! 5. serialize the result with the serializer for the accepted content type
//!
//! Requests no route matches are handed back as [`Dispatched::NotHandled`].
//!
//! # Example
//! ```no_run
//! use micro_rest::http::Method;
//! use micro_rest::{Dispatcher, HandlerMethod, NotFound, Param, RequestContext, RouteTable, ServiceRegistry};
//!
//! struct Greeter;
//!
//! # async fn run() {
//! let routes = RouteTable::build([HandlerMethod::of::<Greeter>("greet")
//!     .get("/greet/{name}")
//!     .param(Param::path("name"))
//!     .direct(|_: &Greeter, name: String| format!("hello {name}"))]);
//!
//! let dispatcher = Dispatcher::builder()
//!     .route_table(routes)
//!     .service_provider(ServiceRegistry::builder().singleton(Greeter).build())
//!     .build()
//!     .unwrap();
//!
//! let response = dispatcher.serve(RequestContext::new(Method::GET, "/greet/ann"), &NotFound).await;
//! assert_eq!(response.body(), "hello ann");
//! # }
//! ```

mod dispatcher;
mod provider;
mod request;
mod strategy;
mod value;

pub mod error;
pub mod extract;
pub mod handler;
pub mod mime_type;
pub mod route;
pub mod serializer;

pub use dispatcher::{Dispatched, Dispatcher, DispatcherBuilder, Fallback, NotFound};
pub use handler::{HandlerDescriptor, HandlerMethod, Invocation, Param, ReturnShape, ServiceInstance, ServiceType};
pub use provider::{ServiceProvider, ServiceRegistry, ServiceRegistryBuilder};
pub use request::{PathParams, QueryParams, RequestContext};
pub use route::{Route, RouteDefinition, RouteTable};
pub use serializer::{FormSerializer, JsonSerializer, Serializer, Serializers};
pub use strategy::{BlockingStrategy, DeferredStrategy, ExecutionStrategy, Strategies, StrategiesBuilder};
pub use value::{FromValue, IntoValue, Json, ParamType, Value};

pub use http;
