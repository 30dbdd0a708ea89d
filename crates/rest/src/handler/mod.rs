//! Handler descriptors and the builder that declares them.
//!
//! A [`HandlerMethod`] is one candidate method of a service: an optional verb
//! and path template, the sources of its formal parameters and the bound
//! function that runs it. The route table keeps only candidates carrying both
//! a verb and a path template, as [`HandlerDescriptor`]s.
//!
//! # Example
//! ```
//! use micro_rest::{HandlerMethod, Param};
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     fn greet(&self, name: String) -> String {
//!         format!("hello {name}")
//!     }
//! }
//!
//! let method = HandlerMethod::of::<Greeter>("greet")
//!     .get("/greet")
//!     .param(Param::query("name").default_value("world"))
//!     .direct(|greeter: &Greeter, name: String| greeter.greet(name));
//!
//! assert!(method.is_routable());
//! ```

mod fn_method;

pub use fn_method::{DeferredFn, DirectFn, IntoReply};

use crate::error::HandlerError;
use crate::value::{ParamType, Value};
use fn_method::{DeferredInvoker, DirectInvoker, ErasedInvoker};
use futures::future::BoxFuture;
use http::Method;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A resolved service instance, as handed out by a [`ServiceProvider`](crate::ServiceProvider).
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// A value available once the handler completes; failures are carried inside.
pub type Deferred = BoxFuture<'static, Result<Value, HandlerError>>;

/// Identifies the service type that owns a handler method.
#[derive(Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    pub fn of<S: 'static>() -> Self {
        Self { id: TypeId::of::<S>(), name: std::any::type_name::<S>() }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The declared result shape of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// The handler returns its value directly.
    Direct,
    /// The handler returns a deferred value that completes later.
    Deferred,
}

/// Where a formal parameter takes its raw value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Query { name: String, default_value: Option<String> },
    Path { name: String },
    Body,
}

impl Param {
    pub fn query(name: impl Into<String>) -> Self {
        Param::Query { name: name.into(), default_value: None }
    }

    pub fn path(name: impl Into<String>) -> Self {
        Param::Path { name: name.into() }
    }

    pub fn body() -> Self {
        Param::Body
    }

    /// Sets the fallback used when a query parameter is missing; no effect on other sources.
    pub fn default_value(self, value: impl Into<String>) -> Self {
        match self {
            Param::Query { name, .. } => Param::Query { name, default_value: Some(value.into()) },
            other => other,
        }
    }
}

/// What an [`Invoke`] produced for one call.
pub enum Invocation {
    Ready(Result<Value, HandlerError>),
    Deferred(Deferred),
}

impl Invocation {
    /// Lifts the invocation into a deferred value without extra indirection for deferred results.
    pub fn into_deferred(self) -> Deferred {
        match self {
            Invocation::Ready(result) => Box::pin(futures::future::ready(result)),
            Invocation::Deferred(deferred) => deferred,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Invocation::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A type-erased, invokable handler body.
pub trait Invoke: Send + Sync {
    fn param_types(&self) -> &[ParamType];

    fn return_shape(&self) -> ReturnShape;

    /// Runs the handler on the calling thread. Failures, panics included, are
    /// reported through the returned [`Invocation`].
    fn invoke(&self, instance: ServiceInstance, args: Vec<Value>) -> Invocation;
}

/// One invokable, routable handler method.
#[derive(Clone)]
pub struct HandlerDescriptor {
    service: ServiceType,
    name: Cow<'static, str>,
    params: Arc<[Param]>,
    invoker: Arc<dyn Invoke>,
}

impl HandlerDescriptor {
    #[inline]
    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared sources of the formal parameters.
    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The declared types of the formal parameters.
    #[inline]
    pub fn param_types(&self) -> &[ParamType] {
        self.invoker.param_types()
    }

    /// The formal parameter count of the bound function.
    #[inline]
    pub fn arity(&self) -> usize {
        self.param_types().len()
    }

    #[inline]
    pub fn first_param_type(&self) -> Option<ParamType> {
        self.param_types().first().copied()
    }

    #[inline]
    pub fn return_shape(&self) -> ReturnShape {
        self.invoker.return_shape()
    }

    pub fn invoker(&self) -> Arc<dyn Invoke> {
        Arc::clone(&self.invoker)
    }

    pub fn invoke(&self, instance: ServiceInstance, args: Vec<Value>) -> Invocation {
        self.invoker.invoke(instance, args)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("service", &self.service)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("param_types", &self.param_types())
            .field("return_shape", &self.return_shape())
            .finish()
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.service, self.name)
    }
}

/// A candidate method: a descriptor plus its optional route markers.
#[derive(Debug, Clone)]
pub struct HandlerMethod {
    verb: Option<Method>,
    path: Option<String>,
    descriptor: HandlerDescriptor,
}

impl HandlerMethod {
    /// Starts declaring method `name` of service `S`.
    pub fn of<S: Send + Sync + 'static>(name: impl Into<Cow<'static, str>>) -> MethodBuilder<S> {
        MethodBuilder::new(name.into())
    }

    #[inline]
    pub fn verb(&self) -> Option<&Method> {
        self.verb.as_ref()
    }

    #[inline]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Only methods carrying both a verb marker and a path template are routable.
    #[inline]
    pub fn is_routable(&self) -> bool {
        self.verb.is_some() && self.path.is_some()
    }

    #[inline]
    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    pub(crate) fn into_parts(self) -> (Option<Method>, Option<String>, HandlerDescriptor) {
        (self.verb, self.path, self.descriptor)
    }
}

pub struct MethodBuilder<S> {
    name: Cow<'static, str>,
    verb: Option<Method>,
    path: Option<String>,
    params: Vec<Param>,
    _phantom: PhantomData<fn() -> S>,
}

impl<S> fmt::Debug for MethodBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBuilder")
            .field("service", &std::any::type_name::<S>())
            .field("name", &self.name)
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

macro_rules! verb_route {
    ($method:ident, $verb:ident) => {
        pub fn $method(self, path: impl Into<String>) -> Self {
            self.route(Method::$verb, path)
        }
    };
}

impl<S: Send + Sync + 'static> MethodBuilder<S> {
    fn new(name: Cow<'static, str>) -> Self {
        Self { name, verb: None, path: None, params: vec![], _phantom: PhantomData }
    }

    verb_route!(get, GET);
    verb_route!(post, POST);
    verb_route!(put, PUT);
    verb_route!(delete, DELETE);
    verb_route!(head, HEAD);
    verb_route!(patch, PATCH);

    pub fn route(mut self, verb: Method, path: impl Into<String>) -> Self {
        self.verb = Some(verb);
        self.path = Some(path.into());
        self
    }

    /// Sets only the verb marker.
    pub fn verb(mut self, verb: Method) -> Self {
        self.verb = Some(verb);
        self
    }

    /// Sets only the path template.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Appends the source of the next formal parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Binds a synchronous function `Fn(&S, A1, .., An) -> R`.
    pub fn direct<F, Args>(self, f: F) -> HandlerMethod
    where
        F: DirectFn<S, Args>,
        Args: 'static,
    {
        self.bind(DirectInvoker::new(f))
    }

    /// Binds a function returning a future, `Fn(Arc<S>, A1, .., An) -> impl Future`.
    pub fn deferred<F, Args>(self, f: F) -> HandlerMethod
    where
        F: DeferredFn<S, Args>,
        Args: 'static,
    {
        self.bind(DeferredInvoker::new(f))
    }

    /// Binds an untyped body with explicitly declared parameter types and return shape.
    pub fn erased<F>(self, param_types: Vec<ParamType>, return_shape: ReturnShape, f: F) -> HandlerMethod
    where
        F: Fn(ServiceInstance, Vec<Value>) -> Invocation + Send + Sync + 'static,
    {
        self.bind(ErasedInvoker::new(param_types, return_shape, f))
    }

    fn bind<I: Invoke + 'static>(self, invoker: I) -> HandlerMethod {
        let descriptor = HandlerDescriptor {
            service: ServiceType::of::<S>(),
            name: self.name,
            params: self.params.into(),
            invoker: Arc::new(invoker),
        };
        HandlerMethod { verb: self.verb, path: self.path, descriptor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Json;
    use futures::FutureExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize, Serialize)]
    struct Item {
        name: String,
    }

    struct Catalog;

    impl Catalog {
        fn rename(&self, Json(item): Json<Item>, suffix: String) -> Json<Item> {
            Json(Item { name: item.name + &suffix })
        }
    }

    fn instance() -> ServiceInstance {
        Arc::new(Catalog)
    }

    #[test]
    fn param_builders() {
        assert_eq!(Param::query("q").default_value("1"), Param::Query { name: "q".into(), default_value: Some("1".into()) });
        assert_eq!(Param::path("id").default_value("1"), Param::Path { name: "id".into() });
        assert_eq!(Param::body(), Param::Body);
    }

    #[test]
    fn routable_needs_verb_and_path() {
        let only_verb = HandlerMethod::of::<Catalog>("a").verb(Method::GET).direct(|_: &Catalog| ());
        let only_path = HandlerMethod::of::<Catalog>("b").path("/b").direct(|_: &Catalog| ());
        let both = HandlerMethod::of::<Catalog>("c").get("/c").direct(|_: &Catalog| ());

        assert!(!only_verb.is_routable());
        assert!(!only_path.is_routable());
        assert!(both.is_routable());
        assert_eq!(both.verb(), Some(&Method::GET));
        assert_eq!(both.path(), Some("/c"));
    }

    #[test]
    fn descriptor_declares_types_from_signature() {
        let method = HandlerMethod::of::<Catalog>("rename")
            .post("/items")
            .param(Param::body())
            .param(Param::query("suffix"))
            .direct(|catalog: &Catalog, item: Json<Item>, suffix: String| catalog.rename(item, suffix));

        let descriptor = method.descriptor();
        assert_eq!(descriptor.param_types(), &[ParamType::Structured, ParamType::Text]);
        assert_eq!(descriptor.arity(), 2);
        assert_eq!(descriptor.first_param_type(), Some(ParamType::Structured));
        assert_eq!(descriptor.return_shape(), ReturnShape::Direct);
        assert_eq!(descriptor.service(), &ServiceType::of::<Catalog>());
        assert_eq!(descriptor.to_string(), format!("{}::rename", std::any::type_name::<Catalog>()));
    }

    #[test]
    fn direct_invocation_is_ready() {
        let method = HandlerMethod::of::<Catalog>("rename")
            .post("/items")
            .direct(|catalog: &Catalog, item: Json<Item>, suffix: String| catalog.rename(item, suffix));

        let args = vec![Value::Structured(serde_json::json!({"name": "x"})), Value::Text("!".into())];
        match method.descriptor().invoke(instance(), args) {
            Invocation::Ready(Ok(value)) => assert_eq!(value, Value::Structured(serde_json::json!({"name": "x!"}))),
            other => panic!("unexpected invocation {other:?}"),
        }
    }

    #[test]
    fn argument_failures_are_reported_not_thrown() {
        let method = HandlerMethod::of::<Catalog>("count").get("/count").direct(|_: &Catalog, n: i32| n + 1);

        let invocation = method.descriptor().invoke(instance(), vec![Value::Text("x".into())]);
        assert!(matches!(invocation, Invocation::Ready(Err(HandlerError::Argument { .. }))));
    }

    #[test]
    fn wrong_instance_is_reported() {
        let method = HandlerMethod::of::<Catalog>("noop").get("/noop").direct(|_: &Catalog| ());

        let invocation = method.descriptor().invoke(Arc::new(42_u32), vec![]);
        assert!(matches!(invocation, Invocation::Ready(Err(HandlerError::ServiceMismatch { .. }))));
    }

    #[test]
    fn panics_are_caught() {
        let method = HandlerMethod::of::<Catalog>("boom").get("/boom").direct(|_: &Catalog| -> String { panic!("boom") });

        let invocation = method.descriptor().invoke(instance(), vec![]);
        match invocation {
            Invocation::Ready(Err(HandlerError::Panicked { message })) => assert_eq!(message, "boom"),
            other => panic!("unexpected invocation {other:?}"),
        }
    }

    #[test]
    fn deferred_invocation() {
        let method = HandlerMethod::of::<Catalog>("later")
            .get("/later")
            .deferred(|_: Arc<Catalog>, n: i64| async move { Ok::<_, HandlerError>(n * 2) });

        assert_eq!(method.descriptor().return_shape(), ReturnShape::Deferred);
        let invocation = method.descriptor().invoke(instance(), vec![Value::Integer(21)]);
        let Invocation::Deferred(deferred) = invocation else { panic!("expected deferred invocation") };
        assert_eq!(deferred.now_or_never().unwrap().unwrap(), Value::Integer(42));
    }

    #[test]
    fn deferred_failure_stays_inside_the_future() {
        let method = HandlerMethod::of::<Catalog>("fail")
            .get("/fail")
            .deferred(|_: Arc<Catalog>| async { Err::<String, _>(HandlerError::failed("nope")) });

        let deferred = method.descriptor().invoke(instance(), vec![]).into_deferred();
        let err = deferred.now_or_never().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn erased_invoker() {
        let method = HandlerMethod::of::<Catalog>("echo").post("/echo").erased(
            vec![ParamType::Any],
            ReturnShape::Direct,
            |_, mut args| Invocation::Ready(Ok(args.pop().unwrap_or(Value::Absent))),
        );

        assert_eq!(method.descriptor().first_param_type(), Some(ParamType::Any));
        let invocation = method.descriptor().invoke(instance(), vec![Value::Bool(true)]);
        assert!(matches!(invocation, Invocation::Ready(Ok(Value::Bool(true)))));
    }
}
