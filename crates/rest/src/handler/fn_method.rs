use crate::error::HandlerError;
use crate::handler::{Invocation, Invoke, ReturnShape, ServiceInstance};
use crate::value::{FromValue, IntoValue, Json, ParamType, Value};
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::SystemTime;

/// Conversion of a handler's output into its reply value.
///
/// Implemented for every [`IntoValue`] type and for `Result<T, E>` where the
/// error converts into a [`HandlerError`].
pub trait IntoReply {
    fn into_reply(self) -> Result<Value, HandlerError>;
}

impl<T: IntoValue, E: Into<HandlerError>> IntoReply for Result<T, E> {
    fn into_reply(self) -> Result<Value, HandlerError> {
        match self {
            Ok(t) => t.into_value().map_err(HandlerError::from),
            Err(e) => Err(e.into()),
        }
    }
}

macro_rules! impl_into_reply {
    ($($ty:ty)*) => {
        $(
        impl IntoReply for $ty {
            fn into_reply(self) -> Result<Value, HandlerError> {
                self.into_value().map_err(HandlerError::from)
            }
        }
        )*
    };
}

impl_into_reply! { () bool String &'static str i8 i16 i32 i64 isize u8 u16 u32 u64 usize f32 f64 SystemTime Value serde_json::Value }

impl<T: IntoValue> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Value, HandlerError> {
        self.into_value().map_err(HandlerError::from)
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Value, HandlerError> {
        self.into_value().map_err(HandlerError::from)
    }
}

/// A synchronous handler function `Fn(&S, A1, .., An) -> R`.
pub trait DirectFn<S, Args>: Send + Sync + 'static {
    fn param_types() -> Vec<ParamType>;

    fn call(&self, service: &S, args: Vec<Value>) -> Result<Value, HandlerError>;
}

/// A deferred handler function `Fn(Arc<S>, A1, .., An) -> impl Future`.
pub trait DeferredFn<S, Args>: Send + Sync + 'static {
    type Output: IntoReply;
    type Future: Future<Output = Self::Output> + Send + 'static;

    fn param_types() -> Vec<ParamType>;

    fn call(&self, service: Arc<S>, args: Vec<Value>) -> Result<Self::Future, HandlerError>;
}

/// impl `DirectFn` and `DeferredFn` for `Fn`, from 0 to 8 typed arguments
///
/// for example, it will impl Fn(&S, A, B) like this:
///```ignore
/// impl<Func, S, R, A, B> DirectFn<S, (A, B)> for Func
/// where
///     Func: Fn(&S, A, B) -> R + Send + Sync + 'static,
///     R: IntoReply,
///     A: FromValue,
///     B: FromValue,
/// {
///     fn call(&self, service: &S, args: Vec<Value>) -> Result<Value, HandlerError> {
///         let mut args = args.into_iter();
///         let a = A::from_value(args.next().unwrap_or(Value::Absent))?;
///         let b = B::from_value(args.next().unwrap_or(Value::Absent))?;
///         (self)(service, a, b).into_reply()
///     }
/// }
///```
macro_rules! impl_fn_method ({ $($param:ident $arg:ident)* } => {
    impl<Func, S, R, $($param,)*> DirectFn<S, ($($param,)*)> for Func
    where
        Func: Fn(&S, $($param),*) -> R + Send + Sync + 'static,
        R: IntoReply,
        $($param: FromValue,)*
    {
        fn param_types() -> Vec<ParamType> {
            vec![$($param::param_type(),)*]
        }

        #[allow(unused_mut, unused_variables, reason = "zero-argument handlers never read `args`")]
        fn call(&self, service: &S, args: Vec<Value>) -> Result<Value, HandlerError> {
            let mut args = args.into_iter();
            $(let $arg = $param::from_value(args.next().unwrap_or(Value::Absent))?;)*
            (self)(service, $($arg,)*).into_reply()
        }
    }

    impl<Func, S, Fut, $($param,)*> DeferredFn<S, ($($param,)*)> for Func
    where
        Func: Fn(Arc<S>, $($param),*) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoReply,
        $($param: FromValue,)*
    {
        type Output = Fut::Output;
        type Future = Fut;

        fn param_types() -> Vec<ParamType> {
            vec![$($param::param_type(),)*]
        }

        #[allow(unused_mut, unused_variables, reason = "zero-argument handlers never read `args`")]
        fn call(&self, service: Arc<S>, args: Vec<Value>) -> Result<Fut, HandlerError> {
            let mut args = args.into_iter();
            $(let $arg = $param::from_value(args.next().unwrap_or(Value::Absent))?;)*
            Ok((self)(service, $($arg,)*))
        }
    }
});

impl_fn_method! {}
impl_fn_method! { A a }
impl_fn_method! { A a B b }
impl_fn_method! { A a B b C c }
impl_fn_method! { A a B b C c D d }
impl_fn_method! { A a B b C c D d E e }
impl_fn_method! { A a B b C c D d E e F f }
impl_fn_method! { A a B b C c D d E e F f G g }
impl_fn_method! { A a B b C c D d E e F f G g H h }

pub(crate) struct DirectInvoker<S, F, Args> {
    f: F,
    param_types: Vec<ParamType>,
    _phantom: PhantomData<fn(&S, Args)>,
}

impl<S, F, Args> DirectInvoker<S, F, Args>
where
    F: DirectFn<S, Args>,
{
    pub(crate) fn new(f: F) -> Self {
        Self { f, param_types: F::param_types(), _phantom: PhantomData }
    }
}

impl<S, F, Args> Invoke for DirectInvoker<S, F, Args>
where
    S: Send + Sync + 'static,
    F: DirectFn<S, Args>,
    Args: 'static,
{
    fn param_types(&self) -> &[ParamType] {
        &self.param_types
    }

    fn return_shape(&self) -> ReturnShape {
        ReturnShape::Direct
    }

    fn invoke(&self, instance: ServiceInstance, args: Vec<Value>) -> Invocation {
        let Some(service) = instance.downcast_ref::<S>() else {
            return Invocation::Ready(Err(HandlerError::ServiceMismatch { expected: std::any::type_name::<S>() }));
        };

        let result = catch_unwind(AssertUnwindSafe(|| self.f.call(service, args)))
            .unwrap_or_else(|payload| Err(HandlerError::panicked(payload.as_ref())));
        Invocation::Ready(result)
    }
}

pub(crate) struct DeferredInvoker<S, F, Args> {
    f: F,
    param_types: Vec<ParamType>,
    _phantom: PhantomData<fn(Arc<S>, Args)>,
}

impl<S, F, Args> DeferredInvoker<S, F, Args>
where
    F: DeferredFn<S, Args>,
{
    pub(crate) fn new(f: F) -> Self {
        Self { f, param_types: F::param_types(), _phantom: PhantomData }
    }
}

impl<S, F, Args> Invoke for DeferredInvoker<S, F, Args>
where
    S: Send + Sync + 'static,
    F: DeferredFn<S, Args>,
    Args: 'static,
{
    fn param_types(&self) -> &[ParamType] {
        &self.param_types
    }

    fn return_shape(&self) -> ReturnShape {
        ReturnShape::Deferred
    }

    fn invoke(&self, instance: ServiceInstance, args: Vec<Value>) -> Invocation {
        let service = match instance.downcast::<S>() {
            Ok(service) => service,
            Err(_) => {
                return Invocation::Ready(Err(HandlerError::ServiceMismatch { expected: std::any::type_name::<S>() }));
            }
        };

        let future = match catch_unwind(AssertUnwindSafe(|| self.f.call(service, args))) {
            Ok(Ok(future)) => future,
            Ok(Err(e)) => return Invocation::Ready(Err(e)),
            Err(payload) => return Invocation::Ready(Err(HandlerError::panicked(payload.as_ref()))),
        };

        let deferred = AssertUnwindSafe(future).catch_unwind().map(|result| match result {
            Ok(output) => output.into_reply(),
            Err(payload) => Err(HandlerError::panicked(payload.as_ref())),
        });
        Invocation::Deferred(Box::pin(deferred))
    }
}

type ErasedFn = dyn Fn(ServiceInstance, Vec<Value>) -> Invocation + Send + Sync;

pub(crate) struct ErasedInvoker {
    f: Box<ErasedFn>,
    param_types: Vec<ParamType>,
    return_shape: ReturnShape,
}

impl ErasedInvoker {
    pub(crate) fn new<F>(param_types: Vec<ParamType>, return_shape: ReturnShape, f: F) -> Self
    where
        F: Fn(ServiceInstance, Vec<Value>) -> Invocation + Send + Sync + 'static,
    {
        Self { f: Box::new(f), param_types, return_shape }
    }
}

impl Invoke for ErasedInvoker {
    fn param_types(&self) -> &[ParamType] {
        &self.param_types
    }

    fn return_shape(&self) -> ReturnShape {
        self.return_shape
    }

    fn invoke(&self, instance: ServiceInstance, args: Vec<Value>) -> Invocation {
        catch_unwind(AssertUnwindSafe(|| (self.f)(instance, args)))
            .unwrap_or_else(|payload| Invocation::Ready(Err(HandlerError::panicked(payload.as_ref()))))
    }
}
