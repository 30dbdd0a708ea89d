//! Execution strategies: how a handler invocation becomes a deferred value.
//!
//! Strategies are kept in priority order and the first one whose
//! [`can_handle`](ExecutionStrategy::can_handle) accepts the handler's declared
//! return shape is used. [`BlockingStrategy`] accepts everything, so it has to
//! stay last or it shadows every strategy registered after it.

use crate::error::HandlerError;
use crate::handler::{Deferred, HandlerDescriptor, ReturnShape, ServiceInstance};
use crate::value::Value;
use std::fmt;
use tokio::runtime::Handle;
use tracing::{trace, warn};

pub trait ExecutionStrategy: Send + Sync {
    fn can_handle(&self, descriptor: &HandlerDescriptor) -> bool;

    /// A catch-all strategy accepts every handler.
    fn is_catch_all(&self) -> bool {
        false
    }

    /// Starts the invocation. Failures never escape synchronously, they are
    /// carried by the returned deferred value.
    fn execute(&self, descriptor: &HandlerDescriptor, instance: ServiceInstance, args: Vec<Value>) -> Deferred;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Runs handlers that already return a deferred value, handing that value back as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredStrategy;

impl ExecutionStrategy for DeferredStrategy {
    fn can_handle(&self, descriptor: &HandlerDescriptor) -> bool {
        descriptor.return_shape() == ReturnShape::Deferred
    }

    fn execute(&self, descriptor: &HandlerDescriptor, instance: ServiceInstance, args: Vec<Value>) -> Deferred {
        descriptor.invoke(instance, args).into_deferred()
    }
}

/// Offloads the invocation onto tokio's blocking pool.
///
/// The task is spawned when `execute` is called; the returned value only
/// waits for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingStrategy;

impl ExecutionStrategy for BlockingStrategy {
    fn can_handle(&self, _descriptor: &HandlerDescriptor) -> bool {
        true
    }

    fn is_catch_all(&self) -> bool {
        true
    }

    fn execute(&self, descriptor: &HandlerDescriptor, instance: ServiceInstance, args: Vec<Value>) -> Deferred {
        let Ok(handle) = Handle::try_current() else {
            return Box::pin(futures::future::ready(Err(HandlerError::NoRuntime)));
        };

        let invoker = descriptor.invoker();
        let task = handle.spawn_blocking(move || invoker.invoke(instance, args));

        Box::pin(async move {
            match task.await {
                Ok(invocation) => invocation.into_deferred().await,
                Err(e) if e.is_panic() => Err(HandlerError::panicked(e.into_panic().as_ref())),
                Err(_) => Err(HandlerError::Cancelled),
            }
        })
    }
}

/// The ordered strategy list.
pub struct Strategies {
    inner: Vec<Box<dyn ExecutionStrategy>>,
}

impl Strategies {
    pub fn builder() -> StrategiesBuilder {
        StrategiesBuilder::new()
    }

    /// The first strategy able to run `descriptor`.
    pub fn select(&self, descriptor: &HandlerDescriptor) -> Option<&dyn ExecutionStrategy> {
        let strategy = self.inner.iter().find(|strategy| strategy.can_handle(descriptor)).map(|strategy| &**strategy);
        if let Some(strategy) = strategy {
            trace!(handler = %descriptor, strategy = strategy.name(), "execution strategy selected");
        }
        strategy
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

/// Deferred first, blocking as the catch-all.
impl Default for Strategies {
    fn default() -> Self {
        Self::builder().add_last(DeferredStrategy).add_last(BlockingStrategy).build()
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.iter().map(|strategy| strategy.name())).finish()
    }
}

pub struct StrategiesBuilder {
    inner: Vec<Box<dyn ExecutionStrategy>>,
}

impl fmt::Debug for StrategiesBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.iter().map(|strategy| strategy.name())).finish()
    }
}

impl StrategiesBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn add_last<S: ExecutionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.inner.push(Box::new(strategy));
        self
    }

    pub fn add_first<S: ExecutionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.inner.insert(0, Box::new(strategy));
        self
    }

    pub fn build(self) -> Strategies {
        let last = self.inner.len().saturating_sub(1);
        for (position, strategy) in self.inner.iter().enumerate() {
            if strategy.is_catch_all() && position != last {
                warn!(strategy = strategy.name(), position, "catch-all strategy shadows the strategies after it");
            }
        }
        Strategies { inner: self.inner }
    }
}
