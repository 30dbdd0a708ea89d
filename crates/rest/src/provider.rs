//! Service instances for handler invocation.
//!
//! The dispatcher asks its [`ServiceProvider`] for an instance of the handler's
//! owning service on every dispatch. [`ServiceRegistry`] is the in-process
//! implementation; applications with their own object container implement the
//! trait themselves.

use crate::error::ProviderError;
use crate::handler::{ServiceInstance, ServiceType};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg_attr(test, mockall::automock)]
pub trait ServiceProvider: Send + Sync {
    /// Returns a usable instance of `service`, or fails loudly.
    fn instance(&self, service: &ServiceType) -> Result<ServiceInstance, ProviderError>;
}

type Factory = dyn Fn() -> Result<ServiceInstance, ProviderError> + Send + Sync;

enum Binding {
    Singleton(ServiceInstance),
    Factory(Box<Factory>),
}

/// Maps service types to singletons or per-dispatch factories.
pub struct ServiceRegistry {
    bindings: HashMap<TypeId, Binding>,
}

impl ServiceRegistry {
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    pub fn contains(&self, service: &ServiceType) -> bool {
        self.bindings.contains_key(&service.id())
    }
}

impl ServiceProvider for ServiceRegistry {
    fn instance(&self, service: &ServiceType) -> Result<ServiceInstance, ProviderError> {
        match self.bindings.get(&service.id()) {
            Some(Binding::Singleton(instance)) => Ok(Arc::clone(instance)),
            Some(Binding::Factory(factory)) => factory(),
            None => Err(ProviderError::unknown(service)),
        }
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry").field("bindings", &self.bindings.len()).finish()
    }
}

pub struct ServiceRegistryBuilder {
    bindings: HashMap<TypeId, Binding>,
}

impl fmt::Debug for ServiceRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistryBuilder").field("bindings", &self.bindings.len()).finish()
    }
}

impl ServiceRegistryBuilder {
    fn new() -> Self {
        Self { bindings: HashMap::new() }
    }

    /// Shares one instance of `S` across every dispatch.
    pub fn singleton<S: Send + Sync + 'static>(self, service: S) -> Self {
        self.shared(Arc::new(service))
    }

    /// Shares an already reference-counted instance of `S`.
    pub fn shared<S: Send + Sync + 'static>(mut self, service: Arc<S>) -> Self {
        self.bindings.insert(TypeId::of::<S>(), Binding::Singleton(service));
        self
    }

    /// Creates a fresh instance of `S` for every dispatch.
    pub fn factory<S, F>(mut self, factory: F) -> Self
    where
        S: Send + Sync + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let factory = move || -> Result<ServiceInstance, ProviderError> { Ok(Arc::new(factory())) };
        self.bindings.insert(TypeId::of::<S>(), Binding::Factory(Box::new(factory)));
        self
    }

    /// Creates a fresh instance of `S` for every dispatch; construction may fail.
    pub fn try_factory<S, E, F>(mut self, factory: F) -> Self
    where
        S: Send + Sync + 'static,
        E: fmt::Display,
        F: Fn() -> Result<S, E> + Send + Sync + 'static,
    {
        let factory = move || -> Result<ServiceInstance, ProviderError> {
            match factory() {
                Ok(service) => Ok(Arc::new(service)),
                Err(e) => Err(ProviderError::failed(std::any::type_name::<S>(), e)),
            }
        };
        self.bindings.insert(TypeId::of::<S>(), Binding::Factory(Box::new(factory)));
        self
    }

    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry { bindings: self.bindings }
    }
}
