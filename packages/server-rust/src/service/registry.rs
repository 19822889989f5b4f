use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use remoting_core::ServiceClass;

use super::error::ServiceResolutionError;
use super::exception::{DefaultExceptionHandler, ExceptionHandler, ExtendedExceptionHandler};
use super::factory::{ServiceFactory, SimpleServiceFactory};

// ---------------------------------------------------------------------------
// Constructor types
// ---------------------------------------------------------------------------

/// Builds a fresh, unconfigured factory.
pub type FactoryConstructor =
    Arc<dyn Fn() -> anyhow::Result<Box<dyn ServiceFactory>> + Send + Sync>;

type PlainHandlerFn = Arc<dyn Fn() -> Arc<dyn ExceptionHandler> + Send + Sync>;
type LoggingHandlerFn = Arc<dyn Fn(bool) -> Arc<dyn ExceptionHandler> + Send + Sync>;

/// The constructor forms an exception handler class offers.
///
/// A class may offer a no-argument form, a form taking the logging flag,
/// or both. Selection fails if the form it needs is missing.
#[derive(Clone, Default)]
pub struct HandlerConstructor {
    plain: Option<PlainHandlerFn>,
    with_logging: Option<LoggingHandlerFn>,
}

impl HandlerConstructor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the no-argument form.
    #[must_use]
    pub fn plain<H, F>(mut self, constructor: F) -> Self
    where
        H: ExceptionHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.plain = Some(Arc::new(move || Arc::new(constructor()) as Arc<dyn ExceptionHandler>));
        self
    }

    /// Adds the form taking the logging flag.
    #[must_use]
    pub fn with_logging<H, F>(mut self, constructor: F) -> Self
    where
        H: ExceptionHandler,
        F: Fn(bool) -> H + Send + Sync + 'static,
    {
        self.with_logging = Some(Arc::new(move |log| {
            Arc::new(constructor(log)) as Arc<dyn ExceptionHandler>
        }));
        self
    }

    /// Invokes the boolean form when `logging` is set, the no-argument form
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns a description of the missing constructor form.
    pub fn instantiate(
        &self,
        logging: Option<bool>,
    ) -> Result<Arc<dyn ExceptionHandler>, &'static str> {
        match logging {
            Some(flag) => self
                .with_logging
                .as_ref()
                .map(|ctor| ctor(flag))
                .ok_or("no constructor taking the logging flag"),
            None => self
                .plain
                .as_ref()
                .map(|ctor| ctor())
                .ok_or("no no-argument constructor"),
        }
    }
}

impl fmt::Debug for HandlerConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConstructor")
            .field("plain", &self.plain.is_some())
            .field("with_logging", &self.with_logging.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Startup-populated registry replacing class loading by name.
///
/// Holds three tables keyed by class name:
/// - **factories**: constructors for [`ServiceFactory`] implementations
/// - **exception handlers**: [`HandlerConstructor`] forms
/// - **service classes**: [`ServiceClass`] views used to build metadata
///
/// Lookups clone the stored `Arc` out of the map before constructing, so no
/// map shard is held while user code runs.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: DashMap<String, FactoryConstructor>,
    handlers: DashMap<String, HandlerConstructor>,
    classes: DashMap<String, Arc<ServiceClass>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in factory and exception handlers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_factory(SimpleServiceFactory::CLASS_NAME, || {
            Ok(SimpleServiceFactory::new())
        });
        registry.register_exception_handler(
            DefaultExceptionHandler::CLASS_NAME,
            HandlerConstructor::new()
                .plain(DefaultExceptionHandler::default)
                .with_logging(DefaultExceptionHandler::new),
        );
        registry.register_exception_handler(
            ExtendedExceptionHandler::CLASS_NAME,
            HandlerConstructor::new()
                .plain(ExtendedExceptionHandler::default)
                .with_logging(ExtendedExceptionHandler::new),
        );
        registry
    }

    /// Registers a factory constructor under `class_name`, replacing any
    /// previous registration.
    pub fn register_factory<T, F>(&self, class_name: impl Into<String>, constructor: F)
    where
        T: ServiceFactory,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let ctor: FactoryConstructor = Arc::new(move || {
            constructor().map(|factory| Box::new(factory) as Box<dyn ServiceFactory>)
        });
        self.factories.insert(class_name.into(), ctor);
    }

    /// Registers exception handler constructors under `class_name`.
    pub fn register_exception_handler(
        &self,
        class_name: impl Into<String>,
        constructor: HandlerConstructor,
    ) {
        self.handlers.insert(class_name.into(), constructor);
    }

    /// Registers a service class view under its own name.
    pub fn register_class(&self, class: ServiceClass) {
        self.classes.insert(class.name.clone(), Arc::new(class));
    }

    /// Constructs an unconfigured factory of the given class.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceResolutionError::FactoryInstantiation`] if the class is
    /// not registered or its constructor fails.
    pub fn instantiate_factory(
        &self,
        class_name: &str,
    ) -> Result<Box<dyn ServiceFactory>, ServiceResolutionError> {
        let ctor = self
            .factories
            .get(class_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceResolutionError::FactoryInstantiation {
                class_name: class_name.to_string(),
                source: anyhow::anyhow!("factory class not registered"),
            })?;

        ctor().map_err(|source| ServiceResolutionError::FactoryInstantiation {
            class_name: class_name.to_string(),
            source,
        })
    }

    /// Returns the constructor forms registered for a handler class.
    pub fn exception_handler(&self, class_name: &str) -> Option<HandlerConstructor> {
        self.handlers
            .get(class_name)
            .map(|entry| entry.value().clone())
    }

    /// Returns the service class view registered under `name`.
    pub fn service_class(&self, name: &str) -> Option<Arc<ServiceClass>> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    /// Returns `true` if a factory constructor is registered for `class_name`.
    pub fn has_factory(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("factories", &self.factories.len())
            .field("handlers", &self.handlers.len())
            .field("classes", &self.classes.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use remoting_core::MethodIdentity;

    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = ComponentRegistry::with_builtins();
        assert!(registry.has_factory(SimpleServiceFactory::CLASS_NAME));
        assert!(registry
            .exception_handler(DefaultExceptionHandler::CLASS_NAME)
            .is_some());
        assert!(registry
            .exception_handler(ExtendedExceptionHandler::CLASS_NAME)
            .is_some());
    }

    #[test]
    fn instantiate_unregistered_factory_fails() {
        let registry = ComponentRegistry::new();
        let err = registry.instantiate_factory("nope.Factory").unwrap_err();
        assert!(matches!(
            err,
            ServiceResolutionError::FactoryInstantiation { ref class_name, .. }
                if class_name == "nope.Factory"
        ));
    }

    #[test]
    fn instantiate_calls_constructor_each_time() {
        let registry = ComponentRegistry::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        registry.register_factory("test.Counting", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(SimpleServiceFactory::new())
        });

        let a = registry.instantiate_factory("test.Counting").unwrap();
        let b = registry.instantiate_factory("test.Counting").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(a.as_any().is::<SimpleServiceFactory>());
        assert!(b.as_any().is::<SimpleServiceFactory>());
    }

    #[test]
    fn failing_constructor_maps_to_factory_instantiation() {
        let registry = ComponentRegistry::new();
        registry.register_factory::<SimpleServiceFactory, _>("test.Broken", || {
            Err(anyhow::anyhow!("missing container"))
        });
        let err = registry.instantiate_factory("test.Broken").unwrap_err();
        assert_eq!(err.to_string(), "could not instantiate factory: test.Broken");
    }

    #[test]
    fn handler_constructor_picks_form_by_flag() {
        let ctor = HandlerConstructor::new()
            .plain(DefaultExceptionHandler::default)
            .with_logging(DefaultExceptionHandler::new);
        assert!(ctor.instantiate(None).unwrap().logging_enabled());
        assert!(!ctor.instantiate(Some(false)).unwrap().logging_enabled());
        assert!(ctor.instantiate(Some(true)).unwrap().logging_enabled());
    }

    #[test]
    fn handler_constructor_missing_form_is_an_error() {
        let plain_only = HandlerConstructor::new().plain(DefaultExceptionHandler::default);
        assert!(plain_only.instantiate(Some(true)).is_err());

        let flag_only = HandlerConstructor::new().with_logging(DefaultExceptionHandler::new);
        assert!(flag_only.instantiate(None).is_err());
    }

    #[test]
    fn register_and_get_service_class() {
        let registry = ComponentRegistry::new();
        registry.register_class(
            ServiceClass::new("shop.CartBean").method(MethodIdentity::no_args("checkout")),
        );
        let class = registry.service_class("shop.CartBean").unwrap();
        assert!(class.has_method(&MethodIdentity::no_args("checkout")));
        assert!(registry.service_class("shop.Unknown").is_none());
    }
}
