//! The service factory contract and the built-in simple factory.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use remoting_core::{Properties, RemotingRequest, DEFAULT_FACTORY_CLASS};
use tracing::debug;

use super::context::ExecutionContext;
use super::error::ServiceResolutionError;
use super::exception::{select_exception_handler, DefaultExceptionHandler, ExceptionHandler};
use super::invoker::ServiceInvoker;
use super::metadata::{MetadataCache, MetadataKey, ServiceMetadata, STATEFUL_KEY};
use super::registry::ComponentRegistry;

/// Destination property naming the service class.
pub const SOURCE_PROPERTY: &str = "source";
/// Destination property naming a narrower interface the service is invoked
/// through. Defaults to the source class itself.
pub const INVOKEE_PROPERTY: &str = "invokee";

// ---------------------------------------------------------------------------
// ServiceFactory trait
// ---------------------------------------------------------------------------

/// Produces service invokers for the destinations it serves.
///
/// A factory is mutable only during [`configure`](ServiceFactory::configure),
/// before the factory cache publishes it. Afterwards it is shared as
/// `Arc<dyn ServiceFactory>` and only read, so implementations must be
/// externally stateless: any internal caching must be safe under concurrent
/// `&self` access.
pub trait ServiceFactory: Any + Send + Sync + fmt::Debug {
    /// Applies configuration properties. Called exactly once, before the
    /// factory becomes visible to other threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, typically because
    /// the exception handler cannot be instantiated.
    fn configure(
        &mut self,
        properties: &Properties,
        registry: &ComponentRegistry,
    ) -> Result<(), ServiceResolutionError>;

    /// Returns an invoker for the service targeted by `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination or its service class cannot be
    /// resolved, or if its metadata is invalid.
    fn service_instance(
        &self,
        request: &RemotingRequest,
        ctx: &ExecutionContext,
    ) -> Result<ServiceInvoker, ServiceResolutionError>;

    /// The exception handler chosen at configure time.
    fn exception_handler(&self) -> Arc<dyn ExceptionHandler>;

    /// Enables downcasting to the concrete factory type.
    fn as_any(&self) -> &dyn Any;
}

// ---------------------------------------------------------------------------
// SimpleServiceFactory
// ---------------------------------------------------------------------------

/// Default factory: serves the class named by the destination's `source`
/// property, from the classes registered in the [`ComponentRegistry`].
///
/// Metadata comes from the destination descriptor when it declares
/// `ejb-stateful`, and from the class markers otherwise. Either way it is
/// built once and reused for every later request.
#[derive(Debug)]
pub struct SimpleServiceFactory {
    exception_handler: Arc<dyn ExceptionHandler>,
    metadata: MetadataCache,
}

impl SimpleServiceFactory {
    pub const CLASS_NAME: &'static str = DEFAULT_FACTORY_CLASS;

    #[must_use]
    pub fn new() -> Self {
        Self {
            exception_handler: Arc::new(DefaultExceptionHandler::default()),
            metadata: MetadataCache::new(),
        }
    }

    /// Number of metadata records built so far.
    #[must_use]
    pub fn metadata_count(&self) -> usize {
        self.metadata.len()
    }
}

impl Default for SimpleServiceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceFactory for SimpleServiceFactory {
    fn configure(
        &mut self,
        properties: &Properties,
        registry: &ComponentRegistry,
    ) -> Result<(), ServiceResolutionError> {
        debug!(">> Configuring factory with: {properties:?}");
        self.exception_handler = select_exception_handler(properties, registry)?;
        debug!("<< Configuring factory done: {self:?}");
        Ok(())
    }

    fn service_instance(
        &self,
        request: &RemotingRequest,
        ctx: &ExecutionContext,
    ) -> Result<ServiceInvoker, ServiceResolutionError> {
        let destination = ctx
            .services_config()
            .find_destination_by_id(&request.message_type, &request.destination)
            .ok_or_else(|| ServiceResolutionError::DestinationNotFound {
                message_type: request.message_type.clone(),
                destination_id: request.destination.clone(),
            })?;

        let lookup = |class_name: &str| {
            ctx.registry().service_class(class_name).ok_or_else(|| {
                ServiceResolutionError::ServiceClassNotFound {
                    destination_id: destination.id.clone(),
                    class_name: class_name.to_string(),
                }
            })
        };

        let source = destination.properties.get(SOURCE_PROPERTY).ok_or_else(|| {
            ServiceResolutionError::MissingSource {
                destination_id: destination.id.clone(),
            }
        })?;
        let scanned = lookup(source)?;
        let invokee = match destination.properties.get(INVOKEE_PROPERTY) {
            Some(name) => lookup(name)?,
            None => scanned.clone(),
        };

        let metadata = if destination.properties.contains_key(STATEFUL_KEY) {
            let key = MetadataKey::Descriptor {
                destination_id: destination.id.clone(),
                invokee: invokee.name.clone(),
            };
            self.metadata.get_or_build(key, || {
                ServiceMetadata::from_descriptor(&destination.properties, &invokee)
            })?
        } else {
            let key = MetadataKey::Markers {
                scanned: scanned.name.clone(),
                invokee: invokee.name.clone(),
            };
            self.metadata
                .get_or_build(key, || Ok(ServiceMetadata::from_markers(&scanned, &invokee)))?
        };

        debug!(
            "Serving destination {} with {} (invokee {}, stateful: {})",
            destination.id,
            scanned.name,
            invokee.name,
            metadata.is_stateful()
        );

        Ok(ServiceInvoker::new(
            destination.id.clone(),
            scanned,
            invokee,
            metadata,
            self.exception_handler.clone(),
        ))
    }

    fn exception_handler(&self) -> Arc<dyn ExceptionHandler> {
        self.exception_handler.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
