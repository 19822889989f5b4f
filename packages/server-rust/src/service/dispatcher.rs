//! Service factory resolution: request -> factory -> invoker.

use std::sync::Arc;

use remoting_core::RemotingRequest;
use tracing::debug;

use super::context::ExecutionContext;
use super::error::ServiceResolutionError;
use super::factory::ServiceFactory;
use super::invoker::ServiceInvoker;

/// Resolves the factory serving a request, then asks it for an invoker.
///
/// Resolution order:
/// 1. If the init parameters name a factory class, use the declared
///    (lock-free) cache path keyed by that class name.
/// 2. Otherwise find the destination for (message type, destination id);
///    a missing destination is fatal.
/// 3. Read the destination's `factory` id and use the configured (locked)
///    cache path.
#[derive(Debug, Clone)]
pub struct ServiceDispatcher {
    ctx: ExecutionContext,
}

impl ServiceDispatcher {
    #[must_use]
    pub fn new(ctx: ExecutionContext) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Returns the configured factory that serves `request`.
    ///
    /// # Errors
    ///
    /// - [`ServiceResolutionError::DestinationNotFound`] if no destination
    ///   matches; the cache is not touched
    /// - [`ServiceResolutionError::FactoryInstantiation`] if the factory
    ///   cannot be constructed or configured
    pub fn resolve_factory(
        &self,
        request: &RemotingRequest,
    ) -> Result<Arc<dyn ServiceFactory>, ServiceResolutionError> {
        let ctx = &self.ctx;

        if let Some(class_name) = ctx.factory_class_override() {
            debug!(">> Found factory class from init params: {class_name}");
            return ctx.cache().get_or_create_declared(class_name, ctx.registry());
        }

        debug!(
            ">> Finding factoryId for messageType: {} and destinationId: {}",
            request.message_type, request.destination
        );

        let destination = ctx
            .services_config()
            .find_destination_by_id(&request.message_type, &request.destination)
            .ok_or_else(|| ServiceResolutionError::DestinationNotFound {
                message_type: request.message_type.clone(),
                destination_id: request.destination.clone(),
            })?;
        let factory_id = destination.factory_id();

        debug!(">> Found factoryId: {factory_id:?}");

        ctx.cache()
            .get_or_create_configured(factory_id, ctx.services_config(), ctx.registry())
    }

    /// Resolves the factory for `request` and returns its service invoker.
    ///
    /// # Errors
    ///
    /// Any error from [`resolve_factory`](Self::resolve_factory) or from the
    /// factory's [`service_instance`](ServiceFactory::service_instance).
    pub fn dispatch(
        &self,
        request: &RemotingRequest,
    ) -> Result<ServiceInvoker, ServiceResolutionError> {
        let factory = self.resolve_factory(request)?;
        factory.service_instance(request, &self.ctx)
    }
}
