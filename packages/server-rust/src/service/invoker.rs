use std::sync::Arc;

use remoting_core::{MethodIdentity, RemotingRequest, ServiceClass, ServiceMethod};

use super::error::ServiceResolutionError;
use super::exception::{ExceptionHandler, ServiceFault};
use super::metadata::ServiceMetadata;

/// What happens to a stateful conversation after a call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversation {
    /// The component instance stays bound to the caller.
    Continue,
    /// The component instance is released.
    End,
}

/// A ready-to-call handle on one service, as produced by a factory.
#[derive(Debug, Clone)]
pub struct ServiceInvoker {
    destination_id: String,
    service_class: Arc<ServiceClass>,
    invokee: Arc<ServiceClass>,
    metadata: Arc<ServiceMetadata>,
    exception_handler: Arc<dyn ExceptionHandler>,
}

impl ServiceInvoker {
    #[must_use]
    pub fn new(
        destination_id: String,
        service_class: Arc<ServiceClass>,
        invokee: Arc<ServiceClass>,
        metadata: Arc<ServiceMetadata>,
        exception_handler: Arc<dyn ExceptionHandler>,
    ) -> Self {
        Self {
            destination_id,
            service_class,
            invokee,
            metadata,
            exception_handler,
        }
    }

    #[must_use]
    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    /// The class implementing the service.
    #[must_use]
    pub fn service_class(&self) -> &Arc<ServiceClass> {
        &self.service_class
    }

    /// The view calls go through.
    #[must_use]
    pub fn invokee(&self) -> &Arc<ServiceClass> {
        &self.invokee
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<ServiceMetadata> {
        &self.metadata
    }

    #[must_use]
    pub fn exception_handler(&self) -> &Arc<dyn ExceptionHandler> {
        &self.exception_handler
    }

    /// Resolves `method` on the invokee view.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceResolutionError::MethodNotFound`] if the invokee does
    /// not expose the method.
    pub fn resolve_method(
        &self,
        method: &MethodIdentity,
    ) -> Result<&ServiceMethod, ServiceResolutionError> {
        self.invokee
            .find_method(method)
            .ok_or_else(|| ServiceResolutionError::MethodNotFound {
                class: self.invokee.name.clone(),
                signature: method.to_string(),
                parse_error: None,
            })
    }

    /// Decides whether the stateful conversation survives a call to `method`.
    ///
    /// A remove method ends the conversation, unless the call `failed` and
    /// the method retains the conversation on exception. Stateless services
    /// and ordinary methods always continue.
    #[must_use]
    pub fn conversation_after(&self, method: &MethodIdentity, failed: bool) -> Conversation {
        if !self.metadata.is_stateful() {
            return Conversation::Continue;
        }
        match self.metadata.retain_if_exception(method) {
            None => Conversation::Continue,
            Some(true) if failed => Conversation::Continue,
            Some(_) => Conversation::End,
        }
    }

    /// Converts a call failure into a fault with the factory's handler.
    #[must_use]
    pub fn handle_failure(&self, request: &RemotingRequest, error: &anyhow::Error) -> ServiceFault {
        self.exception_handler.handle(request, error)
    }
}
