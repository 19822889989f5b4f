//! Serializable summary of one resolved request, as printed by
//! `remoting-resolve`.

use std::path::Path;

use remoting_core::RemotingRequest;
use serde::Serialize;

use super::config::DispatcherConfig;
use super::dispatcher::ServiceDispatcher;
use super::error::ServiceResolutionError;
use super::registry::ComponentRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Debug rendering of the serving factory.
    pub factory: String,
    /// Debug rendering of the factory's exception handler.
    pub exception_handler: String,
    pub destination: String,
    pub service_class: String,
    pub invokee: String,
    pub stateful: bool,
    /// Sorted by signature.
    pub remove_methods: Vec<RemoveMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveMethod {
    pub signature: String,
    pub retain_if_exception: bool,
}

impl Resolution {
    /// Resolves `request` through `dispatcher` and summarizes the invoker.
    ///
    /// # Errors
    ///
    /// Any error from [`ServiceDispatcher::dispatch`].
    pub fn resolve(
        dispatcher: &ServiceDispatcher,
        request: &RemotingRequest,
    ) -> Result<Self, ServiceResolutionError> {
        let factory = dispatcher.resolve_factory(request)?;
        let invoker = factory.service_instance(request, dispatcher.context())?;

        let mut remove_methods: Vec<RemoveMethod> = invoker
            .metadata()
            .remove_methods()
            .map(|(method, retain)| RemoveMethod {
                signature: method.to_string(),
                retain_if_exception: retain,
            })
            .collect();
        remove_methods.sort_by(|a, b| a.signature.cmp(&b.signature));

        Ok(Self {
            factory: format!("{factory:?}"),
            exception_handler: format!("{:?}", invoker.exception_handler()),
            destination: invoker.destination_id().to_string(),
            service_class: invoker.service_class().name.clone(),
            invokee: invoker.invokee().name.clone(),
            stateful: invoker.metadata().is_stateful(),
            remove_methods,
        })
    }

    /// Loads a dispatcher configuration file with the built-in components
    /// and resolves `request` against it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or resolution fails.
    pub fn resolve_file(path: impl AsRef<Path>, request: &RemotingRequest) -> anyhow::Result<Self> {
        let ctx = DispatcherConfig::from_path(path)?.into_context(ComponentRegistry::with_builtins());
        Ok(Self::resolve(&ServiceDispatcher::new(ctx), request)?)
    }
}
