//! Service factory resolution and stateful service metadata.
//!
//! This module implements the dispatch pipeline for inbound remoting calls:
//!
//! 1. **Resolution** (`dispatcher`): request -> destination -> factory id
//! 2. **Caching** (`cache`): one configured factory per key per application
//! 3. **Construction** (`registry`): class names -> constructor functions
//! 4. **Configuration** (`exception`): exception handler selection
//! 5. **Invocation** (`factory`, `invoker`): factory -> invoker carrying
//!    stateful metadata (`metadata`)

pub mod cache;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod exception;
pub mod factory;
pub mod invoker;
pub mod metadata;
pub mod registry;
pub mod resolution;

// Re-export key types for convenient access.
pub use cache::{CacheKey, FactoryCache, SERVICE_FACTORY_TYPE};
pub use config::DispatcherConfig;
pub use context::{ExecutionContext, SERVICE_FACTORY_PARAM};
pub use dispatcher::ServiceDispatcher;
pub use error::ServiceResolutionError;
pub use exception::{
    select_exception_handler, DefaultExceptionHandler, ExceptionHandler,
    ExtendedExceptionHandler, ServiceFault,
};
pub use factory::{ServiceFactory, SimpleServiceFactory};
pub use invoker::{Conversation, ServiceInvoker};
pub use metadata::{MetadataCache, MetadataKey, ServiceMetadata};
pub use registry::{ComponentRegistry, FactoryConstructor, HandlerConstructor};
pub use resolution::{RemoveMethod, Resolution};
