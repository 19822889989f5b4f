use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use remoting_core::ServicesConfig;

use super::cache::FactoryCache;
use super::registry::ComponentRegistry;

/// Initialization parameter naming a factory class that bypasses
/// destination/factory resolution.
pub const SERVICE_FACTORY_PARAM: &str = "remoting.ServiceFactory";

/// Everything a resolution needs from its surroundings.
///
/// Passed explicitly to every call. Cloning is cheap and clones share the
/// same application-wide [`FactoryCache`], so one context can be handed to
/// every worker thread.
#[derive(Clone)]
pub struct ExecutionContext {
    init_params: Arc<HashMap<String, String>>,
    services_config: Arc<dyn ServicesConfig>,
    cache: Arc<FactoryCache>,
    registry: Arc<ComponentRegistry>,
}

impl ExecutionContext {
    /// Creates a context with no initialization parameters and a fresh cache.
    #[must_use]
    pub fn new(services_config: Arc<dyn ServicesConfig>, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            init_params: Arc::new(HashMap::new()),
            services_config,
            cache: Arc::new(FactoryCache::new()),
            registry,
        }
    }

    /// Sets an initialization parameter.
    #[must_use]
    pub fn with_init_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.init_params).insert(key.into(), value.into());
        self
    }

    /// Replaces all initialization parameters.
    #[must_use]
    pub fn with_init_params(mut self, params: HashMap<String, String>) -> Self {
        self.init_params = Arc::new(params);
        self
    }

    /// Shares an existing application cache instead of the fresh one.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<FactoryCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn init_param(&self, key: &str) -> Option<&str> {
        self.init_params.get(key).map(String::as_str)
    }

    /// Factory class named by [`SERVICE_FACTORY_PARAM`], if any.
    pub fn factory_class_override(&self) -> Option<&str> {
        self.init_param(SERVICE_FACTORY_PARAM)
    }

    pub fn services_config(&self) -> &dyn ServicesConfig {
        self.services_config.as_ref()
    }

    pub fn cache(&self) -> &Arc<FactoryCache> {
        &self.cache
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("init_params", &self.init_params)
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
