//! Application-wide cache of configured service factories.
//!
//! Two construction paths share one map but never one key:
//!
//! - **Configured** ([`FactoryCache::get_or_create_configured`]): keyed by
//!   factory id from the services configuration. Lookup, construction,
//!   configuration and insertion all run inside one critical section, so
//!   each key is constructed exactly once.
//! - **Declared** ([`FactoryCache::get_or_create_declared`]): keyed by the
//!   factory class named in the initialization parameters. No lock is taken;
//!   concurrent first requests may each construct a factory and the last
//!   insert wins. Factories reached this way must be stateless, so the
//!   duplicates are interchangeable.
//!
//! In both paths a factory is inserted only after construction and
//! configuration succeed. Entries are never evicted.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use remoting_core::{FactoryConfig, Properties, ServicesConfig};
use tracing::debug;

use super::error::ServiceResolutionError;
use super::factory::ServiceFactory;
use super::registry::ComponentRegistry;

/// Type name prefixing configured cache keys.
pub const SERVICE_FACTORY_TYPE: &str = "remoting.ServiceFactory";

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// Cache key; the two variants keep the key spaces disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Factory id read from a destination. `None` when the destination names
    /// no factory, which resolves to the default factory configuration.
    Configured(Option<String>),
    /// Factory class named by the initialization parameters.
    Declared(String),
}

impl CacheKey {
    #[must_use]
    pub fn configured(factory_id: &str) -> Self {
        Self::Configured(Some(factory_id.to_string()))
    }

    #[must_use]
    pub fn declared(class_name: &str) -> Self {
        Self::Declared(class_name.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured(Some(id)) => write!(f, "{SERVICE_FACTORY_TYPE}.{id}"),
            Self::Configured(None) => write!(f, "{SERVICE_FACTORY_TYPE}.<default>"),
            Self::Declared(class_name) => f.write_str(class_name),
        }
    }
}

// ---------------------------------------------------------------------------
// FactoryCache
// ---------------------------------------------------------------------------

/// Shared map from [`CacheKey`] to a configured factory.
#[derive(Default)]
pub struct FactoryCache {
    factories: DashMap<CacheKey, Arc<dyn ServiceFactory>>,
    /// Critical section of the configured path.
    lock: Mutex<()>,
}

impl FactoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the factory for `factory_id`, constructing and configuring it
    /// on first use.
    ///
    /// The factory configuration is looked up by id, falling back to
    /// [`FactoryConfig::default_config`] when the id is absent or unknown.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceResolutionError::FactoryInstantiation`] if the factory
    /// class cannot be constructed or rejects its configuration. The cache is
    /// left unchanged.
    pub fn get_or_create_configured(
        &self,
        factory_id: Option<&str>,
        services_config: &dyn ServicesConfig,
        registry: &ComponentRegistry,
    ) -> Result<Arc<dyn ServiceFactory>, ServiceResolutionError> {
        let key = CacheKey::Configured(factory_id.map(str::to_string));
        let _guard = self.lock.lock();

        if let Some(factory) = self.get(&key) {
            debug!(">> Found a cached factory for: {key}");
            return Ok(factory);
        }

        debug!(">> No cached factory for: {key}");

        let default_config;
        let config = match factory_id.and_then(|id| services_config.find_factory_by_id(id)) {
            Some(config) => config,
            None => {
                default_config = FactoryConfig::default_config();
                &default_config
            }
        };

        let factory = build(registry, &config.class_name, &config.properties)?;
        self.factories.insert(key, factory.clone());

        debug!("<< Returning factory: {factory:?}");
        Ok(factory)
    }

    /// Returns the factory of class `class_name`, constructing it with an
    /// empty property bag on first use. Takes no lock.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceResolutionError::FactoryInstantiation`] if the factory
    /// class cannot be constructed or configured.
    pub fn get_or_create_declared(
        &self,
        class_name: &str,
        registry: &ComponentRegistry,
    ) -> Result<Arc<dyn ServiceFactory>, ServiceResolutionError> {
        let key = CacheKey::declared(class_name);
        if let Some(factory) = self.get(&key) {
            return Ok(factory);
        }

        let factory = build(registry, class_name, Properties::empty())?;
        self.factories.insert(key, factory.clone());

        debug!(">> Instantiated and cached factory from init params: {class_name}, {factory:?}");
        Ok(factory)
    }

    /// Returns the cached factory for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<dyn ServiceFactory>> {
        self.factories.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.factories.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for FactoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryCache")
            .field("len", &self.factories.len())
            .finish_non_exhaustive()
    }
}

/// Constructs and configures a factory. Nothing is published on failure.
fn build(
    registry: &ComponentRegistry,
    class_name: &str,
    properties: &Properties,
) -> Result<Arc<dyn ServiceFactory>, ServiceResolutionError> {
    let mut factory = registry.instantiate_factory(class_name)?;
    factory
        .configure(properties, registry)
        .map_err(|e| ServiceResolutionError::FactoryInstantiation {
            class_name: class_name.to_string(),
            source: e.into(),
        })?;
    Ok(Arc::from(factory))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
