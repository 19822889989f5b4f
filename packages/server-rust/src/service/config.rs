use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use remoting_core::{ServiceClass, StaticServicesConfig};
use serde::{Deserialize, Serialize};

use super::context::ExecutionContext;
use super::registry::ComponentRegistry;

/// Deployment configuration for the dispatcher, loaded from JSON.
///
/// ```json
/// {
///   "init_params": { "remoting.ServiceFactory": "remoting.SimpleServiceFactory" },
///   "services": { "services": [...], "factories": [...] },
///   "classes": [{ "name": "shop.CartBean", "stateful": true, "methods": [...] }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Deployment-level initialization parameters.
    #[serde(default)]
    pub init_params: HashMap<String, String>,
    /// Destinations and factory declarations.
    #[serde(default)]
    pub services: StaticServicesConfig,
    /// Service class views registered at startup.
    #[serde(default)]
    pub classes: Vec<ServiceClass>,
}

impl DispatcherConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the configuration shape.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid dispatcher configuration")
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Registers the declared classes into `registry` and builds a context
    /// with a fresh application cache.
    #[must_use]
    pub fn into_context(self, registry: ComponentRegistry) -> ExecutionContext {
        for class in self.classes {
            registry.register_class(class);
        }
        ExecutionContext::new(Arc::new(self.services), Arc::new(registry))
            .with_init_params(self.init_params)
    }
}
