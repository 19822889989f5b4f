//! Destination and factory configuration records and the lookup contract
//! the dispatcher consumes.
//!
//! Parsing a services descriptor is someone else's job; this module only
//! defines the records it yields and [`StaticServicesConfig`], an in-memory
//! implementation that can be deserialized from JSON.

use serde::{Deserialize, Serialize};

use crate::properties::Properties;

/// Class name of the built-in factory used when no explicit factory
/// configuration is found.
pub const DEFAULT_FACTORY_CLASS: &str = "remoting.SimpleServiceFactory";

/// Destination property naming the factory id.
pub const FACTORY_PROPERTY: &str = "factory";

/// A remoting destination as declared in the services configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Destination {
    pub fn new(id: impl Into<String>, properties: Properties) -> Self {
        Self {
            id: id.into(),
            properties,
        }
    }

    /// Value of the `factory` property, if any.
    pub fn factory_id(&self) -> Option<&str> {
        self.properties.get(FACTORY_PROPERTY)
    }
}

/// Factory declaration: which factory class to build and how to configure it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub id: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(default)]
    pub properties: Properties,
}

impl FactoryConfig {
    pub fn new(id: impl Into<String>, class_name: impl Into<String>, properties: Properties) -> Self {
        Self {
            id: id.into(),
            class_name: class_name.into(),
            properties,
        }
    }

    /// The well-known default: the built-in simple factory with no properties.
    #[must_use]
    pub fn default_config() -> Self {
        Self::new("default", DEFAULT_FACTORY_CLASS, Properties::new())
    }
}

/// Lookup contract over the services configuration.
pub trait ServicesConfig: Send + Sync {
    /// Finds a destination served for the given message type.
    fn find_destination_by_id(&self, message_type: &str, destination_id: &str)
        -> Option<&Destination>;

    /// Finds a factory declaration by id.
    fn find_factory_by_id(&self, factory_id: &str) -> Option<&FactoryConfig>;
}

/// A service groups destinations that accept the same message types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub id: String,
    /// Message type discriminators this service accepts.
    #[serde(default)]
    pub message_types: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

/// In-memory [`ServicesConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticServicesConfig {
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
    #[serde(default)]
    pub factories: Vec<FactoryConfig>,
}

impl StaticServicesConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service definition.
    #[must_use]
    pub fn with_service(mut self, service: ServiceDefinition) -> Self {
        self.services.push(service);
        self
    }

    /// Adds a factory declaration.
    #[must_use]
    pub fn with_factory(mut self, factory: FactoryConfig) -> Self {
        self.factories.push(factory);
        self
    }
}

impl ServicesConfig for StaticServicesConfig {
    fn find_destination_by_id(
        &self,
        message_type: &str,
        destination_id: &str,
    ) -> Option<&Destination> {
        self.services
            .iter()
            .filter(|s| s.message_types.iter().any(|t| t == message_type))
            .flat_map(|s| s.destinations.iter())
            .find(|d| d.id == destination_id)
    }

    fn find_factory_by_id(&self, factory_id: &str) -> Option<&FactoryConfig> {
        self.factories.iter().find(|f| f.id == factory_id)
    }
}
