//! Remoting Core: method identities, service class views, property bags,
//! and the destination/factory configuration contract.

pub mod class;
pub mod config;
pub mod method;
pub mod properties;
pub mod request;

pub use class::{RemoveMarker, ServiceClass, ServiceMethod};
pub use config::{
    Destination, FactoryConfig, ServiceDefinition, ServicesConfig, StaticServicesConfig,
    DEFAULT_FACTORY_CLASS, FACTORY_PROPERTY,
};
pub use method::{MethodIdentity, SignatureError};
pub use properties::{Properties, PropertyValue};
pub use request::{RemotingRequest, REMOTING_MESSAGE_TYPE};
