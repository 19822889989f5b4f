use serde::{Deserialize, Serialize};

use crate::method::MethodIdentity;

/// Marker recording that a method ends a stateful conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveMarker {
    /// Keep the conversation alive when the call fails.
    #[serde(default)]
    pub retain_if_exception: bool,
}

/// A method exposed by a [`ServiceClass`] view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMethod {
    #[serde(flatten)]
    pub identity: MethodIdentity,
    /// Present when the method carries the remove marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<RemoveMarker>,
}

/// Registration-time description of a service class or of a narrower
/// remote-facing interface over it.
///
/// The markers a component container would read from annotations are
/// recorded here as plain data: the `stateful` flag on the class and an
/// optional [`RemoveMarker`] per method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClass {
    /// Fully-qualified class name, used as the registry key.
    pub name: String,
    /// Whether the class carries the stateful component marker.
    #[serde(default)]
    pub stateful: bool,
    /// Public methods visible through this view.
    #[serde(default)]
    pub methods: Vec<ServiceMethod>,
}

impl ServiceClass {
    /// Creates a stateless class view with no methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stateful: false,
            methods: Vec::new(),
        }
    }

    /// Marks the class stateful.
    #[must_use]
    pub fn stateful(mut self) -> Self {
        self.stateful = true;
        self
    }

    /// Adds a plain method.
    #[must_use]
    pub fn method(mut self, identity: MethodIdentity) -> Self {
        self.methods.push(ServiceMethod {
            identity,
            remove: None,
        });
        self
    }

    /// Adds a method carrying the remove marker.
    #[must_use]
    pub fn remove_method(mut self, identity: MethodIdentity, retain_if_exception: bool) -> Self {
        self.methods.push(ServiceMethod {
            identity,
            remove: Some(RemoveMarker {
                retain_if_exception,
            }),
        });
        self
    }

    /// Looks up a method by name and parameter types.
    pub fn find_method(&self, identity: &MethodIdentity) -> Option<&ServiceMethod> {
        self.methods.iter().find(|m| &m.identity == identity)
    }

    /// Returns `true` if this view exposes the given method.
    pub fn has_method(&self, identity: &MethodIdentity) -> bool {
        self.find_method(identity).is_some()
    }

    /// Iterates methods carrying the remove marker.
    pub fn remove_marked(&self) -> impl Iterator<Item = (&MethodIdentity, RemoveMarker)> {
        self.methods
            .iter()
            .filter_map(|m| m.remove.map(|marker| (&m.identity, marker)))
    }
}
