//! Stateful service metadata: which methods end a stateful conversation.
//!
//! Metadata is built either from the markers recorded on a [`ServiceClass`]
//! or from an external descriptor carried in destination properties. Both
//! forms resolve method identities against the *invokee* class view, which
//! may expose fewer methods than the scanned class.
//!
//! The two forms differ on unresolvable methods: the marker form drops them,
//! the descriptor form rejects them.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use remoting_core::{MethodIdentity, Properties, ServiceClass};
use tracing::trace;

use super::error::ServiceResolutionError;

/// Descriptor key whose presence marks a service stateful.
pub const STATEFUL_KEY: &str = "ejb-stateful";
/// Path to the repeated remove-method declarations.
pub const REMOVE_METHOD_PATH: &str = "ejb-stateful/remove-method";
/// Mandatory signature attribute of a remove-method declaration.
pub const SIGNATURE_KEY: &str = "signature";
/// Optional retain flag attribute of a remove-method declaration.
pub const RETAIN_IF_EXCEPTION_KEY: &str = "retain-if-exception";

// ---------------------------------------------------------------------------
// ServiceMetadata
// ---------------------------------------------------------------------------

/// Immutable description of a service's stateful lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceMetadata {
    stateful: bool,
    /// Remove method -> retain conversation if the call fails.
    remove_methods: HashMap<MethodIdentity, bool>,
}

impl ServiceMetadata {
    /// Metadata for a stateless service.
    #[must_use]
    pub fn stateless() -> Self {
        Self::default()
    }

    /// Builds metadata from the markers on `scanned`, resolving each
    /// remove-marked method on `invokee`. Methods the invokee does not
    /// expose are skipped without error.
    #[must_use]
    pub fn from_markers(scanned: &ServiceClass, invokee: &ServiceClass) -> Self {
        let stateful = scanned.stateful;
        let mut remove_methods = HashMap::new();

        if stateful {
            for (identity, marker) in scanned.remove_marked() {
                if invokee.has_method(identity) {
                    remove_methods.insert(identity.clone(), marker.retain_if_exception);
                } else {
                    trace!(
                        "Remove method {} of {} not exposed by {}, skipped",
                        identity,
                        scanned.name,
                        invokee.name
                    );
                }
            }
        }

        Self {
            stateful,
            remove_methods,
        }
    }

    /// Builds metadata from a descriptor bag.
    ///
    /// The service is stateful iff `ejb-stateful` is present. Each
    /// `ejb-stateful/remove-method` entry must carry a `signature` that
    /// resolves on `invokee`; `retain-if-exception` is read as a boolean
    /// literal (case-insensitive `"true"` with no surrounding whitespace,
    /// anything else is `false`).
    ///
    /// # Errors
    ///
    /// - [`ServiceResolutionError::MissingSignature`] if an entry has no signature
    /// - [`ServiceResolutionError::MethodNotFound`] if a signature is malformed
    ///   or names a method the invokee does not expose
    pub fn from_descriptor(
        properties: &Properties,
        invokee: &ServiceClass,
    ) -> Result<Self, ServiceResolutionError> {
        let stateful = properties.contains_key(STATEFUL_KEY);
        let mut remove_methods = HashMap::new();

        if stateful {
            for declaration in properties.get_all(REMOVE_METHOD_PATH) {
                let signature = declaration.get(SIGNATURE_KEY).ok_or_else(|| {
                    ServiceResolutionError::MissingSignature {
                        class: invokee.name.clone(),
                    }
                })?;

                let retain_if_exception = declaration
                    .get(RETAIN_IF_EXCEPTION_KEY)
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"));

                let identity = MethodIdentity::parse(signature).map_err(|e| {
                    ServiceResolutionError::MethodNotFound {
                        class: invokee.name.clone(),
                        signature: signature.to_string(),
                        parse_error: Some(e),
                    }
                })?;

                if !invokee.has_method(&identity) {
                    return Err(ServiceResolutionError::MethodNotFound {
                        class: invokee.name.clone(),
                        signature: signature.to_string(),
                        parse_error: None,
                    });
                }

                remove_methods.insert(identity, retain_if_exception);
            }
        }

        Ok(Self {
            stateful,
            remove_methods,
        })
    }

    #[must_use]
    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    /// Returns `true` if calling `method` ends the stateful conversation.
    #[must_use]
    pub fn is_remove_method(&self, method: &MethodIdentity) -> bool {
        self.remove_methods.contains_key(method)
    }

    /// Retain flag of a remove method. `None` when `method` is not a remove
    /// method; check [`is_remove_method`](Self::is_remove_method) first.
    #[must_use]
    pub fn retain_if_exception(&self, method: &MethodIdentity) -> Option<bool> {
        self.remove_methods.get(method).copied()
    }

    /// Number of resolved remove methods.
    #[must_use]
    pub fn remove_method_count(&self) -> usize {
        self.remove_methods.len()
    }

    /// Iterates remove methods with their retain flag, in no particular order.
    pub fn remove_methods(&self) -> impl Iterator<Item = (&MethodIdentity, bool)> {
        self.remove_methods.iter().map(|(m, retain)| (m, *retain))
    }
}

// ---------------------------------------------------------------------------
// MetadataCache
// ---------------------------------------------------------------------------

/// Identifies one metadata build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    /// Marker form: one build per (scanned class, invokee class) pair.
    Markers { scanned: String, invokee: String },
    /// Descriptor form: one build per destination and invokee class.
    Descriptor {
        destination_id: String,
        invokee: String,
    },
}

/// Builds each metadata record once and shares it afterwards.
///
/// The build closure runs while the map entry is held, so concurrent
/// requests for the same key never build twice. A failed build leaves no
/// entry behind.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: DashMap<MetadataKey, Arc<ServiceMetadata>>,
}

impl MetadataCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached metadata for `key`, building it with `build` on
    /// first use.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `build`.
    pub fn get_or_build<F>(
        &self,
        key: MetadataKey,
        build: F,
    ) -> Result<Arc<ServiceMetadata>, ServiceResolutionError>
    where
        F: FnOnce() -> Result<ServiceMetadata, ServiceResolutionError>,
    {
        if let Some(existing) = self.entries.get(&key) {
            return Ok(existing.value().clone());
        }

        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let metadata = Arc::new(build()?);
                entry.insert(metadata.clone());
                Ok(metadata)
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;

    fn checkout() -> MethodIdentity {
        MethodIdentity::no_args("checkout")
    }

    fn cancel() -> MethodIdentity {
        MethodIdentity::new("cancel", ["String"])
    }

    fn purge() -> MethodIdentity {
        MethodIdentity::no_args("purge")
    }

    /// Bean class: three remove methods, one of which is local-only.
    fn cart_bean() -> ServiceClass {
        ServiceClass::new("shop.CartBean")
            .stateful()
            .method(MethodIdentity::new("add", ["String", "int"]))
            .remove_method(checkout(), false)
            .remove_method(cancel(), true)
            .remove_method(purge(), false)
    }

    /// Remote interface: does not expose `purge()`.
    fn cart_remote() -> ServiceClass {
        ServiceClass::new("shop.CartRemote")
            .method(MethodIdentity::new("add", ["String", "int"]))
            .method(checkout())
            .method(cancel())
    }

    fn descriptor(entries: Vec<Properties>) -> Properties {
        let mut stateful = Properties::new();
        for entry in entries {
            stateful.insert_nested("remove-method", entry);
        }
        Properties::new().with_nested(STATEFUL_KEY, stateful)
    }

    #[test]
    fn markers_resolve_against_invokee() {
        let metadata = ServiceMetadata::from_markers(&cart_bean(), &cart_remote());
        assert!(metadata.is_stateful());
        assert!(metadata.is_remove_method(&checkout()));
        assert!(metadata.is_remove_method(&cancel()));
        assert_eq!(metadata.retain_if_exception(&checkout()), Some(false));
        assert_eq!(metadata.retain_if_exception(&cancel()), Some(true));
    }

    #[test]
    fn markers_skip_methods_hidden_by_invokee() {
        let metadata = ServiceMetadata::from_markers(&cart_bean(), &cart_remote());
        assert!(!metadata.is_remove_method(&purge()));
        assert_eq!(metadata.remove_method_count(), 2);
    }

    #[test]
    fn markers_match_on_parameter_types_not_just_name() {
        let invokee = ServiceClass::new("shop.CartRemote")
            .method(checkout())
            .method(MethodIdentity::new("cancel", ["long"]));
        let metadata = ServiceMetadata::from_markers(&cart_bean(), &invokee);
        assert!(!metadata.is_remove_method(&cancel()));
        assert!(!metadata.is_remove_method(&MethodIdentity::new("cancel", ["long"])));
    }

    #[test]
    fn markers_on_stateless_class_are_ignored() {
        let scanned = ServiceClass::new("shop.CatalogBean").remove_method(checkout(), true);
        let metadata = ServiceMetadata::from_markers(&scanned, &scanned);
        assert!(!metadata.is_stateful());
        assert!(!metadata.is_remove_method(&checkout()));
    }

    #[test]
    fn descriptor_builds_equivalent_metadata() {
        let props = descriptor(vec![
            Properties::new().with("signature", "checkout()"),
            Properties::new()
                .with("signature", "cancel(String)")
                .with("retain-if-exception", "true"),
        ]);
        let from_descriptor = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap();
        let from_markers = ServiceMetadata::from_markers(&cart_bean(), &cart_remote());
        assert_eq!(from_descriptor, from_markers);
    }

    #[test]
    fn descriptor_retain_flag_defaults_to_false() {
        let props = descriptor(vec![Properties::new()
            .with("signature", "checkout")
            .with("retain-if-exception", "yes")]);
        let metadata = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap();
        assert_eq!(metadata.retain_if_exception(&checkout()), Some(false));
    }

    #[test]
    fn descriptor_retain_flag_ignores_case_but_not_whitespace() {
        for (value, expected) in [
            ("true", true),
            ("TRUE", true),
            ("True", true),
            (" true ", false),
            ("true\n", false),
            ("", false),
        ] {
            let props = descriptor(vec![Properties::new()
                .with("signature", "checkout()")
                .with("retain-if-exception", value)]);
            let metadata = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap();
            assert_eq!(
                metadata.retain_if_exception(&checkout()),
                Some(expected),
                "retain-if-exception = {value:?}"
            );
        }
    }

    #[test]
    fn descriptor_without_stateful_section_is_stateless() {
        let props = Properties::new().with("source", "shop.CartBean");
        let metadata = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap();
        assert!(!metadata.is_stateful());
        assert_eq!(metadata.remove_method_count(), 0);
    }

    #[test]
    fn descriptor_with_empty_stateful_array_is_stateful() {
        let props: Properties =
            serde_json::from_str(r#"{ "source": "shop.CartBean", "ejb-stateful": [] }"#).unwrap();
        let metadata = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap();
        assert!(metadata.is_stateful());
        assert_eq!(metadata.remove_method_count(), 0);
    }

    #[test]
    fn descriptor_stateful_section_without_methods() {
        let props = descriptor(Vec::new());
        let metadata = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap();
        assert!(metadata.is_stateful());
        assert_eq!(metadata.remove_method_count(), 0);
    }

    #[test]
    fn descriptor_missing_signature_is_fatal() {
        let props = descriptor(vec![Properties::new().with("retain-if-exception", "true")]);
        let err = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap_err();
        assert!(matches!(
            err,
            ServiceResolutionError::MissingSignature { class } if class == "shop.CartRemote"
        ));
    }

    #[test]
    fn descriptor_unresolvable_method_is_fatal() {
        let props = descriptor(vec![Properties::new().with("signature", "purge()")]);
        let err = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap_err();
        assert!(matches!(
            err,
            ServiceResolutionError::MethodNotFound { ref signature, parse_error: None, .. }
                if signature == "purge()"
        ));
        assert_eq!(err.to_string(), "could not find method: shop.CartRemote.purge()");
    }

    #[test]
    fn descriptor_malformed_signature_is_fatal() {
        let props = descriptor(vec![Properties::new().with("signature", "cancel(String")]);
        let err = ServiceMetadata::from_descriptor(&props, &cart_remote()).unwrap_err();
        assert!(matches!(
            err,
            ServiceResolutionError::MethodNotFound {
                parse_error: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn cache_builds_once_per_key() {
        let cache = MetadataCache::new();
        let builds = AtomicUsize::new(0);
        let key = MetadataKey::Markers {
            scanned: "shop.CartBean".to_string(),
            invokee: "shop.CartRemote".to_string(),
        };

        let first = cache
            .get_or_build(key.clone(), || {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(ServiceMetadata::from_markers(&cart_bean(), &cart_remote()))
            })
            .unwrap();
        let second = cache
            .get_or_build(key, || {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(ServiceMetadata::stateless())
            })
            .unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_does_not_keep_failed_builds() {
        let cache = MetadataCache::new();
        let key = MetadataKey::Descriptor {
            destination_id: "cart".to_string(),
            invokee: "shop.CartRemote".to_string(),
        };

        let err = cache.get_or_build(key.clone(), || {
            Err(ServiceResolutionError::MissingSignature {
                class: "shop.CartRemote".to_string(),
            })
        });
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok = cache.get_or_build(key, || Ok(ServiceMetadata::stateless()));
        assert!(ok.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_builds_once_under_concurrency() {
        let cache = MetadataCache::new();
        let builds = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let key = MetadataKey::Markers {
                        scanned: "shop.CartBean".to_string(),
                        invokee: "shop.CartRemote".to_string(),
                    };
                    cache
                        .get_or_build(key, || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            Ok(ServiceMetadata::from_markers(&cart_bean(), &cart_remote()))
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    proptest! {
        /// For any subset of remove methods exposed by the invokee, the marker
        /// and descriptor forms agree on every query.
        #[test]
        fn marker_and_descriptor_forms_agree(
            methods in proptest::collection::btree_map("[a-z]{1,8}", (any::<bool>(), any::<bool>()), 0..6),
        ) {
            let mut scanned = ServiceClass::new("svc.Bean").stateful();
            let mut invokee = ServiceClass::new("svc.Remote");
            let mut entries = Vec::new();

            for (name, (retain, exposed)) in &methods {
                let id = MethodIdentity::no_args(name.clone());
                scanned = scanned.remove_method(id.clone(), *retain);
                if *exposed {
                    invokee = invokee.method(id.clone());
                    let mut entry = Properties::new().with("signature", id.to_string());
                    if *retain {
                        entry.insert("retain-if-exception", "true");
                    }
                    entries.push(entry);
                }
            }

            let from_markers = ServiceMetadata::from_markers(&scanned, &invokee);
            let from_descriptor =
                ServiceMetadata::from_descriptor(&descriptor(entries), &invokee).unwrap();

            prop_assert_eq!(from_markers.is_stateful(), from_descriptor.is_stateful());
            for (name, _) in &methods {
                let id = MethodIdentity::no_args(name.clone());
                prop_assert_eq!(
                    from_markers.is_remove_method(&id),
                    from_descriptor.is_remove_method(&id)
                );
                prop_assert_eq!(
                    from_markers.retain_if_exception(&id),
                    from_descriptor.retain_if_exception(&id)
                );
            }
        }
    }
}
