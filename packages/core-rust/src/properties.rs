//! Hierarchical property bag used for factory and destination configuration.
//!
//! Keys may repeat (a descriptor can declare several `remove-method`
//! elements), and nested bags are addressed with `/`-separated paths such
//! as `ejb-stateful/remove-method/signature`.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single property value: either text or a nested bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Nested(Properties),
}

/// Ordered multimap of property keys to text or nested bags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

static EMPTY: Properties = Properties {
    entries: Vec::new(),
};

impl Properties {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared empty bag.
    #[must_use]
    pub fn empty() -> &'static Properties {
        &EMPTY
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder form of [`insert_nested`](Self::insert_nested).
    #[must_use]
    pub fn with_nested(mut self, key: impl Into<String>, nested: Properties) -> Self {
        self.insert_nested(key, nested);
        self
    }

    /// Appends a text value. Existing entries with the same key are kept.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((key.into(), PropertyValue::Text(value.into())));
    }

    /// Appends a nested bag. Existing entries with the same key are kept.
    pub fn insert_nested(&mut self, key: impl Into<String>, nested: Properties) {
        self.entries.push((key.into(), PropertyValue::Nested(nested)));
    }

    /// First text value found at `path`.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.nodes_at(path).into_iter().find_map(|v| match v {
            PropertyValue::Text(text) => Some(text.as_str()),
            PropertyValue::Nested(_) => None,
        })
    }

    /// Every nested bag found at `path`, in declaration order.
    pub fn get_all(&self, path: &str) -> Vec<&Properties> {
        self.nodes_at(path)
            .into_iter()
            .filter_map(|v| match v {
                PropertyValue::Nested(nested) => Some(nested),
                PropertyValue::Text(_) => None,
            })
            .collect()
    }

    /// Returns `true` if any entry (text or nested) exists at `path`.
    pub fn contains_key(&self, path: &str) -> bool {
        !self.nodes_at(path).is_empty()
    }

    /// Iterates top-level entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn nodes_at(&self, path: &str) -> Vec<&PropertyValue> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Vec::new();
        };

        let mut current: Vec<&Properties> = vec![self];
        for segment in parents {
            current = current
                .into_iter()
                .flat_map(|bag| bag.entries.iter())
                .filter(|(k, _)| k == segment)
                .filter_map(|(_, v)| match v {
                    PropertyValue::Nested(nested) => Some(nested),
                    PropertyValue::Text(_) => None,
                })
                .collect();
            if current.is_empty() {
                return Vec::new();
            }
        }

        current
            .into_iter()
            .flat_map(|bag| bag.entries.iter())
            .filter(|(k, _)| k == last)
            .map(|(_, v)| v)
            .collect()
    }

    fn push_raw(&mut self, key: String, raw: RawValue) {
        match raw {
            RawValue::Text(text) => self.insert(key, text),
            RawValue::Flag(flag) => self.insert(key, flag.to_string()),
            RawValue::Number(number) => self.insert(key, number.to_string()),
            // An empty list still marks the key as present.
            RawValue::List(items) if items.is_empty() => self.insert_nested(key, Self::new()),
            RawValue::List(items) => {
                for item in items {
                    self.push_raw(key.clone(), item);
                }
            }
            RawValue::Nested(map) => self.insert_nested(key, Self::from_raw(map)),
        }
    }

    fn from_raw(map: BTreeMap<String, RawValue>) -> Self {
        let mut bag = Self::new();
        for (key, raw) in map {
            bag.push_raw(key, raw);
        }
        bag
    }
}

/// JSON shape accepted for a property bag. Arrays become repeated keys.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Flag(bool),
    Number(serde_json::Number),
    List(Vec<RawValue>),
    Nested(BTreeMap<String, RawValue>),
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawValue>::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Text(text) => serializer.serialize_str(text),
            PropertyValue::Nested(nested) => nested.serialize(serializer),
        }
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let mut seen: Vec<&str> = Vec::new();
        for (key, _) in &self.entries {
            if seen.contains(&key.as_str()) {
                continue;
            }
            seen.push(key);
            let values: Vec<&PropertyValue> = self
                .entries
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v)
                .collect();
            if let [single] = values.as_slice() {
                map.serialize_entry(key, single)?;
            } else {
                map.serialize_entry(key, &values)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stateful_descriptor() -> Properties {
        Properties::new().with("source", "shop.CartBean").with_nested(
            "ejb-stateful",
            Properties::new()
                .with_nested(
                    "remove-method",
                    Properties::new().with("signature", "checkout()"),
                )
                .with_nested(
                    "remove-method",
                    Properties::new()
                        .with("signature", "cancel(String)")
                        .with("retain-if-exception", "true"),
                ),
        )
    }

    #[test]
    fn get_reads_top_level_and_nested_text() {
        let props = stateful_descriptor();
        assert_eq!(props.get("source"), Some("shop.CartBean"));
        assert_eq!(
            props.get("ejb-stateful/remove-method/signature"),
            Some("checkout()")
        );
        assert_eq!(props.get("missing"), None);
        assert_eq!(props.get("ejb-stateful"), None, "nested bag is not text");
    }

    #[test]
    fn get_all_returns_repeated_elements_in_order() {
        let props = stateful_descriptor();
        let methods = props.get_all("ejb-stateful/remove-method");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].get("signature"), Some("checkout()"));
        assert_eq!(methods[1].get("retain-if-exception"), Some("true"));
    }

    #[test]
    fn contains_key_sees_empty_nested_bag() {
        let props = Properties::new().with_nested("ejb-stateful", Properties::new());
        assert!(props.contains_key("ejb-stateful"));
        assert!(!props.contains_key("ejb-stateful/remove-method"));
        assert!(!props.contains_key(""));
    }

    #[test]
    fn empty_is_shared_and_empty() {
        assert!(Properties::empty().is_empty());
        assert_eq!(Properties::empty().len(), 0);
    }

    #[test]
    fn deserializes_arrays_as_repeated_keys() {
        let json = r#"{
            "source": "shop.CartBean",
            "ejb-stateful": {
                "remove-method": [
                    { "signature": "checkout()" },
                    { "signature": "cancel(String)", "retain-if-exception": true }
                ]
            },
            "pool-size": 4
        }"#;
        let props: Properties = serde_json::from_str(json).unwrap();
        let methods = props.get_all("ejb-stateful/remove-method");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[1].get("retain-if-exception"), Some("true"));
        assert_eq!(props.get("pool-size"), Some("4"));
    }

    #[test]
    fn empty_array_keeps_key_present() {
        let props: Properties = serde_json::from_str(r#"{ "ejb-stateful": [] }"#).unwrap();
        assert!(props.contains_key("ejb-stateful"));
        assert_eq!(props.len(), 1);
        assert!(props.get_all("ejb-stateful/remove-method").is_empty());
    }

    #[test]
    fn serializes_repeated_keys_as_arrays() {
        let props = Properties::new().with("a", "1").with("b", "2").with("a", "3");
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json, serde_json::json!({ "a": ["1", "3"], "b": "2" }));
    }
}
