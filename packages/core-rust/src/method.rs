//! Method identity as a class-independent value type.
//!
//! A [`MethodIdentity`] is a method name plus its ordered parameter type
//! names. It is resolved against whichever [`ServiceClass`](crate::ServiceClass)
//! view is relevant at each step (scanned class or invokee class).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name plus ordered parameter-type list identifying one method overload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodIdentity {
    /// Method name.
    pub name: String,
    /// Parameter type names in declaration order.
    #[serde(default, rename = "params")]
    pub parameter_types: Vec<String>,
}

/// Errors from parsing a method signature string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("empty method signature")]
    Empty,
    #[error("missing method name in signature: {0}")]
    MissingName(String),
    #[error("unbalanced parentheses in signature: {0}")]
    Unbalanced(String),
    #[error("empty parameter type in signature: {0}")]
    EmptyParameter(String),
}

impl MethodIdentity {
    /// Creates an identity from a name and parameter type names.
    pub fn new<N, I, P>(name: N, parameter_types: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an identity for a method without parameters.
    pub fn no_args(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_types: Vec::new(),
        }
    }

    /// Parses a signature of the form `name(T1, T2)`.
    ///
    /// Whitespace is ignored. A bare `name` is read as `name()`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the name is missing, the parentheses
    /// are unbalanced, or a parameter slot is empty.
    pub fn parse(signature: &str) -> Result<Self, SignatureError> {
        let compact: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(SignatureError::Empty);
        }

        let (name, params) = match compact.find('(') {
            None => {
                if compact.contains(')') || compact.contains(',') {
                    return Err(SignatureError::Unbalanced(signature.to_string()));
                }
                (compact.as_str(), "")
            }
            Some(open) => {
                let Some(inner) = compact[open + 1..].strip_suffix(')') else {
                    return Err(SignatureError::Unbalanced(signature.to_string()));
                };
                if inner.contains('(') || inner.contains(')') {
                    return Err(SignatureError::Unbalanced(signature.to_string()));
                }
                (&compact[..open], inner)
            }
        };

        if name.is_empty() {
            return Err(SignatureError::MissingName(signature.to_string()));
        }

        let parameter_types = if params.is_empty() {
            Vec::new()
        } else {
            params
                .split(',')
                .map(|p| {
                    if p.is_empty() {
                        Err(SignatureError::EmptyParameter(signature.to_string()))
                    } else {
                        Ok(p.to_string())
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.to_string(),
            parameter_types,
        })
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameter_types.join(","))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_with_parameters() {
        let id = MethodIdentity::parse("checkout(java.lang.String, int)").unwrap();
        assert_eq!(id.name, "checkout");
        assert_eq!(id.parameter_types, vec!["java.lang.String", "int"]);
    }

    #[test]
    fn parse_bare_name_means_no_args() {
        assert_eq!(
            MethodIdentity::parse("remove").unwrap(),
            MethodIdentity::no_args("remove")
        );
        assert_eq!(
            MethodIdentity::parse("  remove ( ) ").unwrap(),
            MethodIdentity::no_args("remove")
        );
    }

    #[test]
    fn parse_rejects_malformed_signatures() {
        assert_eq!(MethodIdentity::parse("   "), Err(SignatureError::Empty));
        assert!(matches!(
            MethodIdentity::parse("(int)"),
            Err(SignatureError::MissingName(_))
        ));
        assert!(matches!(
            MethodIdentity::parse("remove(int"),
            Err(SignatureError::Unbalanced(_))
        ));
        assert!(matches!(
            MethodIdentity::parse("remove)"),
            Err(SignatureError::Unbalanced(_))
        ));
        assert!(matches!(
            MethodIdentity::parse("remove(int,,long)"),
            Err(SignatureError::EmptyParameter(_))
        ));
    }

    #[test]
    fn display_uses_compact_form() {
        let id = MethodIdentity::new("save", ["Order", "boolean"]);
        assert_eq!(id.to_string(), "save(Order,boolean)");
    }

    proptest! {
        #[test]
        fn display_then_parse_yields_same_identity(
            name in "[a-zA-Z_][a-zA-Z0-9_]{0,12}",
            params in proptest::collection::vec("[a-zA-Z_][a-zA-Z0-9_.\\[\\]]{0,16}", 0..4),
        ) {
            let id = MethodIdentity::new(name, params);
            prop_assert_eq!(MethodIdentity::parse(&id.to_string()).unwrap(), id);
        }
    }
}
