//! Operation identity: the `{component, operation}` pair.
//!
//! A [`OperationDescriptor`] names one public operation of one component. It is
//! used for error attribution, event topics and cache key construction, and is
//! immutable once built.
//!
//! # Naming rules
//!
//! Component and operation names must be plain identifiers
//! (`^[A-Za-z_][A-Za-z0-9_]*$`). Cache keys join names with `.`, so a dot
//! inside a name would let `("A.b", "c")` and `("A", "b.c")` collide.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern is a valid regex")
});

/// Rejected component or operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} name {name:?}: expected an identifier matching [A-Za-z_][A-Za-z0-9_]*")]
pub struct NameError {
    /// `"component"` or `"operation"`.
    pub kind: &'static str,
    /// The offending name.
    pub name: String,
}

/// Checks that `name` is usable as a component or operation name.
///
/// # Errors
///
/// Returns [`NameError`] when the name is empty or contains anything other
/// than ASCII letters, digits and underscores (or starts with a digit).
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), NameError> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(NameError {
            kind,
            name: name.to_string(),
        })
    }
}

/// Stable identity of one operation on one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationDescriptor {
    /// Component name, e.g. `"VaultReader"`.
    pub component: &'static str,
    /// Operation name, e.g. `"positionsOf"`.
    pub operation: &'static str,
}

impl OperationDescriptor {
    /// Builds a descriptor after validating both names.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if either name is not a plain identifier.
    pub fn new(component: &'static str, operation: &'static str) -> Result<Self, NameError> {
        validate_name("component", component)?;
        validate_name("operation", operation)?;
        Ok(Self {
            component,
            operation,
        })
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.operation)
    }
}
