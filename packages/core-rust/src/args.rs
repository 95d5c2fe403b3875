//! Ordered argument lists passed to operations.
//!
//! Every operation receives its arguments as an [`Args`] value: an ordered
//! list of JSON values. Arguments are compared by value, so two lists built
//! from structurally equal inputs are equal regardless of object identity or
//! map insertion order (JSON objects keep their keys sorted).
//!
//! An omitted trailing argument is not the same as an explicit `null`:
//! `[]` and `[null]` are different lists.

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Builds an [`Args`] list from expressions, each converted with `json!`.
///
/// ```
/// use vaultkit_core::args;
///
/// let a = args!["0xabc", ["0x1", "0x2"]];
/// assert_eq!(a.len(), 2);
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Args::from(vec![$($crate::serde_json::json!($arg)),+])
    };
}

/// Ordered argument list of one operation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(Vec<Value>);

impl Args {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a serializable argument.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON (e.g. a map
    /// with non-string keys).
    pub fn push<T: Serialize>(&mut self, value: T) -> Result<(), serde_json::Error> {
        self.0.push(serde_json::to_value(value)?);
        Ok(())
    }

    /// Builder form of [`Args::push`].
    ///
    /// # Errors
    ///
    /// See [`Args::push`].
    pub fn with<T: Serialize>(mut self, value: T) -> Result<Self, serde_json::Error> {
        self.push(value)?;
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Decodes the required argument at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the argument is missing or does not decode as `T`.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let value = self
            .0
            .get(index)
            .with_context(|| format!("missing argument {index}"))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("argument {index} has an unexpected shape"))
    }

    /// Decodes the optional argument at `index`. Absent and `null` both read
    /// as `None`.
    ///
    /// # Errors
    ///
    /// Fails when the argument is present but does not decode as `T`.
    pub fn opt<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<Option<T>> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .with_context(|| format!("argument {index} has an unexpected shape")),
        }
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
