//! `VaultKit` Core — operation identity, argument lists, cache keys and the
//! normalized domain error shared by the SDK instrumentation layers.

pub mod args;
pub mod descriptor;
pub mod error;
pub mod key;

pub use args::Args;
pub use descriptor::{validate_name, NameError, OperationDescriptor};
pub use error::{rewrap, wrap, DomainError, FailureOrigin};
pub use key::{encode, CacheKey};

/// Re-exported for the [`args!`] macro.
#[doc(hidden)]
pub use serde_json;
