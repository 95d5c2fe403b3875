//! Tower middleware layers for instrumented operations.
//!
//! - [`instrument`]: result publication and error normalization
//! - [`cache`]: result caching for read-only components
//! - [`pipeline`]: composes the layers into per-operation stacks

pub mod cache;
pub mod instrument;
pub mod pipeline;

pub use cache::{CacheLayer, CacheService};
pub use instrument::{InstrumentLayer, InstrumentService};
pub use pipeline::{build_base_stack, build_reader_stack, BaseStack, ReaderStack};
