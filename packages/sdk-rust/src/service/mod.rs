//! Operation instrumentation framework.
//!
//! 1. **Declaration** (`component`, `operation`): a component lists its
//!    public operations in an [`OperationTable`]
//! 2. **Middleware** (`middleware`): tower layers for error normalization,
//!    event publication and result caching
//! 3. **Instrumentation** (`instrumented`): wraps every declared operation
//!    once, at construction
//! 4. **Registry** (`registry`): the instrumented components of a session

pub mod component;
pub mod instrumented;
pub mod middleware;
pub mod operation;
pub mod outcome;
pub mod registry;

pub use component::{Component, Reader};
pub use instrumented::{instrument, instrument_reader, Instrumented};
pub use operation::{OperationEntry, OperationTable, RawOperation, RegistrationError};
pub use outcome::{CallKind, Outcome};
pub use registry::{ManagedComponent, ServiceRegistry};
