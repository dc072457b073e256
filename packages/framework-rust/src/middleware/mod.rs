//! Tower middleware layers for the operation chain.
//!
//! - [`instrumentation`]: Call spans, outcome logging and metrics
//! - [`timeout`]: Deadline enforcement and bounded streaming buffer
//! - [`chain`]: Composes the layers around a raw implementation

pub mod chain;
pub mod instrumentation;
pub mod timeout;

pub use chain::{build_operation_chain, OperationChain};
pub use instrumentation::{InstrumentationLayer, InstrumentationService};
pub use timeout::{TimeoutGuardLayer, TimeoutGuardService};
