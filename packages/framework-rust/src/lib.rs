//! Conduit Framework: the invocation core of the connector framework.
//!
//! A [`ConnectorFacade`] dispatches typed operation requests to connector
//! implementations through a tower chain of instrumentation and a timeout
//! guard that bounds every call and buffers streamed results.

pub mod catalog;
pub mod config;
pub mod error;
pub mod facade;
pub mod memory;
pub mod middleware;
pub mod operation;
pub mod registry;
pub mod sink;
pub mod target;
pub mod traits;

pub use catalog::{ConnectorCatalog, ConnectorInfo, ConnectorKey, FRAMEWORK_VERSION};
pub use config::{ApiConfiguration, OperationSettings};
pub use error::{CatalogError, ConnectorError, ConnectorResult, FacadeError, RegistryError};
pub use facade::ConnectorFacade;
pub use memory::MemoryConnector;
pub use operation::{
    CallContext, Invocation, OperationError, OperationKind, OperationOutput, OperationRequest,
    StreamItem, StreamOutcome, UpdateMode,
};
pub use registry::OperationRegistry;
pub use sink::{ResultSink, ResultsHandler};
pub use target::OperationTarget;
pub use traits::{SingleResultOperation, StreamingOperation};
