//! Conduit Core: versions, version ranges, the filter algebra, and the connector
//! object model shared by the framework and by backend connectors.

pub mod error;
pub mod filter;
pub mod types;
pub mod version;
pub mod version_range;

pub use error::VersionParseError;
pub use filter::{Filter, FilterVisitor, Junction, JunctionKind, ObjectMatcher};
pub use types::{
    Attribute, ConnectorObject, GuardedString, ObjectClass, ObjectClassInfo, OperationOptions,
    Schema, ScriptContext, SyncDelta, SyncDeltaType, SyncToken, Uid, Value,
};
pub use version::Version;
pub use version_range::VersionRange;
