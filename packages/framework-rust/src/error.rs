//! Errors raised by connector implementations and by framework setup.

use conduit_core::{Uid, Version, VersionRange};

use crate::catalog::ConnectorKey;
use crate::operation::OperationKind;

/// Error returned by a connector implementation.
///
/// The proxy chain never rewrites these; callers see exactly what the
/// implementation produced, wrapped in `OperationError::Connector`.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("unknown uid `{uid}`")]
    UnknownUid { uid: Uid },

    #[error("object `{uid}` already exists")]
    AlreadyExists { uid: Uid },

    #[error("invalid credential for `{username}`")]
    InvalidCredential { username: String },

    #[error("invalid value for attribute `{attribute}`: {message}")]
    InvalidAttributeValue { attribute: String, message: String },

    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result alias for connector implementations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors from building an [`OperationRegistry`](crate::registry::OperationRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("operation `{kind}` needs a {expected} implementation")]
    CategoryMismatch {
        kind: OperationKind,
        expected: &'static str,
    },
}

/// Errors from constructing a [`ConnectorFacade`](crate::facade::ConnectorFacade).
#[derive(Debug, thiserror::Error)]
pub enum FacadeError {
    #[error("operation `{kind}` is declared supported but has no implementation")]
    MissingImplementation { kind: OperationKind },

    #[error("connector {connector} requires framework {required}, running {running}")]
    IncompatibleFramework {
        connector: ConnectorKey,
        required: VersionRange,
        running: Version,
    },
}

/// Errors from registering connectors in a [`ConnectorCatalog`](crate::catalog::ConnectorCatalog).
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("connector {connector} requires framework {required}, running {running}")]
    IncompatibleFramework {
        connector: ConnectorKey,
        required: VersionRange,
        running: Version,
    },

    #[error("connector {key} is already registered")]
    Duplicate { key: ConnectorKey },
}
