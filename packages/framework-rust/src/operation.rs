//! Operation kinds, requests, outputs, and the errors a facade call can return.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use conduit_core::{
    Attribute, ConnectorObject, Filter, GuardedString, ObjectClass, OperationOptions, Schema,
    ScriptContext, SyncDelta, SyncToken, Uid, Value,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ConnectorError;
use crate::sink::ResultSink;

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Tag identifying one category of connector call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Schema,
    Create,
    Delete,
    Search,
    Update,
    Authenticate,
    ResolveUsername,
    ScriptOnConnector,
    ScriptOnResource,
    GetObject,
    Test,
    Validate,
    Sync,
    GetLatestSyncToken,
}

impl OperationKind {
    pub const ALL: [OperationKind; 14] = [
        OperationKind::Schema,
        OperationKind::Create,
        OperationKind::Delete,
        OperationKind::Search,
        OperationKind::Update,
        OperationKind::Authenticate,
        OperationKind::ResolveUsername,
        OperationKind::ScriptOnConnector,
        OperationKind::ScriptOnResource,
        OperationKind::GetObject,
        OperationKind::Test,
        OperationKind::Validate,
        OperationKind::Sync,
        OperationKind::GetLatestSyncToken,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::Schema => "schema",
            OperationKind::Create => "create",
            OperationKind::Delete => "delete",
            OperationKind::Search => "search",
            OperationKind::Update => "update",
            OperationKind::Authenticate => "authenticate",
            OperationKind::ResolveUsername => "resolve_username",
            OperationKind::ScriptOnConnector => "script_on_connector",
            OperationKind::ScriptOnResource => "script_on_resource",
            OperationKind::GetObject => "get_object",
            OperationKind::Test => "test",
            OperationKind::Validate => "validate",
            OperationKind::Sync => "sync",
            OperationKind::GetLatestSyncToken => "get_latest_sync_token",
        }
    }

    /// Streaming kinds deliver results incrementally to a handler.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, OperationKind::Search | OperationKind::Sync)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Requests and outputs
// ---------------------------------------------------------------------------

/// How an update applies the supplied attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Replace,
    AddValues,
    RemoveValues,
}

/// Arguments of one facade call. The variant determines the operation kind.
#[derive(Debug, Clone)]
pub enum OperationRequest {
    Schema,
    Create {
        object_class: ObjectClass,
        attributes: Vec<Attribute>,
        options: OperationOptions,
    },
    Delete {
        object_class: ObjectClass,
        uid: Uid,
        options: OperationOptions,
    },
    Search {
        object_class: ObjectClass,
        filter: Option<Filter>,
        options: OperationOptions,
    },
    Update {
        object_class: ObjectClass,
        uid: Uid,
        attributes: Vec<Attribute>,
        mode: UpdateMode,
        options: OperationOptions,
    },
    Authenticate {
        object_class: ObjectClass,
        username: String,
        password: GuardedString,
        options: OperationOptions,
    },
    ResolveUsername {
        object_class: ObjectClass,
        username: String,
        options: OperationOptions,
    },
    ScriptOnConnector {
        script: ScriptContext,
        options: OperationOptions,
    },
    ScriptOnResource {
        script: ScriptContext,
        options: OperationOptions,
    },
    GetObject {
        object_class: ObjectClass,
        uid: Uid,
        options: OperationOptions,
    },
    Test,
    Validate,
    Sync {
        object_class: ObjectClass,
        token: Option<SyncToken>,
        options: OperationOptions,
    },
    GetLatestSyncToken {
        object_class: ObjectClass,
    },
}

impl OperationRequest {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Schema => OperationKind::Schema,
            OperationRequest::Create { .. } => OperationKind::Create,
            OperationRequest::Delete { .. } => OperationKind::Delete,
            OperationRequest::Search { .. } => OperationKind::Search,
            OperationRequest::Update { .. } => OperationKind::Update,
            OperationRequest::Authenticate { .. } => OperationKind::Authenticate,
            OperationRequest::ResolveUsername { .. } => OperationKind::ResolveUsername,
            OperationRequest::ScriptOnConnector { .. } => OperationKind::ScriptOnConnector,
            OperationRequest::ScriptOnResource { .. } => OperationKind::ScriptOnResource,
            OperationRequest::GetObject { .. } => OperationKind::GetObject,
            OperationRequest::Test => OperationKind::Test,
            OperationRequest::Validate => OperationKind::Validate,
            OperationRequest::Sync { .. } => OperationKind::Sync,
            OperationRequest::GetLatestSyncToken { .. } => OperationKind::GetLatestSyncToken,
        }
    }
}

/// One item of a streaming result.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Object(ConnectorObject),
    Delta(SyncDelta),
}

/// How a streaming call ended on the caller's side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Items handed to the caller's handler.
    pub delivered: u64,
    /// The handler asked to stop before the producer finished.
    pub stopped_early: bool,
}

/// Successful result of a facade call.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    Schema(Schema),
    Uid(Uid),
    Object(Option<ConnectorObject>),
    ScriptResult(Value),
    SyncToken(Option<SyncToken>),
    Streamed(StreamOutcome),
    Done,
}

// ---------------------------------------------------------------------------
// CallContext / Invocation
// ---------------------------------------------------------------------------

/// Context carried with every call through the chain to the implementation.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_id: u64,
    pub kind: OperationKind,
    cancel: CancellationToken,
}

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

impl CallContext {
    #[must_use]
    pub fn new(call_id: u64, kind: OperationKind) -> Self {
        Self {
            call_id,
            kind,
            cancel: CancellationToken::new(),
        }
    }

    /// A context with a process-wide unique call id.
    #[must_use]
    pub fn next(kind: OperationKind) -> Self {
        Self::new(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed), kind)
    }

    /// Set once the caller has been released (timeout or early stop).
    /// Implementations should check it between units of work.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle for `select!`-ing on cancellation.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// The request type flowing through the proxy chain.
#[derive(Debug)]
pub struct Invocation {
    pub ctx: CallContext,
    pub request: OperationRequest,
    /// Present for streaming kinds only.
    pub results: Option<ResultSink>,
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Errors returned by a facade call.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("operation `{kind}` not supported")]
    Unsupported { kind: OperationKind },
    /// Raised by the connector implementation, passed through untouched.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("operation `{kind}` timed out after {timeout_ms}ms")]
    Timeout { kind: OperationKind, timeout_ms: u64 },
    #[error("invalid `{kind}` invocation: {reason}")]
    InvalidInvocation {
        kind: OperationKind,
        reason: &'static str,
    },
    #[error("connector returned a result that does not fit `{kind}`")]
    UnexpectedOutput { kind: OperationKind },
    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl OperationError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, OperationError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_search_and_sync_stream() {
        let streaming: Vec<_> = OperationKind::ALL
            .into_iter()
            .filter(|k| k.is_streaming())
            .collect();
        assert_eq!(streaming, vec![OperationKind::Search, OperationKind::Sync]);
    }

    #[test]
    fn kind_names_round_trip_through_serde() {
        for kind in OperationKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: OperationKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn request_variant_determines_kind() {
        let class = ObjectClass::account();
        assert_eq!(OperationRequest::Test.kind(), OperationKind::Test);
        assert_eq!(
            OperationRequest::GetLatestSyncToken { object_class: class.clone() }.kind(),
            OperationKind::GetLatestSyncToken
        );
        assert_eq!(
            OperationRequest::Search {
                object_class: class,
                filter: None,
                options: OperationOptions::new(),
            }
            .kind(),
            OperationKind::Search
        );
    }

    #[test]
    fn next_contexts_have_distinct_ids() {
        let first = CallContext::next(OperationKind::Test);
        let second = CallContext::next(OperationKind::Schema);
        assert_ne!(first.call_id, second.call_id);
        assert_eq!(second.kind, OperationKind::Schema);
        assert!(!second.is_cancelled());
    }

    #[test]
    fn timeout_is_distinct_from_connector_error() {
        let timeout = OperationError::Timeout {
            kind: OperationKind::Search,
            timeout_ms: 50,
        };
        let failed = OperationError::from(ConnectorError::ConnectionFailed {
            message: "refused".to_string(),
        });
        assert!(timeout.is_timeout());
        assert!(!failed.is_timeout());
        assert_eq!(timeout.to_string(), "operation `search` timed out after 50ms");
        assert_eq!(failed.to_string(), "connection failed: refused");
    }

    #[test]
    fn cancellation_is_shared_by_clones() {
        let ctx = CallContext::new(7, OperationKind::Sync);
        let copy = ctx.clone();
        assert!(!copy.is_cancelled());
        ctx.cancel();
        assert!(copy.is_cancelled());
        assert!(ctx.cancellation_token().is_cancelled());
    }
}
