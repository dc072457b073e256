//! Capability traits implemented by connectors.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::operation::{CallContext, OperationOutput, OperationRequest};
use crate::sink::ResultSink;

/// An implementation that answers a call with one value.
///
/// Runs on its own task behind the timeout guard. Once the caller has been
/// released `ctx.is_cancelled()` turns true; the result is then discarded.
#[async_trait]
pub trait SingleResultOperation: Send + Sync + 'static {
    async fn execute(
        &self,
        request: OperationRequest,
        ctx: &CallContext,
    ) -> ConnectorResult<OperationOutput>;
}

/// An implementation that emits results incrementally through a [`ResultSink`].
///
/// Must stop producing once `results.push(..)` returns `false`.
#[async_trait]
pub trait StreamingOperation: Send + Sync + 'static {
    async fn execute(
        &self,
        request: OperationRequest,
        results: &mut ResultSink,
        ctx: &CallContext,
    ) -> ConnectorResult<()>;
}
