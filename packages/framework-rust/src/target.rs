//! The innermost service of every chain: the raw connector implementation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use crate::operation::{Invocation, OperationError, OperationOutput};
use crate::traits::{SingleResultOperation, StreamingOperation};

/// Boxed future returned by every service in the chain.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<OperationOutput, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// OperationTarget
// ---------------------------------------------------------------------------

/// A registered implementation, tagged by capability.
#[derive(Clone)]
pub enum OperationTarget {
    Single(Arc<dyn SingleResultOperation>),
    Streaming(Arc<dyn StreamingOperation>),
}

impl OperationTarget {
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, OperationTarget::Streaming(_))
    }
}

impl fmt::Debug for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationTarget::Single(_) => f.write_str("OperationTarget::Single"),
            OperationTarget::Streaming(_) => f.write_str("OperationTarget::Streaming"),
        }
    }
}

impl Service<Invocation> for OperationTarget {
    type Response = OperationOutput;
    type Error = OperationError;
    type Future = BoxFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, inv: Invocation) -> Self::Future {
        let Invocation {
            ctx,
            request,
            results,
        } = inv;
        match self.clone() {
            OperationTarget::Single(op) => Box::pin(async move {
                op.execute(request, &ctx)
                    .await
                    .map_err(OperationError::from)
            }),
            OperationTarget::Streaming(op) => {
                let Some(mut sink) = results else {
                    let kind = ctx.kind;
                    return Box::pin(async move {
                        Err(OperationError::InvalidInvocation {
                            kind,
                            reason: "streaming operation called without a results handler",
                        })
                    });
                };
                Box::pin(async move {
                    op.execute(request, &mut sink, &ctx).await?;
                    Ok(OperationOutput::Streamed(sink.outcome()))
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use conduit_core::{ConnectorObject, ObjectClass, OperationOptions, Uid};
    use tower::ServiceExt;

    use super::*;
    use crate::error::{ConnectorError, ConnectorResult};
    use crate::operation::{CallContext, OperationKind, OperationRequest, StreamItem};
    use crate::sink::ResultSink;

    struct Echo;

    #[async_trait]
    impl SingleResultOperation for Echo {
        async fn execute(
            &self,
            _request: OperationRequest,
            ctx: &CallContext,
        ) -> ConnectorResult<OperationOutput> {
            Ok(OperationOutput::Uid(Uid::new(ctx.call_id.to_string())))
        }
    }

    struct Three;

    #[async_trait]
    impl StreamingOperation for Three {
        async fn execute(
            &self,
            _request: OperationRequest,
            results: &mut ResultSink,
            _ctx: &CallContext,
        ) -> ConnectorResult<()> {
            for n in 0..3 {
                let obj = ConnectorObject::new(ObjectClass::account(), Uid::new(n.to_string()));
                if !results.push(StreamItem::Object(obj)).await {
                    break;
                }
            }
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl SingleResultOperation for Broken {
        async fn execute(
            &self,
            _request: OperationRequest,
            _ctx: &CallContext,
        ) -> ConnectorResult<OperationOutput> {
            Err(ConnectorError::ConnectionFailed {
                message: "down".to_string(),
            })
        }
    }

    fn search_request() -> OperationRequest {
        OperationRequest::Search {
            object_class: ObjectClass::account(),
            filter: None,
            options: OperationOptions::new(),
        }
    }

    #[tokio::test]
    async fn single_target_returns_implementation_value() {
        let target = OperationTarget::Single(Arc::new(Echo));
        let inv = Invocation {
            ctx: CallContext::new(9, OperationKind::Test),
            request: OperationRequest::Test,
            results: None,
        };
        let out = target.oneshot(inv).await.unwrap();
        assert_eq!(out, OperationOutput::Uid(Uid::new("9")));
    }

    #[tokio::test]
    async fn single_target_passes_connector_error_through() {
        let target = OperationTarget::Single(Arc::new(Broken));
        let inv = Invocation {
            ctx: CallContext::new(1, OperationKind::Test),
            request: OperationRequest::Test,
            results: None,
        };
        let err = target.oneshot(inv).await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::Connector(ConnectorError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn streaming_target_reports_sink_outcome() {
        let target = OperationTarget::Streaming(Arc::new(Three));
        let inv = Invocation {
            ctx: CallContext::new(1, OperationKind::Search),
            request: search_request(),
            results: Some(ResultSink::new(|_item: StreamItem| true)),
        };
        let out = target.oneshot(inv).await.unwrap();
        match out {
            OperationOutput::Streamed(outcome) => {
                assert_eq!(outcome.delivered, 3);
                assert!(!outcome.stopped_early);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn streaming_target_requires_a_sink() {
        let target = OperationTarget::Streaming(Arc::new(Three));
        let inv = Invocation {
            ctx: CallContext::new(1, OperationKind::Search),
            request: search_request(),
            results: None,
        };
        let err = target.oneshot(inv).await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::InvalidInvocation {
                kind: OperationKind::Search,
                ..
            }
        ));
    }
}
