//! Instrumentation middleware for connector operations.
//!
//! Opens a `tracing` span per call and records the outcome and duration as
//! span fields and as `metrics` counters/histograms. Never alters the request,
//! the output or the error.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::operation::{Invocation, OperationError, OperationKind, OperationOutput};
use crate::target::BoxFuture;

/// Counter of finished calls, labelled by `kind` and `outcome`.
pub const OPERATIONS_TOTAL: &str = "connector_operations_total";
/// Histogram of call durations in seconds, labelled by `kind`.
pub const OPERATION_DURATION_SECONDS: &str = "connector_operation_duration_seconds";

/// Outcome label for a finished call.
#[must_use]
pub fn outcome_label(result: &Result<OperationOutput, OperationError>) -> &'static str {
    match result {
        Ok(OperationOutput::Streamed(outcome)) if outcome.stopped_early => "stopped",
        Ok(_) => "ok",
        Err(OperationError::Timeout { .. }) => "timeout",
        Err(OperationError::Unsupported { .. }) => "unsupported",
        Err(_) => "error",
    }
}

/// Count a call that finished with `outcome`.
pub fn record_outcome(kind: OperationKind, outcome: &'static str) {
    metrics::counter!(OPERATIONS_TOTAL, "kind" => kind.as_str(), "outcome" => outcome).increment(1);
}

// ---------------------------------------------------------------------------
// InstrumentationLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps an operation chain with tracing and metrics.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentationLayer {
    kind: OperationKind,
}

impl InstrumentationLayer {
    #[must_use]
    pub fn new(kind: OperationKind) -> Self {
        Self { kind }
    }
}

impl<S> Layer<S> for InstrumentationLayer {
    type Service = InstrumentationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentationService {
            inner,
            kind: self.kind,
        }
    }
}

// ---------------------------------------------------------------------------
// InstrumentationService
// ---------------------------------------------------------------------------

/// Service wrapper that records call duration and outcome.
#[derive(Debug, Clone)]
pub struct InstrumentationService<S> {
    inner: S,
    kind: OperationKind,
}

impl<S> Service<Invocation> for InstrumentationService<S>
where
    S: Service<Invocation, Response = OperationOutput, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationOutput;
    type Error = OperationError;
    type Future = BoxFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, inv: Invocation) -> Self::Future {
        let kind = self.kind;
        let call_id = inv.ctx.call_id;

        let span = info_span!(
            "connector_operation",
            kind = kind.as_str(),
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = {
            let _entered = span.enter();
            tracing::debug!("operation started");
            self.inner.call(inv)
        };

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();
                let outcome = outcome_label(&result);

                let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                record_outcome(kind, outcome);
                metrics::histogram!(OPERATION_DURATION_SECONDS, "kind" => kind.as_str())
                    .record(elapsed.as_secs_f64());

                match &result {
                    Err(err) => tracing::info!(
                        kind = kind.as_str(),
                        call_id,
                        duration_ms,
                        outcome,
                        error = %err,
                        "operation failed"
                    ),
                    Ok(_) => tracing::info!(
                        kind = kind.as_str(),
                        call_id,
                        duration_ms,
                        outcome,
                        "operation complete"
                    ),
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
