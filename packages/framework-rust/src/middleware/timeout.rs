//! Timeout guard for connector operations.
//!
//! Runs the implementation on a dedicated blocking-pool thread and releases
//! the caller when the deadline passes, whether or not the implementation has
//! finished. The producer never shares a worker with the caller, so an
//! implementation that blocks its thread cannot stall the caller even on a
//! current-thread runtime. Streaming calls go through a bounded channel
//! drained on the caller's task, so a slow caller throttles the producer.

use std::future::Future;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

use crate::operation::{
    CallContext, Invocation, OperationError, OperationKind, OperationOutput, StreamItem,
};
use crate::sink::ResultSink;
use crate::target::BoxFuture;

// ---------------------------------------------------------------------------
// TimeoutGuardLayer
// ---------------------------------------------------------------------------

/// Tower layer enforcing a per-kind deadline and streaming buffer capacity.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuardLayer {
    kind: OperationKind,
    timeout: Duration,
    buffer_capacity: usize,
}

impl TimeoutGuardLayer {
    #[must_use]
    pub fn new(kind: OperationKind, timeout: Duration, buffer_capacity: usize) -> Self {
        Self {
            kind,
            timeout,
            buffer_capacity: buffer_capacity.max(1),
        }
    }
}

impl<S> Layer<S> for TimeoutGuardLayer {
    type Service = TimeoutGuardService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutGuardService {
            inner,
            guard: *self,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutGuardService
// ---------------------------------------------------------------------------

/// Service wrapper that bounds every call by a wall-clock deadline.
#[derive(Debug, Clone)]
pub struct TimeoutGuardService<S> {
    inner: S,
    guard: TimeoutGuardLayer,
}

impl<S> Service<Invocation> for TimeoutGuardService<S>
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

    fn call(&mut self, mut inv: Invocation) -> Self::Future {
        let guard = self.guard;
        let deadline = Instant::now() + guard.timeout;
        let ctx = inv.ctx.clone();

        match inv.results.take() {
            None => {
                let producer = spawn_producer(self.inner.call(inv).in_current_span());
                Box::pin(async move { guard.await_single(producer, deadline, &ctx).await })
            }
            Some(caller) => {
                let (buffered, rx) =
                    ResultSink::channel(guard.buffer_capacity, ctx.cancellation_token());
                inv.results = Some(buffered);
                let producer = spawn_producer(self.inner.call(inv).in_current_span());
                Box::pin(async move {
                    guard
                        .drain_stream(producer, rx, caller, deadline, &ctx)
                        .await
                })
            }
        }
    }
}

type Producer = JoinHandle<Result<OperationOutput, OperationError>>;

/// Drive `fut` to completion on its own blocking-pool thread.
///
/// Timers and I/O inside `fut` still use the caller's runtime.
fn spawn_producer<F>(fut: F) -> Producer
where
    F: Future<Output = Result<OperationOutput, OperationError>> + Send + 'static,
{
    let runtime = Handle::current();
    tokio::task::spawn_blocking(move || runtime.block_on(fut))
}

impl TimeoutGuardLayer {
    async fn await_single(
        self,
        producer: Producer,
        deadline: Instant,
        ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        match tokio::time::timeout_at(deadline, producer).await {
            // A result that lands together with the deadline is still late.
            Ok(_) if Instant::now() >= deadline => Err(self.expire(ctx)),
            Ok(joined) => joined.map_err(|err| self.producer_failed(&err))?,
            Err(_elapsed) => Err(self.expire(ctx)),
        }
    }

    /// Forward buffered items to the caller until the producer finishes, the
    /// caller declines an item, or the deadline passes. The deadline wins over
    /// items that are already buffered.
    async fn drain_stream(
        self,
        producer: Producer,
        mut rx: mpsc::Receiver<StreamItem>,
        mut caller: ResultSink,
        deadline: Instant,
        ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;
                () = &mut expired => return Err(self.expire(ctx)),
                item = rx.recv() => match item {
                    Some(item) => {
                        if !caller.push(item).await {
                            ctx.cancel();
                            tracing::debug!(
                                call_id = ctx.call_id,
                                delivered = caller.outcome().delivered,
                                "results handler stopped the stream"
                            );
                            return Ok(OperationOutput::Streamed(caller.outcome()));
                        }
                    }
                    // The producer's sink is gone, so it has returned or panicked.
                    None => break,
                },
            }
        }

        match tokio::time::timeout_at(deadline, producer).await {
            Ok(_) if Instant::now() >= deadline => Err(self.expire(ctx)),
            Ok(joined) => {
                joined.map_err(|err| self.producer_failed(&err))??;
                Ok(OperationOutput::Streamed(caller.outcome()))
            }
            Err(_elapsed) => Err(self.expire(ctx)),
        }
    }

    fn expire(&self, ctx: &CallContext) -> OperationError {
        ctx.cancel();
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(
            kind = self.kind.as_str(),
            call_id = ctx.call_id,
            timeout_ms,
            "operation timed out, abandoning producer"
        );
        OperationError::Timeout {
            kind: self.kind,
            timeout_ms,
        }
    }

    fn producer_failed(&self, err: &tokio::task::JoinError) -> OperationError {
        tracing::error!(kind = self.kind.as_str(), error = %err, "producer task failed");
        OperationError::Internal(anyhow::anyhow!("`{}` producer task failed: {err}", self.kind))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
