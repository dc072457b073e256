//! Result delivery for streaming operations.
//!
//! An implementation only ever sees a [`ResultSink`]. Outside the timeout
//! guard the sink calls the caller's [`ResultsHandler`] directly; inside the
//! guard it is the sending half of a bounded per-call channel.

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::operation::{StreamItem, StreamOutcome};

// ---------------------------------------------------------------------------
// ResultsHandler
// ---------------------------------------------------------------------------

/// Per-item callback supplied by the caller of a streaming operation.
///
/// Returning `false` asks the producer to stop; items already in flight are
/// discarded.
pub trait ResultsHandler: Send + 'static {
    fn handle(&mut self, item: StreamItem) -> bool;
}

impl<F> ResultsHandler for F
where
    F: FnMut(StreamItem) -> bool + Send + 'static,
{
    fn handle(&mut self, item: StreamItem) -> bool {
        self(item)
    }
}

// ---------------------------------------------------------------------------
// ResultSink
// ---------------------------------------------------------------------------

enum Target {
    Direct(Box<dyn ResultsHandler>),
    Buffered {
        tx: mpsc::Sender<StreamItem>,
        cancel: CancellationToken,
    },
}

/// Where a streaming implementation pushes its results.
pub struct ResultSink {
    target: Target,
    delivered: u64,
    stopped: bool,
}

impl ResultSink {
    /// A sink that hands every item straight to `handler`.
    #[must_use]
    pub fn new(handler: impl ResultsHandler) -> Self {
        Self::from_boxed(Box::new(handler))
    }

    #[must_use]
    pub fn from_boxed(handler: Box<dyn ResultsHandler>) -> Self {
        Self {
            target: Target::Direct(handler),
            delivered: 0,
            stopped: false,
        }
    }

    /// A bounded channel sink. Pushing blocks while `capacity` items are
    /// waiting, and gives up as soon as `cancel` fires.
    pub(crate) fn channel(
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<StreamItem>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            target: Target::Buffered { tx, cancel },
            delivered: 0,
            stopped: false,
        };
        (sink, rx)
    }

    /// Emit one item. Returns `false` once the consumer no longer wants
    /// results; every later push is then a no-op returning `false`.
    pub async fn push(&mut self, item: StreamItem) -> bool {
        if self.stopped {
            return false;
        }
        let (delivered, accepted) = match &mut self.target {
            Target::Direct(handler) => (true, handler.handle(item)),
            Target::Buffered { tx, cancel } => {
                let sent = tokio::select! {
                    biased;
                    () = cancel.cancelled() => false,
                    sent = tx.send(item) => sent.is_ok(),
                };
                (sent, sent)
            }
        };
        if delivered {
            self.delivered += 1;
        }
        if !accepted {
            self.stopped = true;
        }
        accepted
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Items accepted so far and whether the consumer asked to stop.
    #[must_use]
    pub fn outcome(&self) -> StreamOutcome {
        StreamOutcome {
            delivered: self.delivered,
            stopped_early: self.stopped,
        }
    }
}

impl fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.target {
            Target::Direct(_) => "direct",
            Target::Buffered { .. } => "buffered",
        };
        f.debug_struct("ResultSink")
            .field("target", &target)
            .field("delivered", &self.delivered)
            .field("stopped", &self.stopped)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
