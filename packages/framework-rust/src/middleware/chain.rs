//! Chain composition: wraps a raw implementation with the middleware layers.

use tower::ServiceBuilder;

use super::instrumentation::{InstrumentationLayer, InstrumentationService};
use super::timeout::{TimeoutGuardLayer, TimeoutGuardService};
use crate::config::OperationSettings;
use crate::operation::OperationKind;
use crate::target::OperationTarget;

/// The fully composed service for one operation kind.
pub type OperationChain = InstrumentationService<TimeoutGuardService<OperationTarget>>;

/// Build the chain for `kind` around `target`.
///
/// Layer order (outermost to innermost):
/// 1. `InstrumentationLayer` -- spans and metrics, sees timeouts as outcomes
/// 2. `TimeoutGuardLayer` -- deadline and bounded streaming buffer
///
/// This is the only place the per-kind timeout and the buffer capacity are
/// read from the settings.
#[must_use]
pub fn build_operation_chain(
    kind: OperationKind,
    target: OperationTarget,
    settings: &OperationSettings,
) -> OperationChain {
    ServiceBuilder::new()
        .layer(InstrumentationLayer::new(kind))
        .layer(TimeoutGuardLayer::new(
            kind,
            settings.timeout_for(kind),
            settings.buffer_size(),
        ))
        .service(target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
