//! Per-connector record of which implementation handles each operation kind.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::operation::OperationKind;
use crate::target::OperationTarget;
use crate::traits::{SingleResultOperation, StreamingOperation};

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Maps operation kinds to their raw implementations.
///
/// Registration checks the capability category: streaming kinds (`Search`,
/// `Sync`) take a [`StreamingOperation`], every other kind a
/// [`SingleResultOperation`]. A later registration for the same kind replaces
/// the earlier one.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    targets: HashMap<OperationKind, OperationTarget>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single-result implementation for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::CategoryMismatch` if `kind` is a streaming kind.
    pub fn register_single(
        &mut self,
        kind: OperationKind,
        op: Arc<dyn SingleResultOperation>,
    ) -> Result<&mut Self, RegistryError> {
        if kind.is_streaming() {
            return Err(RegistryError::CategoryMismatch {
                kind,
                expected: "streaming",
            });
        }
        self.targets.insert(kind, OperationTarget::Single(op));
        Ok(self)
    }

    /// Register a streaming implementation for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::CategoryMismatch` if `kind` is a single-result kind.
    pub fn register_streaming(
        &mut self,
        kind: OperationKind,
        op: Arc<dyn StreamingOperation>,
    ) -> Result<&mut Self, RegistryError> {
        if !kind.is_streaming() {
            return Err(RegistryError::CategoryMismatch {
                kind,
                expected: "single-result",
            });
        }
        self.targets.insert(kind, OperationTarget::Streaming(op));
        Ok(self)
    }

    #[must_use]
    pub fn target(&self, kind: OperationKind) -> Option<&OperationTarget> {
        self.targets.get(&kind)
    }

    #[must_use]
    pub fn contains(&self, kind: OperationKind) -> bool {
        self.targets.contains_key(&kind)
    }

    /// Registered kinds in declaration order.
    #[must_use]
    pub fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<_> = self.targets.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::ConnectorResult;
    use crate::operation::{CallContext, OperationOutput, OperationRequest};
    use crate::sink::ResultSink;

    struct Noop;

    #[async_trait]
    impl SingleResultOperation for Noop {
        async fn execute(
            &self,
            _request: OperationRequest,
            _ctx: &CallContext,
        ) -> ConnectorResult<OperationOutput> {
            Ok(OperationOutput::Done)
        }
    }

    #[async_trait]
    impl StreamingOperation for Noop {
        async fn execute(
            &self,
            _request: OperationRequest,
            _results: &mut ResultSink,
            _ctx: &CallContext,
        ) -> ConnectorResult<()> {
            Ok(())
        }
    }

    #[test]
    fn registers_by_category() {
        let noop = Arc::new(Noop);
        let mut registry = OperationRegistry::new();
        registry
            .register_single(OperationKind::Test, noop.clone())
            .unwrap()
            .register_streaming(OperationKind::Search, noop)
            .unwrap();

        assert!(registry.contains(OperationKind::Test));
        assert!(registry.contains(OperationKind::Search));
        assert!(!registry.contains(OperationKind::Sync));
        assert!(registry.target(OperationKind::Search).unwrap().is_streaming());
        assert_eq!(
            registry.kinds(),
            vec![OperationKind::Search, OperationKind::Test]
        );
    }

    #[test]
    fn rejects_wrong_category() {
        let noop = Arc::new(Noop);
        let mut registry = OperationRegistry::new();

        let err = registry
            .register_single(OperationKind::Sync, noop.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CategoryMismatch {
                kind: OperationKind::Sync,
                expected: "streaming"
            }
        ));

        let err = registry
            .register_streaming(OperationKind::Create, noop)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CategoryMismatch {
                kind: OperationKind::Create,
                ..
            }
        ));
        assert!(registry.kinds().is_empty());
    }
}
