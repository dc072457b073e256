use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::ConnectorInfo;
use crate::operation::OperationKind;

/// Default per-call timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default capacity of the per-call channel between a streaming producer and
/// the caller.
pub const DEFAULT_PRODUCER_BUFFER_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// OperationSettings
// ---------------------------------------------------------------------------

/// Per-facade operation configuration.
///
/// Controls which operation kinds are exposed, how long each may run, and how
/// many streamed results may wait between producer and caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationSettings {
    /// Operation kinds callers may invoke. Everything else is rejected as
    /// unsupported.
    pub supported_operations: BTreeSet<OperationKind>,
    /// Timeout for kinds without an override, in milliseconds.
    pub default_timeout_ms: u64,
    /// Per-kind timeout overrides in milliseconds.
    pub timeouts: BTreeMap<OperationKind, u64>,
    /// Capacity of the streaming result channel. Zero is treated as one.
    pub producer_buffer_size: usize,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            supported_operations: BTreeSet::new(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            timeouts: BTreeMap::new(),
            producer_buffer_size: DEFAULT_PRODUCER_BUFFER_SIZE,
        }
    }
}

impl OperationSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input or unknown kinds.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_supported(mut self, kinds: impl IntoIterator<Item = OperationKind>) -> Self {
        self.supported_operations.extend(kinds);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, kind: OperationKind, timeout: Duration) -> Self {
        self.timeouts.insert(kind, duration_ms(timeout));
        self
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.producer_buffer_size = size;
        self
    }

    #[must_use]
    pub fn is_supported(&self, kind: OperationKind) -> bool {
        self.supported_operations.contains(&kind)
    }

    #[must_use]
    pub fn timeout_for(&self, kind: OperationKind) -> Duration {
        let ms = self
            .timeouts
            .get(&kind)
            .copied()
            .unwrap_or(self.default_timeout_ms);
        Duration::from_millis(ms)
    }

    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.producer_buffer_size.max(1)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// ApiConfiguration
// ---------------------------------------------------------------------------

/// What a facade is built from: an owned settings value plus a shared handle
/// to the connector's identity.
///
/// The identity is never copied; it is the key connectors are looked up and
/// pooled by.
#[derive(Debug, Clone)]
pub struct ApiConfiguration {
    pub connector: Arc<ConnectorInfo>,
    pub settings: OperationSettings,
}

impl ApiConfiguration {
    #[must_use]
    pub fn new(connector: Arc<ConnectorInfo>, settings: OperationSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    /// Adjust settings before a facade is built from this configuration.
    pub fn settings_mut(&mut self) -> &mut OperationSettings {
        &mut self.settings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = OperationSettings::default();
        assert!(settings.supported_operations.is_empty());
        assert_eq!(
            settings.timeout_for(OperationKind::Search),
            Duration::from_secs(30)
        );
        assert_eq!(settings.buffer_size(), 100);
    }

    #[test]
    fn overrides_take_precedence() {
        let settings = OperationSettings::default()
            .with_default_timeout(Duration::from_secs(5))
            .with_timeout(OperationKind::Sync, Duration::from_millis(250));
        assert_eq!(
            settings.timeout_for(OperationKind::Sync),
            Duration::from_millis(250)
        );
        assert_eq!(
            settings.timeout_for(OperationKind::Create),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn oversized_timeout_saturates() {
        let settings = OperationSettings::default().with_timeout(OperationKind::Test, Duration::MAX);
        assert_eq!(
            settings.timeout_for(OperationKind::Test),
            Duration::from_millis(u64::MAX)
        );
    }

    #[test]
    fn zero_buffer_is_clamped() {
        let settings = OperationSettings::default().with_buffer_size(0);
        assert_eq!(settings.buffer_size(), 1);
    }

    #[test]
    fn parses_json_with_defaults() {
        let settings = OperationSettings::from_json(
            r#"{
                "supported_operations": ["search", "get_latest_sync_token"],
                "timeouts": { "search": 1500 }
            }"#,
        )
        .unwrap();
        assert!(settings.is_supported(OperationKind::Search));
        assert!(settings.is_supported(OperationKind::GetLatestSyncToken));
        assert!(!settings.is_supported(OperationKind::Create));
        assert_eq!(
            settings.timeout_for(OperationKind::Search),
            Duration::from_millis(1500)
        );
        assert_eq!(settings.default_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(settings.producer_buffer_size, DEFAULT_PRODUCER_BUFFER_SIZE);
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(OperationSettings::from_json(r#"{"supported_operations": ["teleport"]}"#).is_err());
    }
}
