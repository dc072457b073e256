//! Connector identity and the registration-time compatibility gate.

use std::fmt;
use std::sync::Arc;

use conduit_core::{Version, VersionRange};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Version of this framework, checked against each connector's declared
/// framework range. Kept equal to the crate version.
pub const FRAMEWORK_VERSION: Version = Version::new(0, 1, 0, 0);

// ---------------------------------------------------------------------------
// ConnectorKey / ConnectorInfo
// ---------------------------------------------------------------------------

/// Identifies one connector inside one bundle release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorKey {
    pub bundle_name: String,
    pub bundle_version: Version,
    pub connector_name: String,
}

impl ConnectorKey {
    #[must_use]
    pub fn new(
        bundle_name: impl Into<String>,
        bundle_version: Version,
        connector_name: impl Into<String>,
    ) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            bundle_version,
            connector_name: connector_name.into(),
        }
    }
}

impl fmt::Display for ConnectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.bundle_name, self.bundle_version, self.connector_name
        )
    }
}

/// Immutable connector metadata, shared by every facade built for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub key: ConnectorKey,
    pub display_name: String,
    /// Framework versions the connector was built against. `None` accepts any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_versions: Option<VersionRange>,
}

impl ConnectorInfo {
    #[must_use]
    pub fn new(key: ConnectorKey, display_name: impl Into<String>) -> Self {
        Self {
            key,
            display_name: display_name.into(),
            framework_versions: None,
        }
    }

    #[must_use]
    pub fn requiring_framework(mut self, range: VersionRange) -> Self {
        self.framework_versions = Some(range);
        self
    }

    /// The declared framework range, if it excludes `framework`.
    #[must_use]
    pub fn incompatible_with(&self, framework: &Version) -> Option<VersionRange> {
        self.framework_versions
            .filter(|range| !range.is_in_range(framework))
    }
}

// ---------------------------------------------------------------------------
// ConnectorCatalog
// ---------------------------------------------------------------------------

/// Registered connectors, keyed by [`ConnectorKey`].
#[derive(Debug, Default)]
pub struct ConnectorCatalog {
    entries: DashMap<ConnectorKey, Arc<ConnectorInfo>>,
}

impl ConnectorCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connector after checking its framework requirement.
    ///
    /// # Errors
    ///
    /// `IncompatibleFramework` if the declared range excludes
    /// [`FRAMEWORK_VERSION`]; `Duplicate` if the key is already present.
    pub fn register(&self, info: ConnectorInfo) -> Result<Arc<ConnectorInfo>, CatalogError> {
        if let Some(required) = info.incompatible_with(&FRAMEWORK_VERSION) {
            tracing::warn!(
                connector = %info.key,
                required = %required,
                running = %FRAMEWORK_VERSION,
                "rejecting connector built for another framework version"
            );
            return Err(CatalogError::IncompatibleFramework {
                connector: info.key,
                required,
                running: FRAMEWORK_VERSION,
            });
        }
        match self.entries.entry(info.key.clone()) {
            Entry::Occupied(_) => Err(CatalogError::Duplicate { key: info.key }),
            Entry::Vacant(slot) => {
                tracing::debug!(connector = %info.key, "connector registered");
                let info = Arc::new(info);
                slot.insert(Arc::clone(&info));
                Ok(info)
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &ConnectorKey) -> Option<Arc<ConnectorInfo>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Highest bundle version of `connector_name` in `bundle_name` whose
    /// version lies in `versions`.
    #[must_use]
    pub fn find(
        &self,
        bundle_name: &str,
        connector_name: &str,
        versions: &VersionRange,
    ) -> Option<Arc<ConnectorInfo>> {
        self.entries
            .iter()
            .filter(|entry| {
                let key = entry.key();
                key.bundle_name == bundle_name
                    && key.connector_name == connector_name
                    && versions.is_in_range(&key.bundle_version)
            })
            .max_by_key(|entry| entry.key().bundle_version)
            .map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
