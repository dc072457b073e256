//! Discrete four-component release identifiers.
//!
//! A [`Version`] is the tuple `(major, minor, revision, build)`. Parsing accepts
//! one to four dot-separated decimal components; omitted trailing components
//! default to 0, so `"1.2"` and `"1.2.0.0"` are the same version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionParseError;

/// Number of components in a [`Version`].
pub const VERSION_COMPONENTS: usize = 4;

/// An ordered release identifier.
///
/// Ordering is lexicographic over `(major, minor, revision, build)`, which is
/// exactly the derived field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u32,
    minor: u32,
    revision: u32,
    build: u32,
}

impl Version {
    #[must_use]
    pub const fn new(major: u32, minor: u32, revision: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            build,
        }
    }

    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    #[must_use]
    pub const fn revision(&self) -> u32 {
        self.revision
    }

    /// The last component. Exclusive range bounds are normalized by stepping it.
    #[must_use]
    pub const fn build(&self) -> u32 {
        self.build
    }

    /// All four components in significance order.
    #[must_use]
    pub const fn components(&self) -> [u32; VERSION_COMPONENTS] {
        [self.major, self.minor, self.revision, self.build]
    }

    /// Parse a dotted numeric string such as `"1.4"` or `"1.4.0.2"`.
    ///
    /// Surrounding whitespace is ignored; whitespace inside the literal is not.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError::InvalidVersion`] when the text is empty, has
    /// more than four components, or a component is not a plain decimal `u32`.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(VersionParseError::invalid_version(input, "empty version"));
        }

        let mut components = [0u32; VERSION_COMPONENTS];
        let mut count = 0;
        for part in text.split('.') {
            if count == VERSION_COMPONENTS {
                return Err(VersionParseError::invalid_version(
                    input,
                    "more than four components",
                ));
            }
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionParseError::invalid_version(
                    input,
                    "components must be decimal digits",
                ));
            }
            components[count] = part
                .parse()
                .map_err(|_| VersionParseError::invalid_version(input, "component out of range"))?;
            count += 1;
        }

        let [major, minor, revision, build] = components;
        Ok(Self::new(major, minor, revision, build))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.revision, self.build
        )
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_components_default_to_zero() {
        assert_eq!(Version::parse("1").unwrap(), Version::new(1, 0, 0, 0));
        assert_eq!(Version::parse("1.2").unwrap(), Version::new(1, 2, 0, 0));
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3, 0));
        assert_eq!(Version::parse(" 1.2.3.4 ").unwrap(), Version::new(1, 2, 3, 4));
    }

    #[test]
    fn short_and_long_forms_are_equal() {
        assert_eq!(Version::parse("1.1").unwrap(), Version::parse("1.1.0.0").unwrap());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(v("1.1.0.1") < v("1.1.0.2"));
        assert!(v("1.1.9.9") < v("1.2"));
        assert!(v("2") > v("1.99.99.99"));
        assert!(v("1.10") > v("1.9"));
    }

    #[test]
    fn rejects_malformed_versions() {
        for bad in ["", "  ", "1..2", "1.2.", ".1", "1.2.3.4.5", "1.a", "+1", "1 .2", "-1", "1,2"] {
            assert!(
                matches!(Version::parse(bad), Err(VersionParseError::InvalidVersion { .. })),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[test]
    fn rejects_component_overflow() {
        assert!(Version::parse("4294967296").is_err());
        assert_eq!(
            Version::parse("4294967295").unwrap().major(),
            u32::MAX
        );
    }

    #[test]
    fn display_renders_all_components() {
        assert_eq!(Version::parse("1.4").unwrap().to_string(), "1.4.0.0");
    }

    #[test]
    fn serde_uses_dotted_string() {
        let v = Version::new(1, 5, 0, 2);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.5.0.2\"");
        let back: Version = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(back, Version::new(1, 5, 0, 0));
        assert!(serde_json::from_str::<Version>("\"1.x\"").is_err());
    }
}
