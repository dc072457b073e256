/// Errors raised while parsing [`Version`](crate::Version) and
/// [`VersionRange`](crate::VersionRange) literals.
///
/// Parsing is all-or-nothing: no partially parsed value is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("invalid version `{input}`: {reason}")]
    InvalidVersion { input: String, reason: &'static str },

    #[error("invalid version range syntax `{input}`: {reason}")]
    RangeSyntax { input: String, reason: &'static str },
}

impl VersionParseError {
    pub(crate) fn invalid_version(input: &str, reason: &'static str) -> Self {
        Self::InvalidVersion {
            input: input.to_string(),
            reason,
        }
    }

    pub(crate) fn range_syntax(input: &str, reason: &'static str) -> Self {
        Self::RangeSyntax {
            input: input.to_string(),
            reason,
        }
    }
}
