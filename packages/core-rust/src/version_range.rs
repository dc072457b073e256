//! Interval membership over [`Version`]s.
//!
//! # Grammar
//!
//! Whitespace around delimiters is ignored.
//!
//! ```text
//! range   := version                       (exact range [v,v])
//!          | ('[' | '(') version ',' version (']' | ')')
//! ```
//!
//! Anything else (a single bracketed version, a missing bound, a separator
//! other than `,`, an unterminated bracket) is a [`VersionParseError::RangeSyntax`].
//!
//! # Discrete normalization
//!
//! Versions are discrete, so `is_exact`/`is_empty` normalize exclusive bounds by
//! stepping the build component: `(v` becomes `[v+1` and `v)` becomes `v-1]`.
//! Stepping is done in signed arithmetic, so an exclusive upper bound whose
//! build is 0 normalizes to build `-1`, which sorts below every real build of
//! the same `major.minor.revision`. This keeps both predicates exact:
//! `[1.1.0.0,1.1.0.0)` is empty, while `(1.0.0.0,1.2.0.0)` is neither empty nor
//! exact.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::VersionParseError;
use crate::version::Version;

fn bracketed_range() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([\[(])\s*([^\s,\[\]()]+)\s*,\s*([^\s,\[\]()]+)\s*([\])])$")
            .unwrap_or_else(|e| unreachable!("static range pattern is valid: {e}"))
    })
}

/// An interval of versions with inclusive or exclusive bounds.
///
/// Inverted or degenerate bounds are legal; such a range is simply empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    lower: Version,
    lower_inclusive: bool,
    upper: Version,
    upper_inclusive: bool,
}

impl VersionRange {
    #[must_use]
    pub const fn new(
        lower: Version,
        lower_inclusive: bool,
        upper: Version,
        upper_inclusive: bool,
    ) -> Self {
        Self {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        }
    }

    /// The range `[version, version]`.
    #[must_use]
    pub const fn exact(version: Version) -> Self {
        Self::new(version, true, version, true)
    }

    /// Parse a range literal.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError::RangeSyntax`] for any text that is neither a
    /// bare version nor a well-formed bracketed pair.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(VersionParseError::range_syntax(input, "empty range"));
        }

        if !text.starts_with(['[', '(']) {
            let version = Version::parse(text).map_err(|_| {
                VersionParseError::range_syntax(input, "expected a bare version or a bracketed range")
            })?;
            return Ok(Self::exact(version));
        }

        let caps = bracketed_range().captures(text).ok_or_else(|| {
            VersionParseError::range_syntax(input, "expected `[` or `(`, two versions separated by `,`, then `]` or `)`")
        })?;

        let bound = |index: usize| {
            Version::parse(&caps[index])
                .map_err(|_| VersionParseError::range_syntax(input, "invalid version bound"))
        };
        let lower = bound(2)?;
        let upper = bound(3)?;

        Ok(Self::new(lower, &caps[1] == "[", upper, &caps[4] == "]"))
    }

    #[must_use]
    pub const fn lower(&self) -> Version {
        self.lower
    }

    #[must_use]
    pub const fn is_lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    #[must_use]
    pub const fn upper(&self) -> Version {
        self.upper
    }

    #[must_use]
    pub const fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    /// Whether `version` lies inside both bounds.
    #[must_use]
    pub fn is_in_range(&self, version: &Version) -> bool {
        let above_lower = match version.cmp(&self.lower) {
            Ordering::Greater => true,
            Ordering::Equal => self.lower_inclusive,
            Ordering::Less => false,
        };
        let below_upper = match version.cmp(&self.upper) {
            Ordering::Less => true,
            Ordering::Equal => self.upper_inclusive,
            Ordering::Greater => false,
        };
        above_lower && below_upper
    }

    /// Whether the range contains exactly one version.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.normalized_lower() == self.normalized_upper()
    }

    /// Whether the range contains no version at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalized_lower() > self.normalized_upper()
    }

    fn normalized_lower(&self) -> [i64; 4] {
        step(self.lower, if self.lower_inclusive { 0 } else { 1 })
    }

    fn normalized_upper(&self) -> [i64; 4] {
        step(self.upper, if self.upper_inclusive { 0 } else { -1 })
    }
}

fn step(version: Version, delta: i64) -> [i64; 4] {
    let [major, minor, revision, build] = version.components();
    [
        i64::from(major),
        i64::from(minor),
        i64::from(revision),
        i64::from(build) + delta,
    ]
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{},{}{}",
            if self.lower_inclusive { '[' } else { '(' },
            self.lower,
            self.upper,
            if self.upper_inclusive { ']' } else { ')' },
        )
    }
}

impl FromStr for VersionRange {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn range(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    #[test]
    fn half_open_membership() {
        let r = range("[1.1.0.1,1.1.0.3)");
        assert!(!r.is_in_range(&v("1.1.0.0")));
        assert!(r.is_in_range(&v("1.1.0.1")));
        assert!(r.is_in_range(&v("1.1.0.2")));
        assert!(!r.is_in_range(&v("1.1.0.3")));
        assert!(!r.is_in_range(&v("1.1.0.4")));
    }

    #[test]
    fn bare_version_is_exact_range() {
        let r = range("1.1.0.0");
        assert_eq!(r, VersionRange::exact(v("1.1")));
        assert!(r.is_in_range(&v("1.1")));
        assert!(!r.is_in_range(&v("1.1.0.1")));
        assert!(!r.is_in_range(&v("1.0.99")));
    }

    #[test]
    fn exact_ranges() {
        for text in [
            "1.1.0.0",
            "  [  1 , 1 ]  ",
            "[  1.1 , 1.1 ]",
            "  [1.1.1 , 1.1.1]  ",
            "[1.1.0.0,1.1.0.0]",
            "(1.1.0.0,1.1.0.2)",
            "[1.1.0.1,1.1.0.2)",
            "(1.1.0.0,1.1.0.1]",
        ] {
            assert!(range(text).is_exact(), "expected `{text}` to be exact");
            assert!(!range(text).is_empty(), "expected `{text}` to be non-empty");
        }
    }

    #[test]
    fn empty_ranges() {
        for text in [
            "(1.1.0.0,1.1.0.0)",
            "(1.2.0.0,1.1.0.0]",
            "[1.1.0.0,1.1.0.0)",
            "(1.1.0.0,1.1.0.1)",
            "[2,1]",
        ] {
            assert!(range(text).is_empty(), "expected `{text}` to be empty");
            assert!(!range(text).is_exact(), "expected `{text}` not to be exact");
        }
    }

    #[test]
    fn exclusive_upper_with_zero_build_steps_below_all_builds() {
        let r = range("(1.0.0.0,1.2.0.0)");
        assert!(!r.is_empty());
        assert!(!r.is_exact());
        assert!(r.is_in_range(&v("1.1.5")));

        let r = range("[1.1.0.5,1.1.1.0)");
        assert!(!r.is_empty());
        assert!(!r.is_exact());

        let r = range("(1.1.0.0,1.1.1.0)");
        assert!(!r.is_empty());
        assert!(!r.is_exact());
    }

    #[test]
    fn max_build_exclusive_lower_does_not_overflow() {
        let top = Version::new(1, 0, 0, u32::MAX);
        let r = VersionRange::new(top, false, top, true);
        assert!(r.is_empty());
        assert!(!r.is_in_range(&top));
    }

    #[test]
    fn invalid_syntax_is_rejected() {
        for bad in [
            "(1.1.0.0)",
            "1.1.0.0,1.1)]",
            "(1.1.0.0-1.1)",
            "1.1.0.0,1.1",
            "( , 1.1)",
            "[1.1,]",
            "[1.1,1.2",
            "1.1,1.2]",
            "[1.1;1.2]",
            "[1.1,1.2,1.3]",
            "{1.1,1.2}",
            "[1.x,1.2]",
            "",
        ] {
            assert!(
                matches!(VersionRange::parse(bad), Err(VersionParseError::RangeSyntax { .. })),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips() {
        let r1 = range("[1.1.0.1,1.1.0.3)");
        assert_eq!(r1.to_string(), "[1.1.0.1,1.1.0.3)");
        let r2 = range(&r1.to_string());
        assert_eq!(r1, r2);

        let bare = range("2.4");
        assert_eq!(bare.to_string(), "[2.4.0.0,2.4.0.0]");
        assert_eq!(range(&bare.to_string()), bare);
    }

    #[test]
    fn serde_uses_literal_form() {
        let r = range("(1,2]");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"(1.0.0.0,2.0.0.0]\"");
        let back: VersionRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    fn small_version() -> impl Strategy<Value = Version> {
        (0u32..3, 0u32..3, 0u32..3, 0u32..4).prop_map(|(a, b, c, d)| Version::new(a, b, c, d))
    }

    fn any_range() -> impl Strategy<Value = VersionRange> {
        (small_version(), any::<bool>(), small_version(), any::<bool>())
            .prop_map(|(lo, li, hi, hi_inc)| VersionRange::new(lo, li, hi, hi_inc))
    }

    proptest! {
        #[test]
        fn reparse_preserves_membership(r in any_range(), version in small_version()) {
            let reparsed = VersionRange::parse(&r.to_string()).unwrap();
            prop_assert_eq!(reparsed, r);
            prop_assert_eq!(reparsed.is_in_range(&version), r.is_in_range(&version));
        }

        #[test]
        fn empty_ranges_contain_nothing(r in any_range(), version in small_version()) {
            if r.is_empty() {
                prop_assert!(!r.is_in_range(&version));
            }
        }

        #[test]
        fn exact_ranges_contain_one_version_of_the_grid(r in any_range()) {
            // Exclusive bounds stay on the same major.minor.revision, so the
            // single member is always reachable by stepping the build.
            if r.is_exact() && r.lower().components()[..3] == r.upper().components()[..3] {
                let lo = r.lower();
                let member = if r.is_lower_inclusive() {
                    lo
                } else {
                    Version::new(lo.major(), lo.minor(), lo.revision(), lo.build() + 1)
                };
                prop_assert!(r.is_in_range(&member));
            }
        }
    }
}
