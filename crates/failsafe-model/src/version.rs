//! API microversion tokens.
//!
//! A microversion is a `major.minor` pair negotiated per request. Besides real
//! versions a token can be [`VersionToken::Null`] (the request is not subject
//! to versioning) or [`VersionToken::Latest`] (the client asked for the
//! newest version the server knows).

use std::fmt;
use std::str::FromStr;

/// A concrete `major.minor` API version.
///
/// Ordering compares `major` first, then `minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a `"X.Y"` version string.
    ///
    /// The major part must be a positive integer and neither part may carry
    /// leading zeros (`"1.0"` and `"2.10"` are valid, `"01.1"`, `"1.01"`,
    /// `"0.9"`, `"1"` and `"1.2.3"` are not).
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidVersionString(raw.to_owned());

        let (major, minor) = raw.split_once('.').ok_or_else(invalid)?;
        if !is_canonical_number(major) || !is_canonical_number(minor) {
            return Err(invalid());
        }

        let major: u32 = major.parse().map_err(|_| invalid())?;
        let minor: u32 = minor.parse().map_err(|_| invalid())?;
        if major == 0 {
            return Err(invalid());
        }

        Ok(Self { major, minor })
    }

    /// Whether this version lies within `[min, max]`; `None` bounds are open.
    #[must_use]
    pub fn matches(&self, min: Option<ApiVersion>, max: Option<ApiVersion>) -> bool {
        min.is_none_or(|min| min <= *self) && max.is_none_or(|max| *self <= max)
    }
}

/// Digits only, no sign, no leading zero unless the number is zero itself.
fn is_canonical_number(part: &str) -> bool {
    !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'))
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ApiVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A requested or resolved API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionToken {
    /// The request is not version-negotiated.
    #[default]
    Null,
    /// The `latest` keyword, not yet resolved to a real version.
    Latest,
    /// A concrete version.
    Version(ApiVersion),
}

impl VersionToken {
    /// Keyword selecting the newest known version.
    pub const LATEST_KEYWORD: &str = "latest";

    /// Parse a version token: `"X.Y"` or the `latest` keyword.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(Self::LATEST_KEYWORD) {
            return Ok(Self::Latest);
        }
        ApiVersion::parse(raw).map(Self::Version)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The concrete version, if this token carries one.
    #[must_use]
    pub fn as_version(&self) -> Option<ApiVersion> {
        match self {
            Self::Version(v) => Some(*v),
            Self::Null | Self::Latest => None,
        }
    }

    /// Whether this token lies within `[min, max]`.
    ///
    /// `Null` bounds are open. Only concrete versions can match; `Null` and an
    /// unresolved `Latest` never do.
    #[must_use]
    pub fn matches(&self, min: &VersionToken, max: &VersionToken) -> bool {
        match self {
            Self::Version(v) => v.matches(min.as_version(), max.as_version()),
            Self::Null | Self::Latest => false,
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Latest => f.write_str(Self::LATEST_KEYWORD),
            Self::Version(v) => v.fmt(f),
        }
    }
}

impl From<ApiVersion> for VersionToken {
    fn from(v: ApiVersion) -> Self {
        Self::Version(v)
    }
}

/// The globally supported version window of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionWindow {
    /// Oldest supported version.
    pub min: ApiVersion,
    /// Newest supported version; `latest` resolves to this.
    pub max: ApiVersion,
    /// Version used when the client sends none.
    pub default: ApiVersion,
}

impl VersionWindow {
    /// Build a window, checking `min <= default <= max`.
    pub fn new(min: ApiVersion, max: ApiVersion, default: ApiVersion) -> Result<Self, VersionError> {
        if !(min <= default && default <= max) {
            return Err(VersionError::InvalidWindow { min, max, default });
        }
        Ok(Self { min, max, default })
    }

    /// Resolve a requested token against the window.
    ///
    /// `None` means the client sent no version and yields the default;
    /// `Latest` yields the maximum. A concrete version outside the window is
    /// rejected with [`VersionError::UnsupportedGlobalVersion`].
    pub fn resolve(&self, requested: Option<VersionToken>) -> Result<ApiVersion, VersionError> {
        match requested {
            None | Some(VersionToken::Null) => Ok(self.default),
            Some(VersionToken::Latest) => Ok(self.max),
            Some(VersionToken::Version(v)) => {
                if v.matches(Some(self.min), Some(self.max)) {
                    Ok(v)
                } else {
                    Err(VersionError::UnsupportedGlobalVersion {
                        requested: v,
                        min: self.min,
                        max: self.max,
                    })
                }
            }
        }
    }
}

/// Errors produced while parsing or resolving versions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("API Version String {0} is of invalid format. Must be of format MajorNum.MinorNum.")]
    InvalidVersionString(String),

    #[error(
        "Version {requested} is not supported by the API. Minimum is {min} and maximum is {max}."
    )]
    UnsupportedGlobalVersion {
        requested: ApiVersion,
        min: ApiVersion,
        max: ApiVersion,
    },

    #[error("invalid version window: min {min}, max {max}, default {default}")]
    InvalidWindow {
        min: ApiVersion,
        max: ApiVersion,
        default: ApiVersion,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u32, minor: u32) -> ApiVersion {
        ApiVersion::new(major, minor)
    }

    #[test]
    fn test_should_parse_valid_versions() {
        assert_eq!(ApiVersion::parse("1.0").unwrap(), v(1, 0));
        assert_eq!(ApiVersion::parse("2.10").unwrap(), v(2, 10));
        assert_eq!(ApiVersion::parse("12.3").unwrap(), v(12, 3));
    }

    #[test]
    fn test_should_reject_malformed_versions() {
        for raw in ["", "1", "1.", ".1", "1.2.3", "a.b", "-1.0", "1.-1", "01.1", "1.01", "0.9", " 1.0"] {
            assert!(
                matches!(ApiVersion::parse(raw), Err(VersionError::InvalidVersionString(_))),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_should_order_by_major_then_minor() {
        assert!(v(1, 9) < v(2, 0));
        assert!(v(2, 1) < v(2, 10));
        assert_eq!(v(1, 2).max(v(1, 1)), v(1, 2));
    }

    #[test]
    fn test_should_match_inclusive_ranges_with_open_bounds() {
        assert!(v(1, 1).matches(Some(v(1, 1)), Some(v(1, 1))));
        assert!(v(1, 5).matches(None, Some(v(2, 0))));
        assert!(v(9, 9).matches(Some(v(1, 0)), None));
        assert!(v(1, 0).matches(None, None));
        assert!(!v(1, 0).matches(Some(v(1, 1)), None));
        assert!(!v(2, 1).matches(None, Some(v(2, 0))));
    }

    #[test]
    fn test_should_parse_latest_keyword() {
        assert_eq!(VersionToken::parse("latest").unwrap(), VersionToken::Latest);
        assert_eq!(VersionToken::parse(" LATEST ").unwrap(), VersionToken::Latest);
        assert_eq!(
            VersionToken::parse("1.2").unwrap(),
            VersionToken::Version(v(1, 2))
        );
    }

    #[test]
    fn test_should_never_match_null_or_latest_tokens() {
        let open = VersionToken::Null;
        assert!(!VersionToken::Null.matches(&open, &open));
        assert!(!VersionToken::Latest.matches(&open, &open));
        assert!(VersionToken::Version(v(1, 0)).matches(&open, &open));
    }

    #[test]
    fn test_should_resolve_against_window() {
        let window = VersionWindow::new(v(1, 0), v(1, 2), v(1, 0)).unwrap();
        assert_eq!(window.resolve(None).unwrap(), v(1, 0));
        assert_eq!(window.resolve(Some(VersionToken::Latest)).unwrap(), v(1, 2));
        assert_eq!(
            window.resolve(Some(VersionToken::Version(v(1, 1)))).unwrap(),
            v(1, 1)
        );
        assert!(matches!(
            window.resolve(Some(VersionToken::Version(v(9, 9)))),
            Err(VersionError::UnsupportedGlobalVersion { .. })
        ));
    }

    #[test]
    fn test_should_reject_window_with_default_outside_bounds() {
        assert!(VersionWindow::new(v(1, 1), v(1, 2), v(1, 0)).is_err());
    }
}
