//! Semantic schema versions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version triple without release state, used for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Failure to parse a `major.minor.patch` string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version '{0}': expected major.minor.patch")]
pub struct ParseVersionError(pub String);

impl VersionNumber {
    /// Create a version triple
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// First version of any form type
    pub const fn initial() -> Self {
        Self::new(1, 0, 0)
    }

    /// Next minor version, patch reset; `None` once minor is exhausted
    pub fn next_minor(self) -> Option<Self> {
        Some(Self::new(self.major, self.minor.checked_add(1)?, 0))
    }

    /// Next major version, minor and patch reset; `None` once major is exhausted
    pub fn next_major(self) -> Option<Self> {
        Some(Self::new(self.major.checked_add(1)?, 0, 0))
    }

    /// Whether `self` can stand in for `other`: same major, not older
    pub fn is_compatible_with(self, other: VersionNumber) -> bool {
        self.major == other.major && self >= other
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionNumber {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().trim_start_matches('v').split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(ParseVersionError(s.to_string()));
        };

        let parse = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| ParseVersionError(s.to_string()))
        };
        Ok(Self::new(parse(*major)?, parse(*minor)?, parse(*patch)?))
    }
}

/// Version of a stored schema document
///
/// `released` is `None` while the document is a draft. It is stamped once
/// at release time and never changes afterwards. `deprecated` can only be
/// raised on a released version and is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    #[serde(default)]
    pub released: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deprecated: bool,
}

impl SchemaVersion {
    /// Create an unreleased version
    pub fn draft(number: VersionNumber) -> Self {
        Self {
            major: number.major,
            minor: number.minor,
            patch: number.patch,
            released: None,
            deprecated: false,
        }
    }

    /// Version triple of this schema
    pub fn number(&self) -> VersionNumber {
        VersionNumber::new(self.major, self.minor, self.patch)
    }

    /// Whether this version is still a draft
    pub fn is_draft(&self) -> bool {
        self.released.is_none()
    }

    /// Whether this version has been released
    pub fn is_released(&self) -> bool {
        self.released.is_some()
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number()
            .cmp(&other.number())
            .then_with(|| self.released.cmp(&other.released))
            .then_with(|| self.deprecated.cmp(&other.deprecated))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())?;
        if self.is_draft() {
            write!(f, "-draft")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut versions = vec![
            VersionNumber::new(1, 10, 0),
            VersionNumber::new(2, 0, 0),
            VersionNumber::new(1, 2, 3),
            VersionNumber::new(1, 2, 0),
        ];
        versions.sort();

        assert_eq!(
            versions,
            vec![
                VersionNumber::new(1, 2, 0),
                VersionNumber::new(1, 2, 3),
                VersionNumber::new(1, 10, 0),
                VersionNumber::new(2, 0, 0),
            ]
        );
    }

    #[test]
    fn test_parse_and_display() {
        let version: VersionNumber = "1.4.2".parse().unwrap();
        assert_eq!(version, VersionNumber::new(1, 4, 2));
        assert_eq!(version.to_string(), "1.4.2");
        assert_eq!("v2.0.0".parse::<VersionNumber>().unwrap().major, 2);

        assert!("1.4".parse::<VersionNumber>().is_err());
        assert!("1.x.0".parse::<VersionNumber>().is_err());
        assert!("1.2.3.4".parse::<VersionNumber>().is_err());
    }

    #[test]
    fn test_bumps() {
        let v = VersionNumber::new(1, 3, 2);
        assert_eq!(v.next_minor(), Some(VersionNumber::new(1, 4, 0)));
        assert_eq!(v.next_major(), Some(VersionNumber::new(2, 0, 0)));
    }

    #[test]
    fn test_bumps_stop_at_u32_max() {
        let v = VersionNumber::new(u32::MAX, u32::MAX, 0);
        assert_eq!(v.next_minor(), None);
        assert_eq!(v.next_major(), None);
        assert_eq!(
            VersionNumber::new(1, u32::MAX, 7).next_major(),
            Some(VersionNumber::new(2, 0, 0))
        );
    }

    #[test]
    fn test_compatibility_needs_same_major() {
        let target = VersionNumber::new(1, 2, 0);
        assert!(VersionNumber::new(1, 2, 0).is_compatible_with(target));
        assert!(VersionNumber::new(1, 5, 1).is_compatible_with(target));
        assert!(!VersionNumber::new(1, 1, 9).is_compatible_with(target));
        assert!(!VersionNumber::new(2, 0, 0).is_compatible_with(target));
    }

    #[test]
    fn test_deprecated_defaults_to_false() {
        let version: SchemaVersion =
            serde_json::from_str(r#"{"major":1,"minor":0,"patch":0,"released":null}"#).unwrap();
        assert!(!version.deprecated);
    }

    #[test]
    fn test_draft_display() {
        let mut version = SchemaVersion::draft(VersionNumber::initial());
        assert!(version.is_draft());
        assert_eq!(version.to_string(), "1.0.0-draft");

        version.released = Some(Utc::now());
        assert!(version.is_released());
        assert_eq!(version.to_string(), "1.0.0");
    }
}
