//! Format versions for TOML data files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvasionError;

/// Format version stamped into agent catalogs and arena files.
///
/// Written as a `"major.minor.patch"` string. A reader accepts files with the
/// same major version and a minor version no newer than its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    /// Incompatible layout changes
    pub major: u16,
    /// Added fields
    pub minor: u16,
    /// Fixes that do not change the layout
    pub patch: u16,
}

impl SchemaVersion {
    /// Agent catalog format written by this build.
    pub const AGENT_CATALOG: Self = Self::new(1, 0, 0);

    /// Arena scenario format written by this build.
    pub const ARENA: Self = Self::new(1, 0, 0);

    /// Creates a version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns whether a reader at this version understands a file written
    /// at `file`.
    #[must_use]
    pub const fn can_read(&self, file: &Self) -> bool {
        self.major == file.major && file.minor <= self.minor
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = InvasionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvasionError::InvalidConfig {
            field: "schema".to_string(),
            reason: format!("`{s}` is not a major.minor.patch version"),
        };

        let mut parts = s.trim().split('.').map(str::parse::<u16>);
        let mut next = || parts.next().ok_or_else(invalid)?.map_err(|_| invalid());
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = InvasionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_and_display() {
        let version: SchemaVersion = "1.2.3".parse().expect("valid version");
        assert_eq!(version, SchemaVersion::new(1, 2, 3));
        assert_eq!(version.to_string(), "1.2.3");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1.-2.0"] {
            assert!(bad.parse::<SchemaVersion>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_reader_accepts_older_minor_only() {
        let reader = SchemaVersion::new(1, 1, 0);
        assert!(reader.can_read(&SchemaVersion::new(1, 0, 7)));
        assert!(reader.can_read(&SchemaVersion::new(1, 1, 2)));
        assert!(!reader.can_read(&SchemaVersion::new(1, 2, 0)));
        assert!(!reader.can_read(&SchemaVersion::new(2, 0, 0)));
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(major: u16, minor: u16, patch: u16) {
            let version = SchemaVersion::new(major, minor, patch);
            let text = String::from(version);
            prop_assert_eq!(text.parse::<SchemaVersion>().expect("own output"), version);
            prop_assert!(version.can_read(&version));
        }
    }
}
