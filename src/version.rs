// SPDX-License-Identifier: MPL-2.0

//! Semantic versions and their ordering.

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// Type for semantic versions: major.minor.patch.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SemanticVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

// Constructors
impl SemanticVersion {
    /// Create a version with "major", "minor" and "patch" values.
    /// `version = major.minor.patch`
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Version 0.0.0.
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Version 1.0.0.
    pub fn one() -> Self {
        Self::new(1, 0, 0)
    }
}

// Convert a tuple (major, minor, patch) into a version.
impl From<(u32, u32, u32)> for SemanticVersion {
    fn from(tuple: (u32, u32, u32)) -> Self {
        let (major, minor, patch) = tuple;
        Self::new(major, minor, patch)
    }
}

// Bump versions.
impl SemanticVersion {
    /// The smallest strictly higher version.
    pub fn bump(self) -> Self {
        Self::new(self.major, self.minor, self.patch + 1)
    }

    /// The lower bound of the next major release: `(major + 1).0.0`.
    pub fn next_major(self) -> Self {
        Self::new(self.major + 1, 0, 0)
    }
}

/// Error creating [SemanticVersion] from [String].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionParseError {
    /// [SemanticVersion] must contain major, minor, patch versions.
    #[error("version {full_version} must contain 3 numbers separated by dot")]
    NotThreeParts {
        /// [SemanticVersion] that was being parsed.
        full_version: String,
    },
    /// Wrapper around [ParseIntError](core::num::ParseIntError).
    #[error("cannot parse {version_part} in {full_version} as u32")]
    ParseIntError {
        /// [SemanticVersion] that was being parsed.
        full_version: String,
        /// A version part where parsing failed.
        version_part: String,
    },
}

impl FromStr for SemanticVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_u32 = |part: &str| {
            part.parse::<u32>().map_err(|_| VersionParseError::ParseIntError {
                full_version: s.to_string(),
                version_part: part.to_string(),
            })
        };
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(major), Some(minor), Some(patch), None) => {
                let major = parse_u32(major)?;
                let minor = parse_u32(minor)?;
                let patch = parse_u32(patch)?;
                Ok(Self::new(major, minor, patch))
            }
            _ => Err(VersionParseError::NotThreeParts {
                full_version: s.to_string(),
            }),
        }
    }
}

impl Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        let v: SemanticVersion = "1.22.3".parse().unwrap();
        assert_eq!(v, SemanticVersion::new(1, 22, 3));
        assert_eq!(v.to_string().parse(), Ok(v));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("1.0".parse::<SemanticVersion>().is_err());
        assert!("1.0.0.0".parse::<SemanticVersion>().is_err());
        assert!("1.x.0".parse::<SemanticVersion>().is_err());
    }

    #[test]
    fn next_major_resets_lower_parts() {
        let v = SemanticVersion::new(1, 4, 9);
        assert_eq!(v.next_major(), SemanticVersion::new(2, 0, 0));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(SemanticVersion::new(1, 9, 0) < SemanticVersion::new(2, 0, 0));
        assert!(SemanticVersion::new(1, 0, 1) > SemanticVersion::new(1, 0, 0));
    }
}
