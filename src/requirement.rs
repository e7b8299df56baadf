// SPDX-License-Identifier: MPL-2.0

//! Requirements a package can place on one of its dependencies,
//! and the bindings a finished solution assigns to each package.

use std::fmt::{self, Display};

use crate::version::SemanticVersion;
use crate::version_set::VersionSet;

/// Requirement placed on a dependency.
///
/// Only the [Set](Requirement::Set) variant takes part in the solver's
/// algebra. Revision and unversioned requirements are opaque fixed bindings:
/// they intersect with nothing but themselves.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Requirement {
    /// A set of acceptable versions.
    Set(VersionSet),
    /// A fixed revision, e.g. a branch name or a commit hash.
    Revision(String),
    /// An unversioned binding, e.g. a local checkout.
    Unversioned,
}

impl Requirement {
    /// Requirement accepting any version.
    pub fn any() -> Self {
        Self::Set(VersionSet::Any)
    }

    /// Requirement accepting exactly one version.
    pub fn exact(v: impl Into<SemanticVersion>) -> Self {
        Self::Set(VersionSet::exact(v))
    }

    /// Caret requirement on a version set.
    pub fn caret(v: impl Into<SemanticVersion>) -> Self {
        Self::Set(VersionSet::caret(v))
    }

    /// The version set of a [Set](Requirement::Set) requirement.
    pub fn as_set(&self) -> Option<&VersionSet> {
        match self {
            Self::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Whether this requirement accepts every element of `other`.
    ///
    /// Between version sets this is set inclusion. Opaque requirements only
    /// contain themselves; mixed variants are not comparable and yield false.
    pub(crate) fn contains_all(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Set(a), Self::Set(b)) => b.intersection(a) == *b,
            _ => self == other,
        }
    }

    /// Whether this requirement accepts at least one element of `other`.
    pub(crate) fn contains_any(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Set(a), Self::Set(b)) => a.intersection(b) != VersionSet::Empty,
            _ => self == other,
        }
    }
}

impl From<VersionSet> for Requirement {
    fn from(set: VersionSet) -> Self {
        Self::Set(set)
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(set) => write!(f, "{}", set),
            Self::Revision(rev) => write!(f, "revision {}", rev),
            Self::Unversioned => write!(f, "unversioned"),
        }
    }
}

/// Binding assigned to a package in a finished solution.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundVersion {
    /// A concrete version.
    Version(SemanticVersion),
    /// An opaque revision.
    Revision(String),
    /// An unversioned binding.
    Unversioned,
}

impl Display for BoundVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(v) => write!(f, "{}", v),
            Self::Revision(rev) => write!(f, "revision {}", rev),
            Self::Unversioned => write!(f, "unversioned"),
        }
    }
}
