// SPDX-License-Identifier: MPL-2.0

//! Identity of packages handed to the solver.

use std::fmt::{self, Display};
use std::sync::Arc;

/// Opaque identity of a package.
///
/// The solver only relies on equality, hashing and a stable display name.
/// Cloning is cheap, the name is reference counted.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackageRef {
    name: Arc<str>,
}

impl PackageRef {
    /// Create a package reference from its name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// The package name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for PackageRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
