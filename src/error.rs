// SPDX-License-Identifier: MPL-2.0

//! Handling solver errors.

use std::sync::Arc;

use thiserror::Error;

use crate::internal::incompatibility::Incompatibility;
use crate::package::PackageRef;

/// Boxed error returned by a container provider.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that may occur while solving dependencies.
#[derive(Error, Debug)]
pub enum SolverError {
    /// There is no solution for this set of dependencies.
    ///
    /// The terminal incompatibility is the end of the derivation graph; the
    /// report is the rendered walk of that graph, explaining step by step
    /// why no assignment of versions can work.
    #[error("version solving failed:\n{report}")]
    Unresolvable {
        /// The terminal incompatibility of conflict resolution.
        incompatibility: Incompatibility,
        /// Human readable derivation report.
        report: String,
    },

    /// The container provider failed; the solve is aborted unchanged.
    #[error("fetching the container of {package} failed: {error}")]
    Provider {
        /// Package whose container was requested.
        package: PackageRef,
        /// Error raised by the provider. Shared because several waiters may
        /// observe the same failed fetch.
        error: Arc<ProviderError>,
    },
}
