// SPDX-License-Identifier: MPL-2.0

//! PubGrub version solving over an abstract container provider.
//!
//! Version solving consists in efficiently finding a set of packages and
//! versions that satisfy all the constraints of a given root package. In
//! addition, when that is not possible, we should try to provide a very
//! human-readable and clear explanation as to why that failed.
//!
//! # Basic example
//!
//! Let's imagine a root project that uses a `menu` widget and an `icons`
//! set, where `menu` internally also uses `icons`:
//!
//! - `root` depends on `menu ^1.0.0` and `icons ^1.0.0`
//! - `menu 1.0.0` depends on `icons ^1.0.0`
//! - `icons 1.0.0` has no dependency
//!
//! We can model that scenario and solve it as follows:
//! ```
//! # use std::sync::Arc;
//! # use pact::{OfflineProvider, PackageRef, Requirement, Solver};
//! let mut provider = OfflineProvider::new();
//! provider.add_root("root", [
//!     (PackageRef::new("menu"), Requirement::caret((1, 0, 0))),
//!     (PackageRef::new("icons"), Requirement::caret((1, 0, 0))),
//! ]);
//! provider.add_dependencies("menu", (1, 0, 0), [
//!     (PackageRef::new("icons"), Requirement::caret((1, 0, 0))),
//! ]);
//! provider.add_dependencies("icons", (1, 0, 0), []);
//!
//! let solver = Solver::new(Arc::new(provider));
//! let solution = solver.solve(PackageRef::new("root")).unwrap();
//! assert_eq!(solution.len(), 2);
//! ```
//!
//! # Container providers
//!
//! The solver discovers packages through the [ContainerProvider] trait: a
//! container describes one package, its candidate versions in descending
//! order, and the dependencies of each version. Fetches are asynchronous
//! callback style; the solver caches containers internally and may hint at
//! upcoming needs by prefetching, which has no effect on the solution.
//! [OfflineProvider] is a complete in-memory implementation.
//!
//! # Solution and error reporting
//!
//! On success, [Solver::solve] returns one [BoundVersion] per transitively
//! reachable package, the root excluded. When the constraints are
//! unsatisfiable it returns [SolverError::Unresolvable] carrying the
//! terminal [Incompatibility] together with a rendered report walking the
//! whole derivation graph, such as:
//!
//! ```txt
//! Because a 1.0.0 <= v < 2.0.0 depends on b 2.0.0 <= v < 3.0.0
//! and root depends on b 1.0.0 <= v < 2.0.0,
//! a 1.0.0 <= v < 2.0.0 is forbidden.
//! And because root depends on a 1.0.0 <= v < 2.0.0,
//! version solving failed.
//! ```
//!
//! Progress of a solve can additionally be observed through the
//! [Delegate] trait.

#![warn(missing_docs)]

mod cache;
mod delegate;
mod error;
mod package;
mod provider;
mod report;
mod requirement;
mod solver;
mod term;
mod type_aliases;
mod version;
mod version_set;

pub use delegate::{Delegate, GeneralStep, StepKind, StepLocation, StepValue};
pub use error::{ProviderError, SolverError};
pub use internal::incompatibility::{Cause, Incompatibility};
pub use internal::partial_solution::Assignment;
pub use package::PackageRef;
pub use provider::{
    Container, ContainerCompletion, ContainerProvider, ContainerResult, OfflineProvider,
};
pub use requirement::{BoundVersion, Requirement};
pub use solver::Solver;
pub use term::{SetRelation, Term};
pub use type_aliases::{Map, Set};
pub use version::{SemanticVersion, VersionParseError};
pub use version_set::VersionSet;

mod internal;
