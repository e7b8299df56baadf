// SPDX-License-Identifier: MPL-2.0

//! Top-level solver driving the PubGrub algorithm.
//!
//! Starting from the root package's direct dependencies, the solver
//! alternates unit propagation and decision making until every positively
//! constrained package has a decided binding, or until conflict resolution
//! proves that no consistent assignment exists. Below is the kind of
//! explanation produced in the latter case:
//!
//! ```txt
//! Because a 1.0.0 <= v < 2.0.0 depends on b 2.0.0 <= v < 3.0.0
//! and root depends on b 1.0.0 <= v < 2.0.0,
//! a 1.0.0 <= v < 2.0.0 is forbidden.
//! And because root depends on a 1.0.0 <= v < 2.0.0,
//! version solving failed.
//! ```

use std::sync::Arc;

use crate::cache::ContainerCache;
use crate::delegate::{Delegate, GeneralStep, StepKind, StepLocation, StepValue};
use crate::error::SolverError;
use crate::internal::core::{describe_cause, State};
use crate::internal::incompatibility::{Cause, Incompatibility};
use crate::package::PackageRef;
use crate::provider::ContainerProvider;
use crate::requirement::{BoundVersion, Requirement};
use crate::term::Term;
use crate::version::SemanticVersion;
use crate::version_set::VersionSet;

/// The version solver.
///
/// A solver owns a container cache on top of the provider and an optional
/// trace delegate, and is reusable across solves.
pub struct Solver {
    cache: ContainerCache,
    delegate: Option<Box<dyn Delegate>>,
    pins: Vec<(PackageRef, BoundVersion)>,
}

impl Solver {
    /// Create a solver on top of a container provider.
    pub fn new(provider: Arc<dyn ContainerProvider>) -> Self {
        Self {
            cache: ContainerCache::new(provider),
            delegate: None,
            pins: Vec::new(),
        }
    }

    /// Attach a delegate receiving the trace stream of every solve.
    pub fn with_delegate(mut self, delegate: Box<dyn Delegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Seed the solver with previously resolved bindings.
    ///
    /// Pins are recorded but do not constrain the current algorithm.
    pub fn with_pins(mut self, pins: Vec<(PackageRef, BoundVersion)>) -> Self {
        self.pins = pins;
        self
    }

    /// The recorded pins.
    pub fn pins(&self) -> &[(PackageRef, BoundVersion)] {
        &self.pins
    }

    /// Resolve the dependencies of the root package to one binding per
    /// transitively reachable package. The root itself is excluded from
    /// the result.
    pub fn solve(
        &self,
        root: PackageRef,
    ) -> Result<Vec<(PackageRef, BoundVersion)>, SolverError> {
        let mut state = State::new(root.clone());

        // Root bootstrap: the root is pinned to a sentinel version that is
        // never reported, and each of its unversioned dependencies becomes
        // an initial incompatibility.
        let container = self.cache.get(&root)?;
        let dependencies = container
            .unversioned_dependencies()
            .map_err(|error| SolverError::Provider {
                package: root.clone(),
                error: Arc::new(error),
            })?;
        self.cache
            .prefetch(dependencies.iter().map(|(package, _)| package.clone()));
        for (package, requirement) in dependencies {
            let incompatibility = Incompatibility::new(
                vec![
                    Term::exact(root.clone(), SemanticVersion::one()),
                    Term::negative(package, requirement),
                ],
                Cause::Root,
                &root,
            );
            self.trace_incompatibility(&state, &incompatibility, StepLocation::TopLevel);
            state.add_incompatibility(incompatibility);
        }
        state
            .partial_solution
            .decide(root.clone(), BoundVersion::Version(SemanticVersion::one()));

        let mut next = root.clone();
        loop {
            state
                .unit_propagation(next, self.delegate.as_deref())
                .map_err(|terminal| {
                    let report = crate::report::render(terminal, &state.store, &root);
                    SolverError::Unresolvable {
                        incompatibility: state.store[terminal].clone(),
                        report,
                    }
                })?;
            match self.make_decision(&mut state)? {
                Some(package) => next = package,
                None => break,
            }
        }

        Ok(state
            .partial_solution
            .decisions()
            .filter(|(package, _)| *package != &root)
            .map(|(package, binding)| (package.clone(), binding.clone()))
            .collect())
    }

    /// Choose the next package and version to try, registering the chosen
    /// version's dependencies as incompatibilities. Returns the package
    /// that was worked on, or `None` when every constrained package is
    /// decided and solving has succeeded.
    fn make_decision(&self, state: &mut State) -> Result<Option<PackageRef>, SolverError> {
        let Some(term) = state.partial_solution.first_undecided().cloned() else {
            return Ok(None);
        };
        let package = term.package().clone();
        let set = match term.requirement() {
            Requirement::Set(set) => set.clone(),
            // Opaque requirements are fixed bindings: there is nothing to
            // choose and nothing further to discover.
            Requirement::Revision(revision) => {
                let binding = BoundVersion::Revision(revision.clone());
                log::info!("bound {} to {}", package, binding);
                self.decide(state, package.clone(), binding);
                return Ok(Some(package));
            }
            Requirement::Unversioned => {
                log::info!("bound {} as unversioned", package);
                self.decide(state, package.clone(), BoundVersion::Unversioned);
                return Ok(Some(package));
            }
        };

        let container = self.cache.get(&package)?;
        let Some(version) = container.versions(&|v| set.contains(v)).next() else {
            log::info!("no versions of {} match {}", package, set);
            let incompatibility =
                Incompatibility::new(vec![term], Cause::NoAvailableVersion, state.root());
            self.trace_incompatibility(state, &incompatibility, StepLocation::DecisionMaking);
            state.add_incompatibility(incompatibility);
            return Ok(Some(package));
        };

        let dependencies =
            container
                .dependencies(&version)
                .map_err(|error| SolverError::Provider {
                    package: package.clone(),
                    error: Arc::new(error),
                })?;
        self.cache
            .prefetch(dependencies.iter().map(|(package, _)| package.clone()));

        // The chosen version stands in for its whole compatibility range:
        // the dependency incompatibilities cover [version, next major).
        let dependent = Term::positive(
            package.clone(),
            Requirement::Set(VersionSet::between(version, version.next_major())),
        );
        let mut conflicting = false;
        for (dependency, requirement) in dependencies {
            let incompatibility = if dependency == package {
                // A self dependency carries no constraint when the chosen
                // version satisfies it, and forbids the version otherwise.
                match requirement.as_set() {
                    Some(set) if set.contains(&version) => continue,
                    _ => Incompatibility::new(
                        vec![Term::exact(package.clone(), version)],
                        Cause::Dependency(package.clone()),
                        state.root(),
                    ),
                }
            } else {
                Incompatibility::new(
                    vec![
                        dependent.clone(),
                        Term::negative(dependency, requirement),
                    ],
                    Cause::Dependency(package.clone()),
                    state.root(),
                )
            };
            if incompatibility
                .terms()
                .iter()
                .filter(|t| t.package() != &package)
                .all(|t| state.partial_solution.satisfies(t))
            {
                conflicting = true;
            }
            self.trace_incompatibility(state, &incompatibility, StepLocation::DecisionMaking);
            state.add_incompatibility(incompatibility);
        }

        if conflicting {
            log::info!(
                "not deciding {} @ {} because of its dependencies",
                package,
                version
            );
        } else {
            log::info!("deciding {} @ {}", package, version);
            self.decide(state, package.clone(), BoundVersion::Version(version));
        }
        Ok(Some(package))
    }

    fn decide(&self, state: &mut State, package: PackageRef, binding: BoundVersion) {
        let term = match &binding {
            BoundVersion::Version(v) => Term::exact(package.clone(), *v),
            BoundVersion::Revision(revision) => {
                Term::positive(package.clone(), Requirement::Revision(revision.clone()))
            }
            BoundVersion::Unversioned => {
                Term::positive(package.clone(), Requirement::Unversioned)
            }
        };
        state.partial_solution.decide(package, binding);
        if let Some(delegate) = &self.delegate {
            delegate.general_step(&GeneralStep {
                value: StepValue::Term(term),
                kind: StepKind::Decision,
                location: StepLocation::DecisionMaking,
                cause: None,
                decision_level: state.partial_solution.decision_level(),
            });
        }
    }

    fn trace_incompatibility(
        &self,
        state: &State,
        incompatibility: &Incompatibility,
        location: StepLocation,
    ) {
        if let Some(delegate) = &self.delegate {
            delegate.general_step(&GeneralStep {
                value: StepValue::Incompatibility(incompatibility.clone()),
                kind: StepKind::Incompatibility,
                location,
                cause: Some(describe_cause(incompatibility)),
                decision_level: state.partial_solution.decision_level(),
            });
        }
    }
}
