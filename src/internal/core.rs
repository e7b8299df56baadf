// SPDX-License-Identifier: MPL-2.0

//! Core state of the PubGrub algorithm: the incompatibility database and
//! the unit propagation / conflict resolution loop.

use std::collections::VecDeque;

use crate::delegate::{Delegate, GeneralStep, StepKind, StepLocation, StepValue};
use crate::internal::arena::{Arena, Id};
use crate::internal::incompatibility::{Cause, Incompatibility, Relation};
use crate::internal::partial_solution::PartialSolution;
use crate::package::PackageRef;
use crate::term::Term;
use crate::type_aliases::Map;

/// Mutable state threaded through a solve.
pub struct State {
    root: PackageRef,

    /// For each package, the incompatibilities mentioning it, in
    /// registration order. Propagation walks these newest first.
    incompatibilities: Map<PackageRef, Vec<Id<Incompatibility>>>,

    /// Reference storage for all incompatibilities, including intermediate
    /// conflict-resolution products that never enter the database.
    pub store: Arena<Incompatibility>,

    /// The partial solution.
    pub partial_solution: PartialSolution,

    /// Queue of packages whose constraints changed and whose
    /// incompatibilities must be revisited.
    changed: VecDeque<PackageRef>,
}

impl State {
    /// Initialization of the solver state.
    pub fn new(root: PackageRef) -> Self {
        Self {
            root,
            incompatibilities: Map::default(),
            store: Arena::new(),
            partial_solution: PartialSolution::new(),
            changed: VecDeque::new(),
        }
    }

    /// The root package.
    pub fn root(&self) -> &PackageRef {
        &self.root
    }

    /// Store an incompatibility and index it in the database.
    pub fn add_incompatibility(&mut self, incompatibility: Incompatibility) -> Id<Incompatibility> {
        let id = self.store.alloc(incompatibility);
        self.register(id);
        id
    }

    /// Index an already stored incompatibility under each of its terms'
    /// packages. A structurally equal incompatibility already indexed for a
    /// package suppresses the duplicate registration there.
    fn register(&mut self, id: Id<Incompatibility>) {
        let packages: Vec<PackageRef> = self.store[id]
            .terms()
            .iter()
            .map(|t| t.package().clone())
            .collect();
        for package in packages {
            let registered = self.incompatibilities.entry(package).or_default();
            if registered.iter().any(|&prior| self.store[prior] == self.store[id]) {
                continue;
            }
            registered.push(id);
        }
    }

    /// Unit propagation: revisit the incompatibilities of every queued
    /// package, deriving forced terms and resolving conflicts as they
    /// appear. Returns the terminal incompatibility on unresolvable input.
    pub fn unit_propagation(
        &mut self,
        package: PackageRef,
        delegate: Option<&dyn Delegate>,
    ) -> Result<(), Id<Incompatibility>> {
        self.changed.clear();
        self.changed.push_back(package);
        while let Some(current) = self.changed.pop_front() {
            log::debug!("unit propagation on {}", current);
            let ids: Vec<Id<Incompatibility>> = self
                .incompatibilities
                .get(&current)
                .cloned()
                .unwrap_or_default();
            let mut conflict = None;
            // Newer incompatibilities are more general, check them first.
            for &id in ids.iter().rev() {
                let relation = self.store[id].relation(|t| self.partial_solution.relation(t));
                match relation {
                    Relation::Satisfied => {
                        log::info!(
                            "conflict, incompatibility satisfied: {}",
                            self.store[id]
                        );
                        conflict = Some(id);
                        break;
                    }
                    Relation::AlmostSatisfied(term) => {
                        let derived = term.inverse();
                        self.trace_derivation(delegate, &derived, id, StepLocation::UnitPropagation);
                        log::info!("derived: {}", derived);
                        self.partial_solution.derive(derived, id);
                        if !self.changed.contains(term.package()) {
                            self.changed.push_back(term.package().clone());
                        }
                    }
                    Relation::Contradicted | Relation::Inconclusive => {}
                }
            }
            if let Some(conflict_id) = conflict {
                let root_cause = self.resolve_conflict(conflict_id, delegate)?;
                match self.store[root_cause].relation(|t| self.partial_solution.relation(t)) {
                    Relation::AlmostSatisfied(term) => {
                        let derived = term.inverse();
                        self.trace_derivation(
                            delegate,
                            &derived,
                            root_cause,
                            StepLocation::ConflictResolution,
                        );
                        log::info!("derived from root cause: {}", derived);
                        self.partial_solution.derive(derived, root_cause);
                        self.changed.clear();
                        self.changed.push_back(term.package().clone());
                    }
                    _ => unreachable!(
                        "the root cause must almost satisfy the backtracked solution"
                    ),
                }
            }
        }
        Ok(())
    }

    /// Conflict resolution by repeated application of the rule of
    /// resolution, backjumping to the earliest level at which the root
    /// cause would have propagated. Returns the terminal incompatibility
    /// when the conflict cannot be resolved at all.
    fn resolve_conflict(
        &mut self,
        conflict: Id<Incompatibility>,
        delegate: Option<&dyn Delegate>,
    ) -> Result<Id<Incompatibility>, Id<Incompatibility>> {
        let mut current = conflict;
        let mut created_new = false;
        loop {
            if self.store[current].is_failure(&self.root) {
                return Err(current);
            }

            // Locate the satisfier of every term; the most recent one (by
            // position in the assignment history) drives this round.
            let satisfiers: Vec<(usize, Term)> = self.store[current]
                .terms()
                .iter()
                .map(|t| (self.partial_solution.satisfier_index(t), t.clone()))
                .collect();
            let &(satisfier_index, ref most_recent_term) = satisfiers
                .iter()
                .max_by_key(|(index, _)| *index)
                .expect("a conflict has at least one term");
            let satisfier = self.partial_solution.assignment(satisfier_index).clone();
            if let Some(delegate) = delegate {
                delegate.conflict_resolution_step(
                    &self.store[current],
                    most_recent_term,
                    &satisfier,
                );
            }

            // The satisfier may imply the term only together with earlier
            // assignments; the leftover difference then pins how far back
            // we may jump.
            let difference = satisfier.term().difference(most_recent_term);
            let mut previous_level = 0;
            for (index, term) in &satisfiers {
                if term.package() != most_recent_term.package() {
                    previous_level = previous_level
                        .max(self.partial_solution.assignment(*index).decision_level());
                }
            }
            if let Some(difference) = &difference {
                let index = self.partial_solution.satisfier_index(&difference.inverse());
                previous_level =
                    previous_level.max(self.partial_solution.assignment(index).decision_level());
            }

            if previous_level < satisfier.decision_level() || satisfier.is_decision() {
                log::info!("backtracking to level {}", previous_level);
                self.partial_solution.backtrack(previous_level);
                if created_new {
                    self.register(current);
                }
                return Ok(current);
            }

            // Same decision level: resolve the conflict with the cause of
            // the satisfier and try again with the combined incompatibility.
            let prior = satisfier
                .cause()
                .expect("a non-decision satisfier always has a cause");
            let mut terms: Vec<Term> = self.store[current]
                .terms()
                .iter()
                .filter(|t| t.package() != most_recent_term.package())
                .cloned()
                .collect();
            terms.extend(
                self.store[prior]
                    .terms()
                    .iter()
                    .filter(|t| t.package() != satisfier.term().package())
                    .cloned(),
            );
            if let Some(difference) = difference {
                terms.push(difference.inverse());
            }
            let incompatibility = Incompatibility::new(
                terms,
                Cause::Conflict {
                    lhs: current,
                    rhs: prior,
                },
                &self.root,
            );
            log::info!("prior cause: {}", incompatibility);
            if let Some(delegate) = delegate {
                delegate.general_step(&GeneralStep {
                    value: StepValue::Incompatibility(incompatibility.clone()),
                    kind: StepKind::Incompatibility,
                    location: StepLocation::ConflictResolution,
                    cause: Some(describe_cause(&incompatibility)),
                    decision_level: self.partial_solution.decision_level(),
                });
            }
            current = self.store.alloc(incompatibility);
            created_new = true;
        }
    }

    fn trace_derivation(
        &self,
        delegate: Option<&dyn Delegate>,
        derived: &Term,
        cause: Id<Incompatibility>,
        location: StepLocation,
    ) {
        if let Some(delegate) = delegate {
            delegate.general_step(&GeneralStep {
                value: StepValue::Term(derived.clone()),
                kind: StepKind::Derivation,
                location,
                cause: Some(describe_cause(&self.store[cause])),
                decision_level: self.partial_solution.decision_level(),
            });
        }
    }
}

/// Short textual tag for the cause of an incompatibility, for tracing.
pub fn describe_cause(incompatibility: &Incompatibility) -> String {
    match incompatibility.cause() {
        Cause::Root => "root".to_string(),
        Cause::Dependency(package) => format!("dependency of {}", package),
        Cause::Conflict { .. } => "conflict".to_string(),
        Cause::NoAvailableVersion => "no available version".to_string(),
    }
}
