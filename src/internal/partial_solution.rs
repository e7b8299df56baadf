// SPDX-License-Identifier: MPL-2.0

//! The partial solution is the chronologically ordered list of assignments
//! built while solving, together with per-package summaries of what those
//! assignments imply.

use std::fmt::{self, Display};

use crate::internal::arena::Id;
use crate::internal::incompatibility::Incompatibility;
use crate::package::PackageRef;
use crate::requirement::{BoundVersion, Requirement};
use crate::term::{SetRelation, Term};
use crate::type_aliases::{Map, OrderedMap};

/// A single entry of the partial solution: either a decision (a chosen
/// binding for a package, cause is `None`) or a derivation (a term forced
/// by unit propagation, cause is the propagating incompatibility).
#[derive(Debug, Clone)]
pub struct Assignment {
    term: Term,
    decision_level: usize,
    cause: Option<Id<Incompatibility>>,
}

impl Assignment {
    /// The term stated by this assignment.
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Decision level the assignment was made at.
    pub fn decision_level(&self) -> usize {
        self.decision_level
    }

    /// The incompatibility that forced a derivation.
    pub fn cause(&self) -> Option<Id<Incompatibility>> {
        self.cause
    }

    /// Whether this assignment is a decision.
    pub fn is_decision(&self) -> bool {
        self.cause.is_none()
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_decision() {
            write!(f, "decision {} (level {})", self.term, self.decision_level)
        } else {
            write!(f, "derivation {} (level {})", self.term, self.decision_level)
        }
    }
}

/// All assignments made so far, with per-package summaries.
///
/// `positive` holds, for every package with at least one positive
/// assignment, the intersection of all its assignments; packages with only
/// negative assignments live in `negative` instead. A package is never in
/// both maps. `positive` is insertion ordered because decision making
/// walks it front to back.
#[derive(Debug, Clone, Default)]
pub struct PartialSolution {
    assignments: Vec<Assignment>,
    decisions: OrderedMap<PackageRef, BoundVersion>,
    positive: OrderedMap<PackageRef, Term>,
    negative: Map<PackageRef, Term>,
}

impl PartialSolution {
    /// Initialize an empty partial solution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current decision level. The root decision is level 0.
    pub fn decision_level(&self) -> usize {
        self.decisions.len().saturating_sub(1)
    }

    /// All assignments in chronological order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// The decided binding for a package, if any.
    pub fn decision(&self, package: &PackageRef) -> Option<&BoundVersion> {
        self.decisions.get(package)
    }

    /// Decided packages with their bindings, in decision order.
    pub fn decisions(&self) -> impl Iterator<Item = (&PackageRef, &BoundVersion)> {
        self.decisions.iter()
    }

    /// Append a derivation at the current decision level.
    pub fn derive(&mut self, term: Term, cause: Id<Incompatibility>) {
        let assignment = Assignment {
            term: term.clone(),
            decision_level: self.decision_level(),
            cause: Some(cause),
        };
        self.assignments.push(assignment);
        self.register(&term);
    }

    /// Append a decision, opening a new decision level.
    pub fn decide(&mut self, package: PackageRef, binding: BoundVersion) {
        debug_assert!(
            self.decisions.get(&package).is_none(),
            "{} already has a decision",
            package
        );
        if let BoundVersion::Version(v) = &binding {
            debug_assert!(
                self.positive
                    .get(&package)
                    .map_or(true, |term| match term.requirement() {
                        Requirement::Set(set) => set.contains(v),
                        _ => false,
                    }),
                "{} @ {} was expected to satisfy the accumulated constraint",
                package,
                v,
            );
        }
        let term = match &binding {
            BoundVersion::Version(v) => Term::exact(package.clone(), *v),
            BoundVersion::Revision(rev) => {
                Term::positive(package.clone(), Requirement::Revision(rev.clone()))
            }
            BoundVersion::Unversioned => {
                Term::positive(package.clone(), Requirement::Unversioned)
            }
        };
        self.decisions.insert(package, binding);
        let assignment = Assignment {
            term: term.clone(),
            decision_level: self.decision_level(),
            cause: None,
        };
        self.assignments.push(assignment);
        self.register(&term);
    }

    /// Fold an assignment's term into the per-package summaries.
    fn register(&mut self, term: &Term) {
        let package = term.package().clone();
        if let Some(existing) = self.positive.get(&package) {
            let merged = existing
                .intersect(term)
                .expect("positive assignments for one package never become empty");
            self.positive.insert(package, merged);
            return;
        }
        let merged = match self.negative.get(&package) {
            Some(negative) => term
                .intersect(negative)
                .expect("merging with the accumulated negative term never yields empty"),
            None => term.clone(),
        };
        if merged.is_positive() {
            self.negative.remove(&package);
            self.positive.insert(package, merged);
        } else {
            self.negative.insert(package, merged);
        }
    }

    /// Relation of the accumulated assignments with a term.
    /// A package nothing is known about is reported as an overlap.
    pub fn relation(&self, term: &Term) -> SetRelation {
        if let Some(positive) = self.positive.get(term.package()) {
            positive.relation(term)
        } else if let Some(negative) = self.negative.get(term.package()) {
            negative.relation(term)
        } else {
            SetRelation::Overlap
        }
    }

    /// Whether the accumulated assignments imply the term.
    pub fn satisfies(&self, term: &Term) -> bool {
        self.relation(term) == SetRelation::Subset
    }

    /// First package constrained positively but not yet decided, in
    /// assignment insertion order.
    pub fn first_undecided(&self) -> Option<&Term> {
        self.positive
            .iter()
            .find(|(package, _)| !self.decisions.contains_key(*package))
            .map(|(_, term)| term)
    }

    /// Index of the earliest assignment after which the accumulated
    /// assignments for the term's package imply the term.
    ///
    /// Conflict resolution only asks this for terms it knows are satisfied,
    /// so not finding a satisfier is a solver bug.
    pub fn satisfier_index(&self, term: &Term) -> usize {
        let mut accumulated: Option<Term> = None;
        for (index, assignment) in self.assignments.iter().enumerate() {
            if assignment.term.package() != term.package() {
                continue;
            }
            let merged = match &accumulated {
                Some(acc) => acc
                    .intersect(&assignment.term)
                    .expect("assignments of a consistent solution never fold to empty"),
                None => assignment.term.clone(),
            };
            if merged.satisfies(term) {
                return index;
            }
            accumulated = Some(merged);
        }
        unreachable!(
            "no satisfier found for {}: the term is not implied by the partial solution",
            term
        )
    }

    /// The assignment at a given index.
    pub fn assignment(&self, index: usize) -> &Assignment {
        &self.assignments[index]
    }

    /// Drop every assignment above the target decision level and rebuild
    /// the per-package summaries from what remains.
    pub fn backtrack(&mut self, to_level: usize) {
        while self
            .assignments
            .last()
            .map_or(false, |a| a.decision_level > to_level)
        {
            let popped = self.assignments.pop().expect("just checked non empty");
            if popped.is_decision() {
                self.decisions.shift_remove(popped.term.package());
            }
        }
        self.positive.clear();
        self.negative.clear();
        let terms: Vec<Term> = self.assignments.iter().map(|a| a.term.clone()).collect();
        for term in &terms {
            self.register(term);
        }
        debug_assert_eq!(self.decision_level(), to_level);
    }
}

impl Display for PartialSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "decision level {}", self.decision_level())?;
        for assignment in &self.assignments {
            writeln!(f, "  {}", assignment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::arena::Arena;
    use crate::internal::incompatibility::Cause;
    use crate::version::SemanticVersion;

    fn pkg(name: &str) -> PackageRef {
        PackageRef::new(name)
    }

    fn caret_term(name: &str, v: (u32, u32, u32), positive: bool) -> Term {
        let requirement = Requirement::caret(v);
        if positive {
            Term::positive(pkg(name), requirement)
        } else {
            Term::negative(pkg(name), requirement)
        }
    }

    fn dummy_cause(store: &mut Arena<Incompatibility>) -> Id<Incompatibility> {
        store.alloc(Incompatibility::new(
            vec![caret_term("x", (1, 0, 0), true)],
            Cause::NoAvailableVersion,
            &pkg("root"),
        ))
    }

    #[test]
    fn positive_absorbs_negative() {
        let mut store = Arena::new();
        let cause = dummy_cause(&mut store);
        let mut solution = PartialSolution::new();
        solution.derive(caret_term("a", (2, 0, 0), false), cause);
        assert_eq!(
            solution.relation(&caret_term("a", (2, 0, 0), true)),
            SetRelation::Disjoint
        );
        solution.derive(caret_term("a", (1, 0, 0), true), cause);
        // The negative assignment is folded into the positive summary.
        assert!(solution.satisfies(&caret_term("a", (1, 0, 0), true)));
        assert!(solution.first_undecided().is_some());
    }

    #[test]
    fn decisions_open_new_levels() {
        let mut store = Arena::new();
        let cause = dummy_cause(&mut store);
        let mut solution = PartialSolution::new();
        solution.decide(
            pkg("root"),
            BoundVersion::Version(SemanticVersion::one()),
        );
        assert_eq!(solution.decision_level(), 0);
        solution.derive(caret_term("a", (1, 0, 0), true), cause);
        solution.decide(
            pkg("a"),
            BoundVersion::Version(SemanticVersion::new(1, 2, 0)),
        );
        assert_eq!(solution.decision_level(), 1);
        assert!(solution.first_undecided().is_none());
    }

    #[test]
    fn satisfier_is_the_earliest_implying_assignment() {
        let mut store = Arena::new();
        let cause = dummy_cause(&mut store);
        let mut solution = PartialSolution::new();
        solution.decide(
            pkg("root"),
            BoundVersion::Version(SemanticVersion::one()),
        );
        solution.derive(caret_term("a", (1, 0, 0), true), cause);
        solution.derive(
            Term::positive(
                pkg("a"),
                Requirement::Set(crate::version_set::VersionSet::between((1, 2, 0), (2, 0, 0))),
            ),
            cause,
        );
        // The broad caret alone does not imply the narrow range; the second
        // derivation does.
        assert_eq!(
            solution.satisfier_index(&Term::positive(
                pkg("a"),
                Requirement::Set(crate::version_set::VersionSet::between((1, 2, 0), (2, 0, 0))),
            )),
            2
        );
        assert_eq!(solution.satisfier_index(&caret_term("a", (1, 0, 0), true)), 1);
    }

    #[test]
    fn backtrack_replays_remaining_assignments() {
        let mut store = Arena::new();
        let cause = dummy_cause(&mut store);
        let mut solution = PartialSolution::new();
        solution.decide(
            pkg("root"),
            BoundVersion::Version(SemanticVersion::one()),
        );
        solution.derive(caret_term("a", (1, 0, 0), true), cause);
        solution.decide(
            pkg("a"),
            BoundVersion::Version(SemanticVersion::new(1, 0, 0)),
        );
        solution.derive(caret_term("b", (2, 0, 0), true), cause);
        assert_eq!(solution.decision_level(), 1);

        solution.backtrack(0);
        assert_eq!(solution.decision_level(), 0);
        assert!(solution.decision(&pkg("a")).is_none());
        // The derivation from level 0 survives, the rest is gone.
        assert!(solution.satisfies(&caret_term("a", (1, 0, 0), true)));
        assert_eq!(
            solution.relation(&caret_term("b", (2, 0, 0), true)),
            SetRelation::Overlap
        );
        assert_eq!(solution.assignments().len(), 2);
    }
}
