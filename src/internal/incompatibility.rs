// SPDX-License-Identifier: MPL-2.0

//! An incompatibility is a set of terms for different packages
//! that should never be satisfied all together.

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use crate::internal::arena::Id;
use crate::package::PackageRef;
use crate::term::{SetRelation, Term};

/// An incompatibility is a conjunction of terms that cannot all hold.
///
/// An incompatibility usually originates from a package dependency. For
/// example, if package a at version 1.0.0 depends on b ^2.0.0, then the
/// terms `a 1.0.0 <= v < 2.0.0` and `not b 2.0.0 <= v < 3.0.0` can never be
/// satisfied at the same time in a partial solution: that would mean a was
/// selected in a range that needs b, yet no suitable b was selected.
///
/// Incompatibilities are also derived from two others during conflict
/// resolution, in which case the cause records both parents. The parents
/// form a DAG over the incompatibility store, walked for error reporting.
#[derive(Debug, Clone)]
pub struct Incompatibility {
    terms: Vec<Term>,
    cause: Cause,
}

/// Where an incompatibility comes from.
///
/// The conflict variant is the only internal node of the cause graph; the
/// three others are its leaves.
#[derive(Debug, Clone)]
pub enum Cause {
    /// Constraint of the root package on one of its direct dependencies.
    Root,
    /// Dependency of a non-root package at some version range.
    Dependency(PackageRef),
    /// Derived from two conflicting incompatibilities during resolution.
    Conflict {
        /// The incompatibility that was found satisfied.
        lhs: Id<Incompatibility>,
        /// The cause of its most recent satisfier.
        rhs: Id<Incompatibility>,
    },
    /// No candidate version matches the accumulated constraint.
    NoAvailableVersion,
}

/// How the terms of the partial solution relate to an incompatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    /// Every term of the incompatibility is satisfied: the partial solution
    /// violates the incompatibility and conflict resolution must run.
    Satisfied,
    /// All terms but the carried one are satisfied; unit propagation derives
    /// the inverse of that term.
    AlmostSatisfied(Term),
    /// At least one term is contradicted, the incompatibility is inert.
    Contradicted,
    /// Anything else: two or more terms are undetermined.
    Inconclusive,
}

impl Incompatibility {
    /// Build a normalized incompatibility.
    ///
    /// A positive term on the root package contributes no constraint when
    /// the cause is a conflict (root is always selected) and is dropped.
    /// Multiple terms for one package are folded into a single term by
    /// intersection; the fold failing means the caller tried to construct
    /// an incompatibility out of unrelatable terms, which cannot happen for
    /// terms taken from a consistent solution.
    pub fn new(terms: Vec<Term>, cause: Cause, root: &PackageRef) -> Self {
        let mut terms = terms;
        if terms.len() > 1 && matches!(cause, Cause::Conflict { .. }) {
            terms.retain(|t| !(t.is_positive() && t.package() == root));
        }
        let mut folded: Vec<Term> = Vec::with_capacity(terms.len());
        for term in terms {
            match folded.iter_mut().find(|t| t.package() == term.package()) {
                Some(prior) => {
                    *prior = prior
                        .intersect(&term)
                        .expect("incompatibility terms for one package never fold to empty");
                }
                None => folded.push(term),
            }
        }
        folded.sort_by(|a, b| a.package().cmp(b.package()));
        Self {
            terms: folded,
            cause,
        }
    }

    /// The normalized terms, sorted by package.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// The cause of this incompatibility.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Parent ids when this incompatibility was derived from a conflict.
    pub fn conflict_causes(&self) -> Option<(Id<Incompatibility>, Id<Incompatibility>)> {
        match self.cause {
            Cause::Conflict { lhs, rhs } => Some((lhs, rhs)),
            _ => None,
        }
    }

    /// Whether this incompatibility was derived during conflict resolution.
    pub fn is_derived(&self) -> bool {
        matches!(self.cause, Cause::Conflict { .. })
    }

    /// Get the term related to a given package, if any.
    pub fn get(&self, package: &PackageRef) -> Option<&Term> {
        self.terms.iter().find(|t| t.package() == package)
    }

    /// An incompatibility with no term, or with only a positive term on the
    /// root package, can never be dodged: solving has failed.
    pub fn is_failure(&self, root: &PackageRef) -> bool {
        match self.terms.as_slice() {
            [] => true,
            [term] => term.is_positive() && term.package() == root,
            _ => false,
        }
    }

    /// Relation of the partial solution with this incompatibility, given a
    /// callback computing the relation of the solution with a single term.
    pub fn relation(&self, mut relation_of: impl FnMut(&Term) -> SetRelation) -> Relation {
        let mut unsatisfied = None;
        for term in &self.terms {
            match relation_of(term) {
                SetRelation::Disjoint => return Relation::Contradicted,
                SetRelation::Overlap => {
                    if unsatisfied.is_some() {
                        return Relation::Inconclusive;
                    }
                    unsatisfied = Some(term.clone());
                }
                SetRelation::Subset => {}
            }
        }
        match unsatisfied {
            Some(term) => Relation::AlmostSatisfied(term),
            None => Relation::Satisfied,
        }
    }
}

// Equality and hashing are structural over the terms only: two
// incompatibilities with the same terms express the same constraint
// regardless of how the cause graph produced them, and the database
// suppresses such duplicates.
impl PartialEq for Incompatibility {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Eq for Incompatibility {}

impl Hash for Incompatibility {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.terms.hash(state)
    }
}

impl Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "version solving failed");
        }
        let rendered: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}
