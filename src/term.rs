// SPDX-License-Identifier: MPL-2.0

//! A term is the fundamental unit of operation of the PubGrub algorithm.
//! It is a positive or negative expression regarding the selected version
//! of a single package.

use std::fmt::{self, Display};

use crate::package::PackageRef;
use crate::requirement::Requirement;
use crate::version::SemanticVersion;
use crate::version_set::VersionSet;

/// A positive or negative expression regarding a package.
///
/// A positive term is evaluated true if a version of the package is selected
/// and satisfies the requirement. The negative term "not a ^1.0.0" is
/// evaluated true if no version satisfying the requirement is selected,
/// including when no version is selected at all.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Term {
    package: PackageRef,
    requirement: Requirement,
    positive: bool,
}

/// Describe a relation between the accumulated assignments for a package
/// and another term on the same package.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SetRelation {
    /// If self is true, other is necessarily true.
    Subset,
    /// Self and other can be true at the same time, neither implies the other.
    Overlap,
    /// If self is true, other is necessarily false.
    Disjoint,
}

/// Base methods.
impl Term {
    /// A positive term.
    pub fn positive(package: PackageRef, requirement: Requirement) -> Self {
        Self {
            package,
            requirement,
            positive: true,
        }
    }

    /// A negative term.
    pub fn negative(package: PackageRef, requirement: Requirement) -> Self {
        Self {
            package,
            requirement,
            positive: false,
        }
    }

    /// A positive term containing exactly one version.
    pub fn exact(package: PackageRef, version: SemanticVersion) -> Self {
        Self::positive(package, Requirement::exact(version))
    }

    /// The package this term is about.
    pub fn package(&self) -> &PackageRef {
        &self.package
    }

    /// The requirement of this term.
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Simply check if a term is positive.
    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// Flip the polarity of a term.
    /// Evaluation of the inverse always returns the opposite of the
    /// evaluation of the original.
    pub fn inverse(&self) -> Self {
        Self {
            package: self.package.clone(),
            requirement: self.requirement.clone(),
            positive: !self.positive,
        }
    }
}

/// Set operations with terms.
impl Term {
    /// Compute the intersection of two terms on the same package.
    ///
    /// If at least one term is positive, the intersection is also positive.
    /// The intersection of two negative range terms widens to the enclosing
    /// range `min(lo) <= v < max(hi)`, a superset of the true union of the
    /// two excluded sets. Returns `None` when the intersection is empty, and
    /// also when either requirement is an opaque binding different from the
    /// other (those carry no algebra).
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        assert_eq!(
            self.package, other.package,
            "attempted to intersect terms for different packages"
        );
        let (set, other_set) = match (&self.requirement, &other.requirement) {
            (Requirement::Set(a), Requirement::Set(b)) => (a, b),
            _ => {
                // Identical opaque requirements of matching polarity still
                // carry information; everything else is not intersectable.
                return (self.requirement == other.requirement
                    && self.positive == other.positive)
                    .then(|| self.clone());
            }
        };
        let (requirement, positive) = match (self.positive, other.positive) {
            (true, true) => (set.intersection(other_set), true),
            (true, false) => (set.intersection_with_inverse(other_set), true),
            (false, true) => (other_set.intersection_with_inverse(set), true),
            (false, false) => match (set, other_set) {
                (
                    VersionSet::Range { lo: a, hi: b },
                    VersionSet::Range { lo: c, hi: d },
                ) => (VersionSet::between(*a.min(c), *b.max(d)), false),
                _ => (set.intersection(other_set), false),
            },
        };
        if requirement == VersionSet::Empty {
            return None;
        }
        Some(Self {
            package: self.package.clone(),
            requirement: Requirement::Set(requirement),
            positive,
        })
    }

    /// Compute the difference `self ∩ ¬other`.
    pub fn difference(&self, other: &Self) -> Option<Self> {
        self.intersect(&other.inverse())
    }

    /// Relation of this term (understood as the accumulated assignments for
    /// its package) with another term on the same package.
    ///
    /// Calling this on terms for distinct packages is a programmer error.
    pub fn relation(&self, other: &Self) -> SetRelation {
        assert_eq!(
            self.package, other.package,
            "attempted to compute the relation of terms for different packages"
        );
        match (self.positive, other.positive) {
            (true, true) => {
                if other.requirement.contains_all(&self.requirement) {
                    SetRelation::Subset
                } else if other.requirement.contains_any(&self.requirement) {
                    SetRelation::Overlap
                } else {
                    SetRelation::Disjoint
                }
            }
            (true, false) => {
                if other.requirement.contains_all(&self.requirement) {
                    SetRelation::Disjoint
                } else if other.requirement.contains_any(&self.requirement) {
                    SetRelation::Overlap
                } else {
                    SetRelation::Subset
                }
            }
            (false, true) => {
                if self.requirement.contains_all(&other.requirement) {
                    SetRelation::Disjoint
                } else {
                    SetRelation::Overlap
                }
            }
            (false, false) => {
                if self.requirement.contains_all(&other.requirement) {
                    SetRelation::Subset
                } else {
                    SetRelation::Overlap
                }
            }
        }
    }

    /// Whether this term being true forces `other` to be true.
    pub fn satisfies(&self, other: &Self) -> bool {
        self.package == other.package && self.relation(other) == SetRelation::Subset
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{} {}", self.package, self.requirement)
        } else {
            write!(f, "not {} {}", self.package, self.requirement)
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use proptest::prelude::*;

    fn version_strategy() -> impl Strategy<Value = SemanticVersion> {
        (0u32..4, 0u32..4).prop_map(|(major, minor)| SemanticVersion::new(major, minor, 0))
    }

    fn set_strategy() -> impl Strategy<Value = VersionSet> {
        prop_oneof![
            Just(VersionSet::Any),
            version_strategy().prop_map(|v| VersionSet::exact(v)),
            (version_strategy(), version_strategy())
                .prop_filter("range needs lo < hi", |(lo, hi)| lo < hi)
                .prop_map(|(lo, hi)| VersionSet::between(lo, hi)),
        ]
    }

    pub fn strategy() -> impl Strategy<Value = Term> {
        (set_strategy(), any::<bool>()).prop_map(|(set, positive)| Term {
            package: PackageRef::new("p"),
            requirement: Requirement::Set(set),
            positive,
        })
    }

    proptest! {
        #[test]
        fn double_inverse_is_identity(term in strategy()) {
            prop_assert_eq!(term.inverse().inverse(), term);
        }

        #[test]
        fn intersect_commutes_on_equal_polarity(t1 in strategy(), t2 in strategy()) {
            if t1.is_positive() == t2.is_positive() {
                prop_assert_eq!(t1.intersect(&t2), t2.intersect(&t1));
            }
        }

        #[test]
        fn subset_relation_means_satisfies(t1 in strategy(), t2 in strategy()) {
            if t1.relation(&t2) == SetRelation::Subset {
                prop_assert!(t1.satisfies(&t2));
            }
        }

        #[test]
        fn disjoint_positive_terms_do_not_intersect(t1 in strategy(), t2 in strategy()) {
            if t1.is_positive() && t2.is_positive()
                && t1.relation(&t2) == SetRelation::Disjoint
            {
                prop_assert_eq!(t1.intersect(&t2), None);
            }
        }
    }

    #[test]
    fn negative_range_intersection_widens() {
        let pkg = PackageRef::new("p");
        let t1 = Term::negative(
            pkg.clone(),
            Requirement::Set(VersionSet::between((1, 0, 0), (2, 0, 0))),
        );
        let t2 = Term::negative(
            pkg.clone(),
            Requirement::Set(VersionSet::between((3, 0, 0), (4, 0, 0))),
        );
        // The enclosing range covers the gap between the two excluded
        // ranges as well, on purpose.
        let widened = t1.intersect(&t2).unwrap();
        assert!(!widened.is_positive());
        assert_eq!(
            widened.requirement(),
            &Requirement::Set(VersionSet::between((1, 0, 0), (4, 0, 0)))
        );
    }

    #[test]
    fn mixed_polarity_intersection_is_positive() {
        let pkg = PackageRef::new("p");
        let all = Term::positive(pkg.clone(), Requirement::Set(VersionSet::caret((1, 0, 0))));
        let not_low = Term::negative(
            pkg.clone(),
            Requirement::Set(VersionSet::between((1, 0, 0), (1, 5, 0))),
        );
        let narrowed = all.intersect(&not_low).unwrap();
        assert!(narrowed.is_positive());
        assert_eq!(
            narrowed.requirement(),
            &Requirement::Set(VersionSet::between((1, 5, 0), (2, 0, 0)))
        );
    }

    #[test]
    fn opaque_requirements_do_not_mix() {
        let pkg = PackageRef::new("p");
        let rev = Term::positive(pkg.clone(), Requirement::Revision("main".into()));
        let set = Term::positive(pkg.clone(), Requirement::caret((1, 0, 0)));
        assert_eq!(rev.intersect(&set), None);
        assert_eq!(rev.intersect(&rev.clone()), Some(rev.clone()));
        assert_eq!(rev.relation(&set), SetRelation::Disjoint);
        assert_eq!(rev.relation(&rev), SetRelation::Subset);
    }

    #[test]
    fn relation_of_solution_term_with_dependency_terms() {
        let pkg = PackageRef::new("b");
        // Solution holds b in ^1.0.0.
        let solution = Term::positive(pkg.clone(), Requirement::caret((1, 0, 0)));
        // A dependency on b ^2.0.0 appears as the negative term of an
        // incompatibility; the solution fully contradicts it.
        let incompat = Term::negative(pkg.clone(), Requirement::caret((2, 0, 0)));
        assert_eq!(solution.relation(&incompat), SetRelation::Subset);
        // Whereas a dependency on b ^1.0.0 is contradicted.
        let incompat = Term::negative(pkg.clone(), Requirement::caret((1, 0, 0)));
        assert_eq!(solution.relation(&incompat), SetRelation::Disjoint);
    }
}
