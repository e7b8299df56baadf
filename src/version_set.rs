// SPDX-License-Identifier: MPL-2.0

//! Sets of versions as manipulated by the solver.
//!
//! A [VersionSet] is one of four cases:
//!  - [any](VersionSet::Any): the set of all possible versions
//!  - [empty](VersionSet::Empty): the empty set
//!  - [exact(v)](VersionSet::Exact): the set containing only the version v
//!  - [range(lo..hi)](VersionSet::Range): the half-open interval `lo <= v < hi`
//!
//! Contrary to general interval unions, this representation is closed under
//! neither complement nor union, which is why
//! [intersection_with_inverse](VersionSet::intersection_with_inverse)
//! approximates a two-interval residual with a single one.

use std::fmt::{self, Display};

use crate::version::SemanticVersion;

/// A set of versions. Ranges are half-open: `lo <= v < hi` with `lo < hi`.
///
/// A range is never empty by construction and is never collapsed to
/// [Exact](VersionSet::Exact), even when it contains a single version.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VersionSet {
    /// All possible versions.
    Any,
    /// No version.
    Empty,
    /// Exactly one version.
    Exact(SemanticVersion),
    /// The half-open interval `lo <= v < hi`.
    Range {
        /// Inclusive lower bound.
        lo: SemanticVersion,
        /// Exclusive upper bound.
        hi: SemanticVersion,
    },
}

impl VersionSet {
    /// Set of versions greater or equal to `lo` but strictly lower than `hi`.
    /// Degenerate bounds (`lo >= hi`) produce the empty set.
    pub fn between(lo: impl Into<SemanticVersion>, hi: impl Into<SemanticVersion>) -> Self {
        let (lo, hi) = (lo.into(), hi.into());
        if lo < hi {
            Self::Range { lo, hi }
        } else {
            Self::Empty
        }
    }

    /// Set containing exactly one version.
    pub fn exact(v: impl Into<SemanticVersion>) -> Self {
        Self::Exact(v.into())
    }

    /// Caret requirement: `[v, (v.major + 1).0.0)`.
    pub fn caret(v: impl Into<SemanticVersion>) -> Self {
        let v = v.into();
        Self::between(v, v.next_major())
    }

    /// Evaluate membership of a version in this set.
    pub fn contains(&self, v: &SemanticVersion) -> bool {
        match self {
            Self::Any => true,
            Self::Empty => false,
            Self::Exact(exact) => exact == v,
            Self::Range { lo, hi } => lo <= v && v < hi,
        }
    }

    /// Compute the intersection of two sets.
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, _) => other.clone(),
            (_, Self::Any) => self.clone(),
            (Self::Empty, _) | (_, Self::Empty) => Self::Empty,
            (Self::Exact(v), _) => {
                if other.contains(v) {
                    self.clone()
                } else {
                    Self::Empty
                }
            }
            (_, Self::Exact(v)) => {
                if self.contains(v) {
                    other.clone()
                } else {
                    Self::Empty
                }
            }
            (Self::Range { lo: a, hi: b }, Self::Range { lo: c, hi: d }) => {
                Self::between(*a.max(c), *b.min(d))
            }
        }
    }

    /// Compute `self ∩ ¬other`.
    ///
    /// When the true residual spans two intervals, the result is approximated
    /// by a single one: the left residual when `other`'s lower bound is above
    /// `self`'s, otherwise the right residual. A right residual with no upper
    /// bound is not representable in this four-case set; the whole of
    /// [Any](VersionSet::Any) is kept instead, a superset of the true
    /// residual that later propagation narrows down again.
    pub fn intersection_with_inverse(&self, other: &Self) -> Self {
        match (self, other) {
            (_, Self::Empty) => self.clone(),
            (_, Self::Any) => Self::Empty,
            (Self::Empty, _) => Self::Empty,
            (Self::Exact(v), _) => {
                if other.contains(v) {
                    Self::Empty
                } else {
                    self.clone()
                }
            }
            (Self::Any, Self::Exact(v)) => {
                if *v == SemanticVersion::zero() {
                    Self::Any
                } else {
                    Self::between(SemanticVersion::zero(), *v)
                }
            }
            (Self::Any, Self::Range { lo, .. }) => {
                if *lo == SemanticVersion::zero() {
                    Self::Any
                } else {
                    Self::between(SemanticVersion::zero(), *lo)
                }
            }
            (Self::Range { lo, hi }, Self::Exact(v)) => {
                if v < lo || v >= hi {
                    self.clone()
                } else {
                    Self::residual(*lo, *hi, *v, v.bump())
                }
            }
            (Self::Range { lo: a, hi: b }, Self::Range { lo: c, hi: d }) => {
                if d <= a || c >= b {
                    self.clone()
                } else {
                    Self::residual(*a, *b, *c, *d)
                }
            }
        }
    }

    /// Single-interval residual of `[a, b) \ [c, d)` for overlapping inputs.
    fn residual(
        a: SemanticVersion,
        b: SemanticVersion,
        c: SemanticVersion,
        d: SemanticVersion,
    ) -> Self {
        let left = Self::between(a, c.min(b));
        let right = Self::between(d.max(a), b);
        // When both residuals are non-empty, `c > a` holds and the left
        // one is kept.
        if left == VersionSet::Empty {
            right
        } else {
            left
        }
    }
}

impl Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Empty => write!(f, "∅"),
            Self::Exact(v) => write!(f, "{}", v),
            Self::Range { lo, hi } => write!(f, "{} <= v < {}", lo, hi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u32, minor: u32, patch: u32) -> SemanticVersion {
        SemanticVersion::new(major, minor, patch)
    }

    #[test]
    fn degenerate_range_is_empty() {
        assert_eq!(VersionSet::between(v(2, 0, 0), v(1, 0, 0)), VersionSet::Empty);
        assert_eq!(VersionSet::between(v(1, 0, 0), v(1, 0, 0)), VersionSet::Empty);
    }

    #[test]
    fn caret_spans_to_next_major() {
        let set = VersionSet::caret(v(1, 2, 3));
        assert!(set.contains(&v(1, 2, 3)));
        assert!(set.contains(&v(1, 9, 0)));
        assert!(!set.contains(&v(2, 0, 0)));
        assert!(!set.contains(&v(1, 2, 2)));
    }

    #[test]
    fn intersection_of_ranges() {
        let a = VersionSet::between(v(1, 0, 0), v(3, 0, 0));
        let b = VersionSet::between(v(2, 0, 0), v(4, 0, 0));
        assert_eq!(a.intersection(&b), VersionSet::between(v(2, 0, 0), v(3, 0, 0)));

        let c = VersionSet::between(v(3, 0, 0), v(4, 0, 0));
        assert_eq!(a.intersection(&c), VersionSet::Empty);
    }

    #[test]
    fn intersection_with_exact() {
        let range = VersionSet::caret(v(1, 0, 0));
        assert_eq!(
            range.intersection(&VersionSet::exact(v(1, 5, 0))),
            VersionSet::exact(v(1, 5, 0))
        );
        assert_eq!(
            VersionSet::exact(v(2, 0, 0)).intersection(&range),
            VersionSet::Empty
        );
    }

    #[test]
    fn any_and_empty_are_identity_and_absorbing() {
        let range = VersionSet::caret(v(1, 0, 0));
        assert_eq!(VersionSet::Any.intersection(&range), range);
        assert_eq!(VersionSet::Empty.intersection(&range), VersionSet::Empty);
    }

    #[test]
    fn inverse_intersection_keeps_disjoint_input() {
        let a = VersionSet::between(v(1, 0, 0), v(2, 0, 0));
        let b = VersionSet::between(v(2, 0, 0), v(3, 0, 0));
        assert_eq!(a.intersection_with_inverse(&b), a);
    }

    #[test]
    fn inverse_intersection_matching_endpoint_collapses() {
        // Removing a prefix keeps the right residual.
        let a = VersionSet::between(v(1, 0, 0), v(3, 0, 0));
        let prefix = VersionSet::between(v(1, 0, 0), v(2, 0, 0));
        assert_eq!(
            a.intersection_with_inverse(&prefix),
            VersionSet::between(v(2, 0, 0), v(3, 0, 0))
        );
        // Removing a suffix keeps the left residual.
        let suffix = VersionSet::between(v(2, 0, 0), v(3, 0, 0));
        assert_eq!(
            a.intersection_with_inverse(&suffix),
            VersionSet::between(v(1, 0, 0), v(2, 0, 0))
        );
    }

    #[test]
    fn inverse_intersection_inner_range_approximates_left() {
        // True residual is [1,2) ∪ [3,4); the single-interval
        // approximation keeps the left part.
        let a = VersionSet::between(v(1, 0, 0), v(4, 0, 0));
        let inner = VersionSet::between(v(2, 0, 0), v(3, 0, 0));
        assert_eq!(
            a.intersection_with_inverse(&inner),
            VersionSet::between(v(1, 0, 0), v(2, 0, 0))
        );
    }

    #[test]
    fn inverse_intersection_exact_at_lower_bound() {
        let a = VersionSet::between(v(1, 0, 0), v(2, 0, 0));
        let removed = VersionSet::exact(v(1, 0, 0));
        assert_eq!(
            a.intersection_with_inverse(&removed),
            VersionSet::between(v(1, 0, 1), v(2, 0, 0))
        );
    }

    #[test]
    fn inverse_intersection_of_any() {
        assert_eq!(
            VersionSet::Any.intersection_with_inverse(&VersionSet::caret(v(1, 0, 0))),
            VersionSet::between(v(0, 0, 0), v(1, 0, 0))
        );
        assert_eq!(
            VersionSet::Any.intersection_with_inverse(&VersionSet::Empty),
            VersionSet::Any
        );
        // A zero-rooted removal leaves only an unbounded right residual,
        // which is kept as the containing set.
        assert_eq!(
            VersionSet::Any
                .intersection_with_inverse(&VersionSet::between(v(0, 0, 0), v(1, 0, 0))),
            VersionSet::Any
        );
    }
}
