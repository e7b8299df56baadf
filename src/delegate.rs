// SPDX-License-Identifier: MPL-2.0

//! Optional observer of the solver's progress.
//!
//! A [Delegate] receives a step for every incompatibility added, every
//! decision and derivation made, and every round of conflict resolution.
//! All methods default to doing nothing. Tracing has no effect on the
//! outcome of a solve.

use crate::internal::incompatibility::Incompatibility;
use crate::internal::partial_solution::Assignment;
use crate::term::Term;

/// What part of the algorithm emitted a step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StepLocation {
    /// The top level driving loop.
    TopLevel,
    /// Unit propagation.
    UnitPropagation,
    /// Decision making.
    DecisionMaking,
    /// Conflict resolution.
    ConflictResolution,
}

/// What kind of event a step reports.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StepKind {
    /// An incompatibility entered the database.
    Incompatibility,
    /// A version was decided.
    Decision,
    /// A term was derived.
    Derivation,
}

/// Payload of a general step.
#[derive(Debug, Clone)]
pub enum StepValue {
    /// The incompatibility added.
    Incompatibility(Incompatibility),
    /// The term decided or derived.
    Term(Term),
}

/// A general trace step.
#[derive(Debug, Clone)]
pub struct GeneralStep {
    /// The incompatibility or term this step is about.
    pub value: StepValue,
    /// Kind of event.
    pub kind: StepKind,
    /// Where in the algorithm the event happened.
    pub location: StepLocation,
    /// Short description of the cause, when there is one.
    pub cause: Option<String>,
    /// Decision level at the time of the event.
    pub decision_level: usize,
}

/// Receiver for the solver's trace stream.
pub trait Delegate {
    /// An incompatibility, decision or derivation step.
    fn general_step(&self, _step: &GeneralStep) {}

    /// One round of conflict resolution: the conflicting incompatibility,
    /// the term whose satisfier drives the round, and that satisfier.
    fn conflict_resolution_step(
        &self,
        _incompatibility: &Incompatibility,
        _term: &Term,
        _satisfier: &Assignment,
    ) {
    }
}

impl<T: Delegate + ?Sized> Delegate for std::sync::Arc<T> {
    fn general_step(&self, step: &GeneralStep) {
        T::general_step(self, step)
    }

    fn conflict_resolution_step(
        &self,
        incompatibility: &Incompatibility,
        term: &Term,
        satisfier: &Assignment,
    ) {
        T::conflict_resolution_step(self, incompatibility, term, satisfier)
    }
}
