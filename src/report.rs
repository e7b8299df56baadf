// SPDX-License-Identifier: MPL-2.0

//! Build a report as clear as possible as to why dependency solving failed.
//!
//! The terminal incompatibility of a failed solve is the root of a DAG of
//! conflicts whose leaves are external causes (root constraints, package
//! dependencies, missing versions). The walker renders that graph as a
//! numbered list of "Because ... , ..." sentences, referencing previously
//! printed conclusions by line number when a node is shared.

use crate::internal::arena::{Arena, Id};
use crate::internal::incompatibility::{Cause, Incompatibility};
use crate::package::PackageRef;
use crate::requirement::Requirement;
use crate::term::Term;
use crate::type_aliases::Map;
use crate::version_set::VersionSet;

/// Render the derivation report for a terminal incompatibility.
pub(crate) fn render(
    terminal: Id<Incompatibility>,
    store: &Arena<Incompatibility>,
    root: &PackageRef,
) -> String {
    if !store[terminal].is_derived() {
        return describe_external(&store[terminal], root);
    }
    Walker::new(store, root, terminal).run(terminal)
}

/// One deferred unit of rendering work.
///
/// The walker emulates the natural recursion with an explicit stack: a
/// `Visit` frame inspects a node and either writes its line directly or
/// pushes the frames for its parents followed by a `Conclude` frame that
/// writes the line once those parents have been printed.
enum Frame {
    Visit {
        id: Id<Incompatibility>,
        conclusion: bool,
    },
    Blank,
    Conclude {
        id: Id<Incompatibility>,
        conclusion: bool,
        line: Conclusion,
    },
}

/// The shape of a deferred line.
enum Conclusion {
    /// "And because {external}, {self}."
    AndExternal { external: Id<Incompatibility> },
    /// "And because {prior} and {external}, {self}."
    AndPriorAndExternal {
        prior: Id<Incompatibility>,
        external: Id<Incompatibility>,
    },
    /// "And because {referenced} ({n}), {self}."
    AndRef { referenced: Id<Incompatibility> },
    /// "Thus, {self}."
    Thus,
}

struct Walker<'a> {
    store: &'a Arena<Incompatibility>,
    root: &'a PackageRef,
    /// Number of references to each node in the cause graph; nodes
    /// referenced more than once receive a line number at first print.
    derivations: Map<usize, usize>,
    line_numbers: Map<usize, usize>,
    lines: Vec<String>,
}

impl<'a> Walker<'a> {
    fn new(
        store: &'a Arena<Incompatibility>,
        root: &'a PackageRef,
        terminal: Id<Incompatibility>,
    ) -> Self {
        // Count how often each node is derived from, without recursion.
        let mut derivations: Map<usize, usize> = Map::default();
        let mut stack = vec![terminal];
        derivations.insert(terminal.into_raw(), 1);
        while let Some(id) = stack.pop() {
            if let Some((lhs, rhs)) = store[id].conflict_causes() {
                for parent in [lhs, rhs] {
                    let count = derivations.entry(parent.into_raw()).or_insert(0);
                    *count += 1;
                    if *count == 1 {
                        stack.push(parent);
                    }
                }
            }
        }
        Self {
            store,
            root,
            derivations,
            line_numbers: Map::default(),
            lines: Vec::new(),
        }
    }

    fn run(mut self, terminal: Id<Incompatibility>) -> String {
        let mut stack = vec![Frame::Visit {
            id: terminal,
            conclusion: true,
        }];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit { id, conclusion } => self.visit(id, conclusion, &mut stack),
                Frame::Blank => self.lines.push(String::new()),
                Frame::Conclude {
                    id,
                    conclusion,
                    line,
                } => {
                    let text = match line {
                        Conclusion::AndExternal { external } => format!(
                            "And because {}, {}.",
                            self.describe(external),
                            self.describe(id)
                        ),
                        Conclusion::AndPriorAndExternal { prior, external } => format!(
                            "And because {} and {}, {}.",
                            self.describe(prior),
                            self.describe(external),
                            self.describe(id)
                        ),
                        Conclusion::AndRef { referenced } => format!(
                            "And because {} ({}), {}.",
                            self.describe(referenced),
                            self.line_ref(referenced)
                                .expect("the referenced node was numbered when visited"),
                            self.describe(id)
                        ),
                        Conclusion::Thus => format!("Thus, {}.", self.describe(id)),
                    };
                    self.lines.push(text);
                    self.number(id, conclusion);
                }
            }
        }
        self.lines.join("\n")
    }

    /// Inspect one derived node: either its line can be written right away,
    /// or parent frames are scheduled first.
    fn visit(&mut self, id: Id<Incompatibility>, conclusion: bool, stack: &mut Vec<Frame>) {
        let Some((lhs, rhs)) = self.store[id].conflict_causes() else {
            // External causes are only ever printed inline by their
            // consumers.
            return;
        };
        let lhs_derived = self.store[lhs].is_derived();
        let rhs_derived = self.store[rhs].is_derived();
        if lhs_derived && rhs_derived {
            match (self.line_ref(lhs), self.line_ref(rhs)) {
                (Some(lhs_ref), Some(rhs_ref)) => {
                    self.lines.push(format!(
                        "Because {} ({}) and {} ({}), {}.",
                        self.describe(lhs),
                        lhs_ref,
                        self.describe(rhs),
                        rhs_ref,
                        self.describe(id)
                    ));
                    self.number(id, conclusion);
                }
                (Some(_), None) => {
                    stack.push(Frame::Conclude {
                        id,
                        conclusion,
                        line: Conclusion::AndRef { referenced: lhs },
                    });
                    stack.push(Frame::Visit {
                        id: rhs,
                        conclusion: false,
                    });
                }
                (None, Some(_)) => {
                    stack.push(Frame::Conclude {
                        id,
                        conclusion,
                        line: Conclusion::AndRef { referenced: rhs },
                    });
                    stack.push(Frame::Visit {
                        id: lhs,
                        conclusion: false,
                    });
                }
                (None, None) => {
                    if self.is_single_line(rhs) {
                        stack.push(Frame::Conclude {
                            id,
                            conclusion,
                            line: Conclusion::Thus,
                        });
                        stack.push(Frame::Visit {
                            id: rhs,
                            conclusion: false,
                        });
                        stack.push(Frame::Visit {
                            id: lhs,
                            conclusion: false,
                        });
                    } else if self.is_single_line(lhs) {
                        stack.push(Frame::Conclude {
                            id,
                            conclusion,
                            line: Conclusion::Thus,
                        });
                        stack.push(Frame::Visit {
                            id: lhs,
                            conclusion: false,
                        });
                        stack.push(Frame::Visit {
                            id: rhs,
                            conclusion: false,
                        });
                    } else {
                        // Print the left branch as an intermediate
                        // conclusion so the final line can reference it.
                        stack.push(Frame::Conclude {
                            id,
                            conclusion,
                            line: Conclusion::AndRef { referenced: lhs },
                        });
                        stack.push(Frame::Visit {
                            id: rhs,
                            conclusion: false,
                        });
                        stack.push(Frame::Blank);
                        stack.push(Frame::Visit {
                            id: lhs,
                            conclusion: true,
                        });
                    }
                }
            }
        } else if lhs_derived || rhs_derived {
            let (derived, external) = if lhs_derived { (lhs, rhs) } else { (rhs, lhs) };
            if let Some(derived_ref) = self.line_ref(derived) {
                self.lines.push(format!(
                    "Because {} ({}) and {}, {}.",
                    self.describe(derived),
                    derived_ref,
                    self.describe(external),
                    self.describe(id)
                ));
                self.number(id, conclusion);
            } else if self.is_collapsible(derived) {
                let (parent_lhs, parent_rhs) = self.store[derived]
                    .conflict_causes()
                    .expect("a collapsible node is derived");
                // TODO: pick by derivedness rather than position; a
                // right-hand derived parent is inlined as if external.
                let collapsed_derived = parent_lhs;
                let collapsed_external = parent_rhs;
                stack.push(Frame::Conclude {
                    id,
                    conclusion,
                    line: Conclusion::AndPriorAndExternal {
                        prior: collapsed_external,
                        external,
                    },
                });
                stack.push(Frame::Visit {
                    id: collapsed_derived,
                    conclusion: false,
                });
            } else {
                stack.push(Frame::Conclude {
                    id,
                    conclusion,
                    line: Conclusion::AndExternal { external },
                });
                stack.push(Frame::Visit {
                    id: derived,
                    conclusion: false,
                });
            }
        } else {
            self.lines.push(format!(
                "Because {} and {}, {}.",
                self.describe(lhs),
                self.describe(rhs),
                self.describe(id)
            ));
            self.number(id, conclusion);
        }
    }

    /// A derived node prints as a single "Because ..." line when both its
    /// parents are external.
    // TODO: a shared parent counts as single-line here even though its
    // first print will carry a line number.
    fn is_single_line(&self, id: Id<Incompatibility>) -> bool {
        match self.store[id].conflict_causes() {
            Some((lhs, rhs)) => {
                !self.store[lhs].is_derived() && !self.store[rhs].is_derived()
            }
            None => false,
        }
    }

    /// A derived node can be folded into its consumer's line when it is not
    /// shared and exactly one of its parents is derived and unprinted.
    fn is_collapsible(&self, id: Id<Incompatibility>) -> bool {
        if self.derivations.get(&id.into_raw()).copied().unwrap_or(0) > 1 {
            return false;
        }
        let Some((lhs, rhs)) = self.store[id].conflict_causes() else {
            return false;
        };
        let lhs_derived = self.store[lhs].is_derived();
        let rhs_derived = self.store[rhs].is_derived();
        if lhs_derived == rhs_derived {
            return false;
        }
        let complex = if lhs_derived { lhs } else { rhs };
        self.line_ref(complex).is_none()
    }

    fn line_ref(&self, id: Id<Incompatibility>) -> Option<usize> {
        self.line_numbers.get(&id.into_raw()).copied()
    }

    /// Assign the next line number to the line just written, when the node
    /// is shared in the graph or is the final conclusion.
    fn number(&mut self, id: Id<Incompatibility>, conclusion: bool) {
        let shared = self.derivations.get(&id.into_raw()).copied().unwrap_or(0) > 1;
        if !(shared || conclusion) || self.line_numbers.contains_key(&id.into_raw()) {
            return;
        }
        let next = self.line_numbers.len() + 1;
        self.line_numbers.insert(id.into_raw(), next);
        if let Some(line) = self.lines.last_mut() {
            *line = format!("{} ({})", line, next);
        }
    }

    fn describe(&self, id: Id<Incompatibility>) -> String {
        if self.store[id].is_derived() {
            format_terms(self.store[id].terms(), self.root)
        } else {
            describe_external(&self.store[id], self.root)
        }
    }
}

/// Phrase an external incompatibility from its cause.
fn describe_external(incompatibility: &Incompatibility, root: &PackageRef) -> String {
    match incompatibility.cause() {
        Cause::Root => {
            // The root version is a sentinel and is never reported.
            match incompatibility.terms().iter().find(|t| !t.is_positive()) {
                Some(dependency) => format!(
                    "{} depends on {}",
                    root,
                    format_constraint(dependency)
                ),
                None => format_terms(incompatibility.terms(), root),
            }
        }
        Cause::Dependency(package) => {
            let dependent = incompatibility.get(package);
            let dependency = incompatibility
                .terms()
                .iter()
                .find(|t| t.package() != package);
            match (dependent, dependency) {
                (Some(dependent), Some(dependency)) => format!(
                    "{} depends on {}",
                    format_constraint(dependent),
                    format_constraint(dependency)
                ),
                _ => format_terms(incompatibility.terms(), root),
            }
        }
        Cause::NoAvailableVersion => match incompatibility.terms() {
            [term] => format!("no versions of {} match {}", term.package(), term.requirement()),
            terms => format_terms(terms, root),
        },
        Cause::Conflict { .. } => format_terms(incompatibility.terms(), root),
    }
}

/// Phrase the terms of a derived incompatibility.
fn format_terms(terms: &[Term], root: &PackageRef) -> String {
    match terms {
        [] => "version solving failed".to_string(),
        [term] if term.is_positive() && term.package() == root => {
            "version solving failed".to_string()
        }
        [term] if term.is_positive() => format!("{} is forbidden", format_constraint(term)),
        [term] => format!("{} is required", format_constraint(term)),
        [t1, t2] if t1.is_positive() != t2.is_positive() => {
            let (positive, negative) = if t1.is_positive() { (t1, t2) } else { (t2, t1) };
            format!(
                "{} depends on {}",
                format_constraint(positive),
                format_constraint(negative)
            )
        }
        terms => {
            let rendered: Vec<String> = terms.iter().map(format_constraint).collect();
            format!("{} are incompatible", rendered.join(", "))
        }
    }
}

/// "pkg" for an any requirement, "pkg 1.0.0 <= v < 2.0.0" otherwise.
fn format_constraint(term: &Term) -> String {
    match term.requirement() {
        Requirement::Set(VersionSet::Any) => term.package().to_string(),
        requirement => format!("{} {}", term.package(), requirement),
    }
}
