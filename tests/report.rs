// SPDX-License-Identifier: MPL-2.0

//! Pin the exact wording of derivation reports.

use std::sync::Arc;

use pact::{OfflineProvider, PackageRef, Requirement, Solver, SolverError};

fn pkg(name: &str) -> PackageRef {
    PackageRef::new(name)
}

fn report_of(provider: OfflineProvider) -> String {
    let solver = Solver::new(Arc::new(provider));
    match solver.solve(pkg("root")) {
        Err(SolverError::Unresolvable { report, .. }) => report,
        other => panic!("expected unresolvable, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn direct_conflict_report() {
    let mut provider = OfflineProvider::new();
    provider.add_root(
        "root",
        [
            (pkg("a"), Requirement::caret((1, 0, 0))),
            (pkg("b"), Requirement::caret((1, 0, 0))),
        ],
    );
    provider.add_dependencies("a", (1, 0, 0), [(pkg("b"), Requirement::caret((2, 0, 0)))]);
    provider.add_dependencies("b", (1, 0, 0), []);

    assert_eq!(
        report_of(provider),
        "Because a 1.0.0 <= v < 2.0.0 depends on b 2.0.0 <= v < 3.0.0 \
         and root depends on a 1.0.0 <= v < 2.0.0, \
         b 2.0.0 <= v < 3.0.0 is required.\n\
         And because root depends on b 1.0.0 <= v < 2.0.0, \
         version solving failed. (1)"
    );
}

#[test]
fn missing_version_report() {
    let mut provider = OfflineProvider::new();
    provider.add_root("root", [(pkg("a"), Requirement::caret((1, 0, 0)))]);
    provider.add_package("a");

    assert_eq!(
        report_of(provider),
        "Because no versions of a match 1.0.0 <= v < 2.0.0 \
         and root depends on a 1.0.0 <= v < 2.0.0, \
         version solving failed. (1)"
    );
}

/// A transitive chain collapses the intermediate derived conclusion into
/// the final line instead of printing it separately.
#[test]
fn transitive_chain_collapses_into_two_lines() {
    let mut provider = OfflineProvider::new();
    provider.add_root(
        "root",
        [
            (pkg("a"), Requirement::caret((1, 0, 0))),
            (pkg("c"), Requirement::caret((1, 0, 0))),
        ],
    );
    provider.add_dependencies("a", (1, 0, 0), [(pkg("b"), Requirement::caret((1, 0, 0)))]);
    provider.add_dependencies("b", (1, 0, 0), [(pkg("c"), Requirement::caret((2, 0, 0)))]);
    provider.add_dependencies("c", (1, 0, 0), []);

    let report = report_of(provider);
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 2, "report: {report}");
    assert_eq!(
        lines[0],
        "Because a 1.0.0 <= v < 2.0.0 depends on b 1.0.0 <= v < 2.0.0 \
         and b 1.0.0 <= v < 2.0.0 depends on c 2.0.0 <= v < 3.0.0, \
         a 1.0.0 <= v < 2.0.0 depends on c 2.0.0 <= v < 3.0.0."
    );
    assert_eq!(
        lines[1],
        "And because root depends on a 1.0.0 <= v < 2.0.0 \
         and root depends on c 1.0.0 <= v < 2.0.0, \
         version solving failed. (1)"
    );
}
