// SPDX-License-Identifier: MPL-2.0

//! Traits through which the solver discovers packages, plus a ready-made
//! in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ProviderError;
use crate::package::PackageRef;
use crate::requirement::Requirement;
use crate::version::SemanticVersion;

/// Result of a container fetch.
pub type ContainerResult = Result<Arc<dyn Container>, ProviderError>;

/// Completion callback of a container fetch, invoked exactly once.
pub type ContainerCompletion = Box<dyn FnOnce(ContainerResult) + Send>;

/// Source of containers, the only collaborator the solver consumes.
///
/// `get_container` is asynchronous in spirit: implementations may invoke
/// the completion on the calling thread or from any other thread. The
/// solver serializes all uses of the result behind its container cache, so
/// completion order never influences the outcome of a solve.
pub trait ContainerProvider: Send + Sync {
    /// Fetch the container describing a package. `skip_update` asks the
    /// provider not to refresh its underlying data source first; the
    /// solver always passes true.
    fn get_container(
        &self,
        package: &PackageRef,
        skip_update: bool,
        completion: ContainerCompletion,
    );
}

/// Everything the solver may ask about one package.
pub trait Container: Send + Sync {
    /// The package this container describes.
    fn identifier(&self) -> &PackageRef;

    /// Known versions matching the filter, in descending order.
    fn versions(
        &self,
        filter: &dyn Fn(&SemanticVersion) -> bool,
    ) -> Box<dyn Iterator<Item = SemanticVersion> + '_>;

    /// Direct dependencies of the package at the given version.
    fn dependencies(
        &self,
        at: &SemanticVersion,
    ) -> Result<Vec<(PackageRef, Requirement)>, ProviderError>;

    /// Direct dependencies of the (unversioned) root package.
    fn unversioned_dependencies(&self)
        -> Result<Vec<(PackageRef, Requirement)>, ProviderError>;
}

/// A [ContainerProvider] with all package information in memory.
///
/// Mostly useful for tests and for small closed worlds. Unknown packages
/// resolve to a container without any version, so a requirement on them
/// surfaces as "no available version" rather than a provider failure.
#[derive(Debug, Clone, Default)]
pub struct OfflineProvider {
    packages: BTreeMap<PackageRef, OfflinePackage>,
}

#[derive(Debug, Clone, Default)]
struct OfflinePackage {
    versions: BTreeMap<SemanticVersion, Vec<(PackageRef, Requirement)>>,
    unversioned_dependencies: Vec<(PackageRef, Requirement)>,
}

impl OfflineProvider {
    /// Creates an empty provider with no package information.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the dependencies of a package at one version. Calling this
    /// again for the same package and version replaces the dependencies.
    pub fn add_dependencies(
        &mut self,
        package: impl Into<PackageRef>,
        version: impl Into<SemanticVersion>,
        dependencies: impl IntoIterator<Item = (PackageRef, Requirement)>,
    ) {
        self.packages
            .entry(package.into())
            .or_default()
            .versions
            .insert(version.into(), dependencies.into_iter().collect());
    }

    /// Registers a package without any version.
    pub fn add_package(&mut self, package: impl Into<PackageRef>) {
        self.packages.entry(package.into()).or_default();
    }

    /// Registers the unversioned dependencies of the root package.
    pub fn add_root(
        &mut self,
        package: impl Into<PackageRef>,
        dependencies: impl IntoIterator<Item = (PackageRef, Requirement)>,
    ) {
        self.packages
            .entry(package.into())
            .or_default()
            .unversioned_dependencies = dependencies.into_iter().collect();
    }
}

impl ContainerProvider for OfflineProvider {
    fn get_container(
        &self,
        package: &PackageRef,
        _skip_update: bool,
        completion: ContainerCompletion,
    ) {
        let data = self.packages.get(package).cloned().unwrap_or_default();
        completion(Ok(Arc::new(OfflineContainer {
            identifier: package.clone(),
            data,
        })));
    }
}

struct OfflineContainer {
    identifier: PackageRef,
    data: OfflinePackage,
}

impl Container for OfflineContainer {
    fn identifier(&self) -> &PackageRef {
        &self.identifier
    }

    fn versions(
        &self,
        filter: &dyn Fn(&SemanticVersion) -> bool,
    ) -> Box<dyn Iterator<Item = SemanticVersion> + '_> {
        let matching: Vec<SemanticVersion> = self
            .data
            .versions
            .keys()
            .rev()
            .filter(|v| filter(v))
            .copied()
            .collect();
        Box::new(matching.into_iter())
    }

    fn dependencies(
        &self,
        at: &SemanticVersion,
    ) -> Result<Vec<(PackageRef, Requirement)>, ProviderError> {
        Ok(self.data.versions.get(at).cloned().unwrap_or_default())
    }

    fn unversioned_dependencies(
        &self,
    ) -> Result<Vec<(PackageRef, Requirement)>, ProviderError> {
        Ok(self.data.unversioned_dependencies.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_come_back_descending() {
        let mut provider = OfflineProvider::new();
        provider.add_dependencies("a", (1, 0, 0), []);
        provider.add_dependencies("a", (1, 2, 0), []);
        provider.add_dependencies("a", (1, 1, 0), []);

        let package = PackageRef::new("a");
        let (sender, receiver) = std::sync::mpsc::channel();
        provider.get_container(
            &package,
            true,
            Box::new(move |result| sender.send(result).unwrap()),
        );
        let container = receiver.recv().unwrap().unwrap();
        let versions: Vec<SemanticVersion> = container.versions(&|_| true).collect();
        assert_eq!(
            versions,
            [
                SemanticVersion::new(1, 2, 0),
                SemanticVersion::new(1, 1, 0),
                SemanticVersion::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn unknown_packages_have_no_versions() {
        let provider = OfflineProvider::new();
        let package = PackageRef::new("ghost");
        let (sender, receiver) = std::sync::mpsc::channel();
        provider.get_container(
            &package,
            true,
            Box::new(move |result| sender.send(result).unwrap()),
        );
        let container = receiver.recv().unwrap().unwrap();
        assert_eq!(container.versions(&|_| true).count(), 0);
    }
}
