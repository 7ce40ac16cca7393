// src/resolver/mod.rs

//! Dependency resolution: turning one requested package change into an
//! ordered operation plan.
//!
//! Resolution is pure: it reads a catalog and an install-state snapshot
//! and produces a `Vec<PackageOperation>` (or fails), never touching
//! either. Plans order dependencies before dependents for installs, and
//! dependents before dependencies for uninstalls; the requested target is
//! always the last install or the first uninstall.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::package::{PackageDependency, PackageIdentity, PackageOperation};
use crate::state::InstallState;
use crate::version::{SemanticVersion, VersionRange};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Which satisfying version to pick when several qualify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preference {
    /// Fresh installs take the lowest satisfying version (minimal collateral)
    Lowest,
    /// Explicit updates take the highest satisfying version
    Highest,
}

/// Knobs controlling a resolution pass
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Admit pre-release versions when selecting from the catalog
    pub allow_prerelease: bool,
    /// Plan only the target itself, skipping its dependency graph
    pub ignore_dependencies: bool,
    /// Resolve range conflicts by re-selecting (and updating installed
    /// packages) instead of failing
    pub allow_dependency_updates: bool,
    /// On uninstall, cascade into dependencies orphaned by the removal
    pub remove_dependencies: bool,
    /// On uninstall, proceed even when installed packages depend on the target
    pub force: bool,
}

/// One recorded requirement on a package id
#[derive(Debug, Clone)]
struct Constraint {
    requirer: String,
    range: Option<VersionRange>,
}

impl Constraint {
    fn range_text(&self) -> String {
        match self.range {
            Some(ref range) => range.to_string(),
            None => "any".to_string(),
        }
    }

    fn admits(&self, version: &SemanticVersion) -> bool {
        match self.range {
            Some(ref range) => range.satisfies(version),
            None => true,
        }
    }
}

/// A package version chosen during the selection walk
#[derive(Debug, Clone)]
struct Selection {
    identity: PackageIdentity,
    dependencies: Vec<PackageDependency>,
    constraints: Vec<Constraint>,
    /// Installed version this selection replaces (paired Uninstall+Install)
    replaces: Option<SemanticVersion>,
}

/// Plans install, uninstall, and update operations
pub struct DependencyResolver<'a> {
    catalog: &'a dyn Catalog,
    state: &'a InstallState,
    options: ResolverOptions,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        state: &'a InstallState,
        options: ResolverOptions,
    ) -> Self {
        Self {
            catalog,
            state,
            options,
        }
    }

    /// Plan installing a package, optionally at an exact version
    ///
    /// A request already satisfied by the install state yields an empty
    /// plan. Installing over a different installed version of the target
    /// plans a paired Uninstall+Install.
    pub fn resolve_install(
        &self,
        id: &str,
        version: Option<&SemanticVersion>,
    ) -> Result<Vec<PackageOperation>> {
        let target = match version {
            Some(requested) => {
                if self
                    .state
                    .contains(&PackageIdentity::new(id, requested.clone()))
                {
                    return Ok(Vec::new());
                }
                if !self.catalog.find_versions(id)?.contains(requested) {
                    return Err(Error::PackageNotFound {
                        id: id.to_string(),
                        requirement: format!("[{}]", requested),
                    });
                }
                requested.clone()
            }
            None => {
                if self.state.is_installed(id) {
                    return Ok(Vec::new());
                }
                self.pick_latest(id)?
            }
        };

        let replaces = self.state.installed_version(id).cloned();
        self.plan_install(id, target, replaces, Preference::Lowest)
    }

    /// Plan updating an installed package to a newer (or exact) version
    ///
    /// Dependencies of the new version prefer the highest satisfying
    /// catalog version, and conflicting installed dependencies are updated
    /// rather than reported.
    pub fn resolve_update(
        &self,
        id: &str,
        version: Option<&SemanticVersion>,
    ) -> Result<Vec<PackageOperation>> {
        let installed = self.state.installed_version(id).cloned().ok_or_else(|| {
            Error::PackageNotFound {
                id: id.to_string(),
                requirement: "installed in project".to_string(),
            }
        })?;

        let target = match version {
            Some(requested) => {
                if !self.catalog.find_versions(id)?.contains(requested) {
                    return Err(Error::PackageNotFound {
                        id: id.to_string(),
                        requirement: format!("[{}]", requested),
                    });
                }
                requested.clone()
            }
            None => self.pick_latest(id)?,
        };

        if target == installed {
            return Ok(Vec::new());
        }

        self.plan_install(id, target, Some(installed), Preference::Highest)
    }

    /// Plan uninstalling an installed package
    ///
    /// Installed dependents block the removal unless `force` is set. The
    /// target's Uninstall comes first; with `remove_dependencies`, orphaned
    /// non-top-level dependencies follow their dependents into the plan.
    pub fn resolve_uninstall(&self, id: &str) -> Result<Vec<PackageOperation>> {
        let installed = self.state.installed_version(id).cloned().ok_or_else(|| {
            Error::PackageNotFound {
                id: id.to_string(),
                requirement: "installed in project".to_string(),
            }
        })?;
        let target = PackageIdentity::new(id, installed);

        let dependents = self.installed_dependents(&target.id);
        if !dependents.is_empty() && !self.options.force {
            return Err(Error::PackageInUse {
                id: target.id.clone(),
                dependents,
            });
        }

        let mut ops = vec![PackageOperation::uninstall(target.clone())];
        if self.options.remove_dependencies {
            let mut removed = HashSet::new();
            removed.insert(target.key());
            self.cascade_removals(&target, &mut removed, &mut ops)?;
        }
        Ok(ops)
    }

    /// Highest catalog version of an id passing the pre-release filter
    fn pick_latest(&self, id: &str) -> Result<SemanticVersion> {
        self.candidate_versions(id)?
            .into_iter()
            .max()
            .ok_or_else(|| Error::PackageNotFound {
                id: id.to_string(),
                requirement: "any version".to_string(),
            })
    }

    fn candidate_versions(&self, id: &str) -> Result<Vec<SemanticVersion>> {
        Ok(self
            .catalog
            .find_versions(id)?
            .into_iter()
            .filter(|v| self.options.allow_prerelease || !v.is_prerelease())
            .collect())
    }

    /// Run the selection walk for the target, then emit the ordered plan
    fn plan_install(
        &self,
        id: &str,
        version: SemanticVersion,
        replaces: Option<SemanticVersion>,
        preference: Preference,
    ) -> Result<Vec<PackageOperation>> {
        let mut walker = Walker {
            resolver: self,
            preference,
            selections: HashMap::new(),
            path: Vec::new(),
        };
        let root = Constraint {
            requirer: "request".to_string(),
            range: None,
        };
        walker.walk(id, version, vec![root], replaces)?;

        let mut ops = Vec::new();
        let mut visited = HashSet::new();
        emit(
            &walker.selections,
            &id.to_ascii_lowercase(),
            &mut visited,
            &mut ops,
        );
        Ok(ops)
    }

    /// Installed packages (other than the id itself) depending on the id
    fn installed_dependents(&self, id: &str) -> Vec<String> {
        let mut dependents: Vec<String> = self
            .state
            .identities()
            .filter(|identity| !identity.id.eq_ignore_ascii_case(id))
            .filter(|identity| {
                self.installed_dependencies(identity)
                    .iter()
                    .any(|dep| dep.id.eq_ignore_ascii_case(id))
            })
            .map(|identity| identity.id.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Dependency list of an installed package, tolerating catalog misses
    ///
    /// The install state may hold packages the catalog no longer lists;
    /// those simply contribute no edges.
    fn installed_dependencies(&self, identity: &PackageIdentity) -> Vec<PackageDependency> {
        match self.catalog.dependencies(&identity.id, &identity.version) {
            Ok(deps) => deps,
            Err(Error::PackageNotFound { .. }) => Vec::new(),
            Err(e) => {
                debug!(package = %identity, error = %e, "dependency lookup failed");
                Vec::new()
            }
        }
    }

    /// Depth-first orphan cascade for uninstall plans
    ///
    /// A dependency joins the plan only when it is installed, not
    /// top-level, and no surviving installed package still needs it.
    fn cascade_removals(
        &self,
        removed_pkg: &PackageIdentity,
        removed: &mut HashSet<String>,
        ops: &mut Vec<PackageOperation>,
    ) -> Result<()> {
        for dep in self.installed_dependencies(removed_pkg) {
            let key = dep.key();
            if removed.contains(&key) {
                continue;
            }
            let Some(version) = self.state.installed_version(&dep.id) else {
                continue;
            };
            if self.state.is_top_level(&dep.id) {
                continue;
            }

            let still_needed = self
                .state
                .identities()
                .filter(|identity| !removed.contains(&identity.key()))
                .any(|identity| {
                    self.installed_dependencies(identity)
                        .iter()
                        .any(|d| d.id.eq_ignore_ascii_case(&dep.id))
                });
            if still_needed {
                continue;
            }

            let identity = PackageIdentity::new(dep.id.clone(), version.clone());
            removed.insert(key);
            ops.push(PackageOperation::uninstall(identity.clone()));
            self.cascade_removals(&identity, removed, ops)?;
        }
        Ok(())
    }
}

/// The selection walk: picks a concrete version for every package the
/// plan will install, accumulating constraints per id
struct Walker<'a, 'b> {
    resolver: &'b DependencyResolver<'a>,
    preference: Preference,
    /// Lowercased id -> selection
    selections: HashMap<String, Selection>,
    /// Ids on the current DFS chain, in order
    path: Vec<String>,
}

impl Walker<'_, '_> {
    fn walk(
        &mut self,
        id: &str,
        version: SemanticVersion,
        constraints: Vec<Constraint>,
        replaces: Option<SemanticVersion>,
    ) -> Result<()> {
        let dependencies = if self.resolver.options.ignore_dependencies {
            Vec::new()
        } else {
            self.resolver.catalog.dependencies(id, &version)?
        };

        debug!(package = %id, version = %version, "selected");
        self.selections.insert(
            id.to_ascii_lowercase(),
            Selection {
                identity: PackageIdentity::new(id, version),
                dependencies: dependencies.clone(),
                constraints,
                replaces,
            },
        );

        self.path.push(id.to_string());
        for dep in &dependencies {
            self.resolve_dependency(dep, id)?;
        }
        self.path.pop();
        Ok(())
    }

    fn resolve_dependency(&mut self, dep: &PackageDependency, requirer: &str) -> Result<()> {
        let key = dep.key();
        let constraint = Constraint {
            requirer: requirer.to_string(),
            range: dep.range.clone(),
        };

        // An id still in progress on the current chain cannot be ordered:
        // no instance can precede itself
        if let Some(pos) = self
            .path
            .iter()
            .position(|p| p.eq_ignore_ascii_case(&dep.id))
        {
            let mut chain: Vec<&str> = self.path[pos..].iter().map(String::as_str).collect();
            chain.push(&dep.id);
            return Err(Error::CycleDetected(chain.join(" -> ")));
        }

        if let Some(selection) = self.selections.get_mut(&key) {
            if dep.admits(&selection.identity.version) {
                selection.constraints.push(constraint);
                return Ok(());
            }
            return self.reselect(dep, constraint);
        }

        // Already satisfied by the project: no operation, no descent
        if self.resolver.state.satisfies(dep) {
            return Ok(());
        }

        if let Some(installed) = self.resolver.state.installed_version(&dep.id).cloned() {
            // Installed, but outside the required range
            if !self.resolver.options.allow_dependency_updates {
                let second_range = constraint.range_text();
                return Err(Error::DependencyConflict {
                    id: dep.id.clone(),
                    first_requirer: "currently installed".to_string(),
                    first_range: format!("[{}]", installed),
                    second_requirer: constraint.requirer,
                    second_range,
                });
            }
            let candidates: Vec<SemanticVersion> = self
                .resolver
                .candidate_versions(&dep.id)?
                .into_iter()
                .filter(|v| constraint.admits(v))
                .collect();
            let chosen = self.choose(candidates).ok_or_else(|| Error::PackageNotFound {
                id: dep.id.clone(),
                requirement: dep.range_display(),
            })?;
            return self.walk(&dep.id, chosen, vec![constraint], Some(installed));
        }

        let candidates: Vec<SemanticVersion> = self
            .resolver
            .candidate_versions(&dep.id)?
            .into_iter()
            .filter(|v| constraint.admits(v))
            .collect();
        let chosen = self.choose(candidates).ok_or_else(|| Error::PackageNotFound {
            id: dep.id.clone(),
            requirement: dep.range_display(),
        })?;
        self.walk(&dep.id, chosen, vec![constraint], None)
    }

    /// Re-select an already-planned package whose version fails a new range
    ///
    /// Succeeds only when some catalog version satisfies every accumulated
    /// constraint; otherwise the two requirers are reported as a conflict.
    fn reselect(&mut self, dep: &PackageDependency, constraint: Constraint) -> Result<()> {
        let key = dep.key();
        let selection = self.selections.get(&key).expect("selection exists");
        let first = selection.constraints[0].clone();
        let first_range = first.range_text();
        let second_range = constraint.range_text();

        if !self.resolver.options.allow_dependency_updates {
            return Err(Error::DependencyConflict {
                id: dep.id.clone(),
                first_requirer: first.requirer,
                first_range,
                second_requirer: constraint.requirer,
                second_range,
            });
        }

        let mut constraints = selection.constraints.clone();
        constraints.push(constraint.clone());
        let replaces = selection.replaces.clone();

        let candidates: Vec<SemanticVersion> = self
            .resolver
            .candidate_versions(&dep.id)?
            .into_iter()
            .filter(|v| constraints.iter().all(|c| c.admits(v)))
            .collect();
        let Some(chosen) = self.choose(candidates) else {
            return Err(Error::DependencyConflict {
                id: dep.id.clone(),
                first_requirer: first.requirer,
                first_range,
                second_requirer: constraint.requirer,
                second_range,
            });
        };

        debug!(package = %dep.id, version = %chosen, "re-selecting to satisfy all requirers");
        self.selections.remove(&key);
        self.walk(&dep.id, chosen, constraints, replaces)
    }

    fn choose(&self, candidates: Vec<SemanticVersion>) -> Option<SemanticVersion> {
        match self.preference {
            Preference::Lowest => candidates.into_iter().min(),
            Preference::Highest => candidates.into_iter().max(),
        }
    }
}

/// Post-order emission: every selection's dependencies are emitted before
/// the selection itself, so the walk's target lands last
fn emit(
    selections: &HashMap<String, Selection>,
    key: &str,
    visited: &mut HashSet<String>,
    ops: &mut Vec<PackageOperation>,
) {
    if !visited.insert(key.to_string()) {
        return;
    }
    let Some(selection) = selections.get(key) else {
        return;
    };

    for dep in &selection.dependencies {
        let dep_key = dep.key();
        if selections.contains_key(&dep_key) {
            emit(selections, &dep_key, visited, ops);
        }
    }

    if let Some(ref old) = selection.replaces {
        ops.push(PackageOperation::uninstall(PackageIdentity::new(
            selection.identity.id.clone(),
            old.clone(),
        )));
    }
    ops.push(PackageOperation::install(selection.identity.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::package::OperationKind;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn dep(id: &str, range: &str) -> PackageDependency {
        PackageDependency::new(id, Some(VersionRange::parse(range).unwrap()))
    }

    fn dep_any(id: &str) -> PackageDependency {
        PackageDependency::new(id, None)
    }

    fn index_of(ops: &[PackageOperation], id: &str) -> usize {
        ops.iter()
            .position(|op| op.package.id.eq_ignore_ascii_case(id))
            .unwrap_or_else(|| panic!("{} not in plan", id))
    }

    #[test]
    fn test_install_single_package() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, OperationKind::Install);
        assert_eq!(plan[0].package, PackageIdentity::new("A", v("1.0")));
    }

    #[test]
    fn test_install_chain_orders_dependencies_first() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("B")]);
        catalog.add("B", v("1.0"), vec![dep_any("C")]);
        catalog.add("C", v("1.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(index_of(&plan, "C") < index_of(&plan, "B"));
        assert!(index_of(&plan, "B") < index_of(&plan, "A"));
        assert_eq!(plan.last().unwrap().package.id, "A");
    }

    #[test]
    fn test_install_diamond_emits_shared_dependency_once() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("B"), dep_any("C")]);
        catalog.add("B", v("1.0"), vec![dep_any("D")]);
        catalog.add("C", v("1.0"), vec![dep_any("D")]);
        catalog.add("D", v("1.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(index_of(&plan, "D") < index_of(&plan, "B"));
        assert!(index_of(&plan, "D") < index_of(&plan, "C"));
        assert_eq!(plan.last().unwrap().package.id, "A");
    }

    #[test]
    fn test_install_already_satisfied_is_empty() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        assert!(resolver.resolve_install("A", None).unwrap().is_empty());
        assert!(resolver.resolve_install("a", Some(&v("1.0"))).unwrap().is_empty());
    }

    #[test]
    fn test_install_skips_satisfied_dependency() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep("B", "[1.0,2.0)")]);
        catalog.add("B", v("1.5"), vec![dep_any("C")]);
        catalog.add("C", v("1.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("B", v("1.5")), false);
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        // B satisfies its range: no operation for B, no descent into C
        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].package.id, "A");
    }

    #[test]
    fn test_install_prefers_lowest_satisfying_dependency() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep("B", "[1.0,2.0)")]);
        catalog.add("B", v("1.0"), vec![]);
        catalog.add("B", v("1.5"), vec![]);
        catalog.add("B", v("1.9"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan[index_of(&plan, "B")].package.version, v("1.0"));
    }

    #[test]
    fn test_install_target_takes_highest_version() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);
        catalog.add("A", v("2.0"), vec![]);
        catalog.add("A", v("3.0-beta"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        // Pre-release filtered out by default
        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan[0].package.version, v("2.0"));

        let resolver = DependencyResolver::new(
            &catalog,
            &state,
            ResolverOptions {
                allow_prerelease: true,
                ..Default::default()
            },
        );
        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan[0].package.version, v("3.0-beta"));
    }

    #[test]
    fn test_install_exact_version() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);
        catalog.add("A", v("2.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_install("A", Some(&v("1.0"))).unwrap();
        assert_eq!(plan[0].package.version, v("1.0"));

        assert!(matches!(
            resolver.resolve_install("A", Some(&v("9.9"))),
            Err(Error::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_install_over_different_version_pairs_uninstall() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);
        catalog.add("A", v("2.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_install("A", Some(&v("2.0"))).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].kind, OperationKind::Uninstall);
        assert_eq!(plan[0].package.version, v("1.0"));
        assert_eq!(plan[1].kind, OperationKind::Install);
        assert_eq!(plan[1].package.version, v("2.0"));
    }

    #[test]
    fn test_install_ignore_dependencies() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("B")]);
        catalog.add("B", v("1.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(
            &catalog,
            &state,
            ResolverOptions {
                ignore_dependencies: true,
                ..Default::default()
            },
        );

        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].package.id, "A");
    }

    #[test]
    fn test_install_missing_target() {
        let catalog = MemoryCatalog::new();
        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        assert!(matches!(
            resolver.resolve_install("ghost", None),
            Err(Error::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_install_missing_dependency_version() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep("B", "[5.0,)")]);
        catalog.add("B", v("1.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        match resolver.resolve_install("A", None) {
            Err(Error::PackageNotFound { id, requirement }) => {
                assert_eq!(id, "B");
                assert_eq!(requirement, "[5.0,)");
            }
            other => panic!("expected PackageNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_detected() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("B")]);
        catalog.add("B", v("1.0"), vec![dep_any("A")]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        match resolver.resolve_install("A", None) {
            Err(Error::CycleDetected(chain)) => {
                assert_eq!(chain, "A -> B -> A");
            }
            other => panic!("expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn test_conflict_names_both_requirers() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("T", v("1.0"), vec![dep_any("X"), dep_any("Z")]);
        catalog.add("X", v("1.0"), vec![dep("Y", "[1.0,2.0)")]);
        catalog.add("Z", v("1.0"), vec![dep("Y", "[2.0,3.0)")]);
        catalog.add("Y", v("1.0"), vec![]);
        catalog.add("Y", v("2.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        match resolver.resolve_install("T", None) {
            Err(Error::DependencyConflict {
                id,
                first_requirer,
                second_requirer,
                ..
            }) => {
                assert_eq!(id, "Y");
                assert_eq!(first_requirer, "X");
                assert_eq!(second_requirer, "Z");
            }
            other => panic!("expected DependencyConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_conflict_reselects_when_updates_allowed() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("T", v("1.0"), vec![dep_any("X"), dep_any("Z")]);
        catalog.add("X", v("1.0"), vec![dep("Y", "[1.0,2.5)")]);
        catalog.add("Z", v("1.0"), vec![dep("Y", "[2.0,3.0)")]);
        catalog.add("Y", v("1.0"), vec![]);
        catalog.add("Y", v("2.0"), vec![]);
        catalog.add("Y", v("2.4"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(
            &catalog,
            &state,
            ResolverOptions {
                allow_dependency_updates: true,
                ..Default::default()
            },
        );

        let plan = resolver.resolve_install("T", None).unwrap();
        // X selected Y 1.0; Z's range forces a re-selection into the
        // intersection, lowest first
        assert_eq!(plan[index_of(&plan, "Y")].package.version, v("2.0"));
        assert!(index_of(&plan, "Y") < index_of(&plan, "X"));
        assert!(index_of(&plan, "Y") < index_of(&plan, "Z"));
    }

    #[test]
    fn test_conflict_with_installed_dependency() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep("B", "[2.0,3.0)")]);
        catalog.add("B", v("1.0"), vec![]);
        catalog.add("B", v("2.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("B", v("1.0")), false);

        // Without dependency updates: conflict against the installed version
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());
        assert!(matches!(
            resolver.resolve_install("A", None),
            Err(Error::DependencyConflict { .. })
        ));

        // With dependency updates: paired Uninstall+Install of B
        let resolver = DependencyResolver::new(
            &catalog,
            &state,
            ResolverOptions {
                allow_dependency_updates: true,
                ..Default::default()
            },
        );
        let plan = resolver.resolve_install("A", None).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].kind, OperationKind::Uninstall);
        assert_eq!(plan[0].package, PackageIdentity::new("B", v("1.0")));
        assert_eq!(plan[1].kind, OperationKind::Install);
        assert_eq!(plan[1].package, PackageIdentity::new("B", v("2.0")));
        assert_eq!(plan[2].package.id, "A");
    }

    #[test]
    fn test_update_prefers_highest_dependency_versions() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);
        catalog.add("A", v("2.0"), vec![dep("B", "[1.0,2.0)")]);
        catalog.add("B", v("1.0"), vec![]);
        catalog.add("B", v("1.9"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_update("A", None).unwrap();
        assert_eq!(plan[index_of(&plan, "B")].package.version, v("1.9"));

        // Target update is a paired Uninstall+Install, target last
        let last = plan.last().unwrap();
        assert_eq!(last.package, PackageIdentity::new("A", v("2.0")));
        assert_eq!(
            plan[plan.len() - 2],
            PackageOperation::uninstall(PackageIdentity::new("A", v("1.0")))
        );
    }

    #[test]
    fn test_update_already_current_is_empty() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        assert!(resolver.resolve_update("A", None).unwrap().is_empty());
    }

    #[test]
    fn test_update_requires_installed() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        assert!(matches!(
            resolver.resolve_update("A", None),
            Err(Error::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_uninstall_only_target_by_default() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("B")]);
        catalog.add("B", v("1.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        state.insert(PackageIdentity::new("B", v("1.0")), false);
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        let plan = resolver.resolve_uninstall("A").unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, OperationKind::Uninstall);
        assert_eq!(plan[0].package.id, "A");
    }

    #[test]
    fn test_uninstall_blocked_by_dependent() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("B")]);
        catalog.add("B", v("1.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        state.insert(PackageIdentity::new("B", v("1.0")), false);
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        match resolver.resolve_uninstall("B") {
            Err(Error::PackageInUse { id, dependents }) => {
                assert_eq!(id, "B");
                assert_eq!(dependents, vec!["A".to_string()]);
            }
            other => panic!("expected PackageInUse, got {:?}", other),
        }

        // Force overrides the dependent check
        let resolver = DependencyResolver::new(
            &catalog,
            &state,
            ResolverOptions {
                force: true,
                ..Default::default()
            },
        );
        assert_eq!(resolver.resolve_uninstall("B").unwrap().len(), 1);
    }

    #[test]
    fn test_uninstall_cascade_orders_dependents_first() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("B")]);
        catalog.add("B", v("1.0"), vec![dep_any("C")]);
        catalog.add("C", v("1.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        state.insert(PackageIdentity::new("B", v("1.0")), false);
        state.insert(PackageIdentity::new("C", v("1.0")), false);
        let resolver = DependencyResolver::new(
            &catalog,
            &state,
            ResolverOptions {
                remove_dependencies: true,
                ..Default::default()
            },
        );

        let plan = resolver.resolve_uninstall("A").unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|op| op.kind == OperationKind::Uninstall));
        assert!(index_of(&plan, "A") < index_of(&plan, "B"));
        assert!(index_of(&plan, "B") < index_of(&plan, "C"));
    }

    #[test]
    fn test_uninstall_cascade_keeps_needed_and_top_level() {
        let mut catalog = MemoryCatalog::new();
        catalog.add("A", v("1.0"), vec![dep_any("Shared"), dep_any("Tool")]);
        catalog.add("Other", v("1.0"), vec![dep_any("Shared")]);
        catalog.add("Shared", v("1.0"), vec![]);
        catalog.add("Tool", v("1.0"), vec![]);

        let mut state = InstallState::new();
        state.insert(PackageIdentity::new("A", v("1.0")), true);
        state.insert(PackageIdentity::new("Other", v("1.0")), true);
        state.insert(PackageIdentity::new("Shared", v("1.0")), false);
        // Tool was also requested explicitly
        state.insert(PackageIdentity::new("Tool", v("1.0")), true);
        let resolver = DependencyResolver::new(
            &catalog,
            &state,
            ResolverOptions {
                remove_dependencies: true,
                ..Default::default()
            },
        );

        let plan = resolver.resolve_uninstall("A").unwrap();
        // Shared survives (Other needs it), Tool survives (top-level)
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].package.id, "A");
    }

    #[test]
    fn test_uninstall_requires_installed() {
        let catalog = MemoryCatalog::new();
        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());

        assert!(matches!(
            resolver.resolve_uninstall("ghost"),
            Err(Error::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_install_plan_ordering_invariant() {
        // Wider graph: every dependency edge must point backwards in the plan
        let mut catalog = MemoryCatalog::new();
        catalog.add("App", v("1.0"), vec![dep_any("Web"), dep_any("Data")]);
        catalog.add("Web", v("1.0"), vec![dep_any("Http"), dep_any("Json")]);
        catalog.add("Data", v("1.0"), vec![dep_any("Json")]);
        catalog.add("Http", v("1.0"), vec![dep_any("Sockets")]);
        catalog.add("Json", v("1.0"), vec![]);
        catalog.add("Sockets", v("1.0"), vec![]);

        let state = InstallState::new();
        let resolver = DependencyResolver::new(&catalog, &state, ResolverOptions::default());
        let plan = resolver.resolve_install("App", None).unwrap();
        assert_eq!(plan.len(), 6);

        for op in &plan {
            for d in catalog.dependencies(&op.package.id, &op.package.version).unwrap() {
                assert!(
                    index_of(&plan, &d.id) < index_of(&plan, &op.package.id),
                    "{} must precede {}",
                    d.id,
                    op.package.id
                );
            }
        }
        assert_eq!(plan.last().unwrap().package.id, "App");
    }
}
