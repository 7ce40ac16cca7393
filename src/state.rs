// src/state.rs

//! Install-state snapshots.
//!
//! An `InstallState` is the immutable view of a project's installed
//! packages that the resolver plans against. It is produced from a
//! `ProjectManifest` and never mutated by resolution; applying the
//! resulting plan through the executor is what changes the manifest.

use crate::package::{PackageDependency, PackageIdentity};
use crate::version::SemanticVersion;
use std::collections::HashMap;

/// Snapshot of the packages installed in one project
#[derive(Debug, Clone, Default)]
pub struct InstallState {
    /// Lowercased id -> installed record
    installed: HashMap<String, InstalledPackage>,
}

/// One installed package
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub identity: PackageIdentity,

    /// Explicitly requested, as opposed to pulled in as a dependency
    pub top_level: bool,
}

impl InstallState {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a package in the snapshot
    pub fn insert(&mut self, identity: PackageIdentity, top_level: bool) {
        self.installed
            .insert(identity.key(), InstalledPackage { identity, top_level });
    }

    /// Check if any version of the id is installed
    pub fn is_installed(&self, id: &str) -> bool {
        self.installed.contains_key(&id.to_ascii_lowercase())
    }

    /// Check if this exact identity is installed
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.installed
            .get(&identity.key())
            .is_some_and(|p| p.identity.version == identity.version)
    }

    /// Installed version of the id, if any
    pub fn installed_version(&self, id: &str) -> Option<&SemanticVersion> {
        self.installed
            .get(&id.to_ascii_lowercase())
            .map(|p| &p.identity.version)
    }

    /// Whether the id was explicitly requested by the user
    pub fn is_top_level(&self, id: &str) -> bool {
        self.installed
            .get(&id.to_ascii_lowercase())
            .is_some_and(|p| p.top_level)
    }

    /// True if the installed version of the dependency's id satisfies it
    pub fn satisfies(&self, dependency: &PackageDependency) -> bool {
        self.installed_version(&dependency.id)
            .is_some_and(|v| dependency.admits(v))
    }

    /// All installed identities
    pub fn identities(&self) -> impl Iterator<Item = &PackageIdentity> {
        self.installed.values().map(|p| &p.identity)
    }

    /// Number of installed packages
    pub fn package_count(&self) -> usize {
        self.installed.len()
    }
}
