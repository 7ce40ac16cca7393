// tests/common/mod.rs

//! Shared test fixtures for integration tests.

use caravel::{
    manifest_path, MemoryCatalog, PackageDependency, PackageIdentity, ProjectManifest,
    SemanticVersion, VersionRange,
};
use std::path::Path;

pub fn v(s: &str) -> SemanticVersion {
    SemanticVersion::parse(s).unwrap()
}

pub fn pkg(id: &str, version: &str) -> PackageIdentity {
    PackageIdentity::new(id, v(version))
}

pub fn dep(id: &str, range: &str) -> PackageDependency {
    PackageDependency::new(id, Some(VersionRange::parse(range).unwrap()))
}

pub fn dep_any(id: &str) -> PackageDependency {
    PackageDependency::new(id, None)
}

/// Catalog used across the workflow tests:
///
/// - App 1.0 depends on Lib [1.0,2.0)
/// - App 2.0 depends on Lib [1.5,2.0)
/// - Lib 1.0 and 1.5 depend on Text (any version)
/// - Text 1.0 has no dependencies
pub fn sample_catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog.add("App", v("1.0"), vec![dep("Lib", "[1.0,2.0)")]);
    catalog.add("App", v("2.0"), vec![dep("Lib", "[1.5,2.0)")]);
    catalog.add("Lib", v("1.0"), vec![dep_any("Text")]);
    catalog.add("Lib", v("1.5"), vec![dep_any("Text")]);
    catalog.add("Text", v("1.0"), vec![]);
    catalog
}

/// Create an empty project manifest on disk under `dir`
pub fn empty_project(dir: &Path) -> ProjectManifest {
    let manifest = ProjectManifest::load(&manifest_path(dir)).unwrap();
    manifest.save().unwrap();
    manifest
}
