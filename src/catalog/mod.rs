// src/catalog/mod.rs

//! Package metadata sources.
//!
//! The `Catalog` trait is the capability surface the resolver plans
//! against: version listing, dependency metadata, and update discovery.
//! Three implementations are provided: `MemoryCatalog` (programmatic,
//! used by tests and embedders), `FileCatalog` (a TOML metadata document,
//! the local source), and `CompositeCatalog` (an ordered composition,
//! typically remote over local).

use crate::error::{Error, Result};
use crate::package::{PackageDependency, PackageIdentity};
use crate::version::{SemanticVersion, VersionRange};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// A source of package metadata
pub trait Catalog {
    /// All known versions of the id, ascending. Empty when the id is unknown.
    fn find_versions(&self, id: &str) -> Result<Vec<SemanticVersion>>;

    /// Dependency list of one concrete package version
    fn dependencies(
        &self,
        id: &str,
        version: &SemanticVersion,
    ) -> Result<Vec<PackageDependency>>;

    /// Updates available for an installed set
    ///
    /// Returns, for each installed identity with a newer catalog version,
    /// the identity of the newest version passing the pre-release filter.
    fn updates(
        &self,
        installed: &[PackageIdentity],
        allow_prerelease: bool,
    ) -> Result<Vec<PackageIdentity>> {
        let mut updates = Vec::new();
        for current in installed {
            let newest = self
                .find_versions(&current.id)?
                .into_iter()
                .filter(|v| allow_prerelease || !v.is_prerelease())
                .max();
            if let Some(newest) = newest {
                if newest > current.version {
                    updates.push(PackageIdentity::new(current.id.clone(), newest));
                }
            }
        }
        Ok(updates)
    }
}

/// Parse a dependency spec string: an id optionally followed by a range
///
/// Examples: "Log.Core", "Log.Core [1.0,2.0)", "Log.Core 1.0"
pub fn parse_dependency_spec(spec: &str) -> Result<PackageDependency> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(Error::Parse("empty dependency spec".to_string()));
    }
    match spec.split_once(char::is_whitespace) {
        Some((id, range)) => Ok(PackageDependency::new(
            id,
            Some(VersionRange::parse(range)?),
        )),
        None => Ok(PackageDependency::new(spec, None)),
    }
}

/// In-memory catalog, built up programmatically
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    /// Lowercased id -> (version, dependencies), ascending by version
    packages: HashMap<String, Vec<(SemanticVersion, Vec<PackageDependency>)>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package version with its dependency list
    pub fn add(
        &mut self,
        id: &str,
        version: SemanticVersion,
        dependencies: Vec<PackageDependency>,
    ) {
        let entries = self.packages.entry(id.to_ascii_lowercase()).or_default();
        entries.retain(|(v, _)| *v != version);
        entries.push((version, dependencies));
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    }
}

impl Catalog for MemoryCatalog {
    fn find_versions(&self, id: &str) -> Result<Vec<SemanticVersion>> {
        Ok(self
            .packages
            .get(&id.to_ascii_lowercase())
            .map(|entries| entries.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default())
    }

    fn dependencies(
        &self,
        id: &str,
        version: &SemanticVersion,
    ) -> Result<Vec<PackageDependency>> {
        self.packages
            .get(&id.to_ascii_lowercase())
            .and_then(|entries| entries.iter().find(|(v, _)| v == version))
            .map(|(_, deps)| deps.clone())
            .ok_or_else(|| Error::PackageNotFound {
                id: id.to_string(),
                requirement: format!("[{}]", version),
            })
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDoc {
    #[serde(default, rename = "package")]
    packages: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Catalog backed by a TOML metadata document
///
/// Format:
///
/// ```toml
/// [[package]]
/// id = "Log.Core"
/// version = "1.2.0"
/// dependencies = ["Text.Encoding [1.0,2.0)"]
/// ```
#[derive(Debug)]
pub struct FileCatalog {
    inner: MemoryCatalog,
}

impl FileCatalog {
    /// Load and validate a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let doc: CatalogDoc = toml::from_str(&text).map_err(|e| Error::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut inner = MemoryCatalog::new();
        for entry in doc.packages {
            let version = SemanticVersion::parse(&entry.version)?;
            let dependencies = entry
                .dependencies
                .iter()
                .map(|spec| parse_dependency_spec(spec))
                .collect::<Result<Vec<_>>>()?;
            inner.add(&entry.id, version, dependencies);
        }
        debug!(path = %path.display(), "loaded file catalog");
        Ok(Self { inner })
    }
}

impl Catalog for FileCatalog {
    fn find_versions(&self, id: &str) -> Result<Vec<SemanticVersion>> {
        self.inner.find_versions(id)
    }

    fn dependencies(
        &self,
        id: &str,
        version: &SemanticVersion,
    ) -> Result<Vec<PackageDependency>> {
        self.inner.dependencies(id, version)
    }
}

/// Ordered composition of catalogs
///
/// Version listings are the de-duplicated union of all sources; dependency
/// metadata comes from the first source that knows the exact version.
#[derive(Default)]
pub struct CompositeCatalog {
    sources: Vec<Box<dyn Catalog>>,
}

impl CompositeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: Box<dyn Catalog>) {
        self.sources.push(source);
    }
}

impl Catalog for CompositeCatalog {
    fn find_versions(&self, id: &str) -> Result<Vec<SemanticVersion>> {
        let mut versions = Vec::new();
        for source in &self.sources {
            for version in source.find_versions(id)? {
                if !versions.contains(&version) {
                    versions.push(version);
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn dependencies(
        &self,
        id: &str,
        version: &SemanticVersion,
    ) -> Result<Vec<PackageDependency>> {
        for source in &self.sources {
            match source.dependencies(id, version) {
                Ok(deps) => return Ok(deps),
                Err(Error::PackageNotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::PackageNotFound {
            id: id.to_string(),
            requirement: format!("[{}]", version),
        })
    }
}
