// src/store/mod.rs

//! Shared package store and its cross-project reference registry.
//!
//! A solution-level store holds one physical copy of each package. The
//! registry records which project manifests reference the store, so a
//! package directory is only deleted once no registered project still
//! lists it. Registry reads prune entries whose manifest has vanished
//! (lazy garbage collection), and a corrupt registry file degrades to
//! "no entries" — reference-tracking metadata must never block an
//! install or uninstall.

use crate::error::{Error, Result};
use crate::executor::OperationHandler;
use crate::manifest::ProjectManifest;
use crate::package::PackageIdentity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the project registry inside the store root
pub const REGISTRY_FILE: &str = "projects.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDoc {
    #[serde(default)]
    projects: Vec<String>,
}

/// Persisted set of project manifest paths referencing one shared store
///
/// Paths are stored relative to the store root and de-duplicated.
/// An empty set is represented by the absence of the backing file.
#[derive(Debug, Clone)]
pub struct SharedStoreRegistry {
    root: PathBuf,
}

impl SharedStoreRegistry {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    /// Current entries; missing or corrupt file reads as empty
    pub fn entries(&self) -> Vec<String> {
        let path = self.registry_path();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => return Vec::new(),
        };
        match toml::from_str::<RegistryDoc>(&text) {
            Ok(doc) => doc.projects,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "registry file unreadable, treating as empty"
                );
                Vec::new()
            }
        }
    }

    fn persist(&self, entries: &[String]) -> Result<()> {
        let path = self.registry_path();
        if entries.is_empty() {
            // No empty-but-present marker is left behind
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            return Ok(());
        }

        let doc = RegistryDoc {
            projects: entries.to_vec(),
        };
        let text = toml::to_string_pretty(&doc).map_err(|e| Error::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&path, text)?;
        Ok(())
    }

    /// Normalize a manifest path relative to the store root
    fn normalize(&self, manifest_path: &Path) -> String {
        let absolute = std::path::absolute(manifest_path)
            .unwrap_or_else(|_| manifest_path.to_path_buf());
        let root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        match pathdiff::diff_paths(&absolute, &root) {
            Some(relative) => relative.display().to_string(),
            None => absolute.display().to_string(),
        }
    }

    fn resolve(&self, entry: &str) -> PathBuf {
        let path = Path::new(entry);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Record a project manifest; inserting an already-present path is a no-op
    pub fn register(&self, manifest_path: &Path) -> Result<()> {
        let entry = self.normalize(manifest_path);
        let mut entries = self.entries();
        if entries.contains(&entry) {
            return Ok(());
        }
        debug!(entry = %entry, "registering project with shared store");
        entries.push(entry);
        self.persist(&entries)
    }

    /// Remove a project manifest from the registry
    pub fn unregister(&self, manifest_path: &Path) -> Result<()> {
        let entry = self.normalize(manifest_path);
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| *e != entry);
        if entries.len() == before {
            return Ok(());
        }
        debug!(entry = %entry, "unregistering project from shared store");
        self.persist(&entries)
    }

    /// Check whether any registered project still lists the identity
    ///
    /// Entries whose manifest no longer exists on disk are pruned as a side
    /// effect, and the pruned registry is re-persisted only when something
    /// actually changed. Returns true on the first match.
    pub fn is_referenced(&self, identity: &PackageIdentity) -> Result<bool> {
        let entries = self.entries();
        let mut surviving: Vec<String> = Vec::with_capacity(entries.len());
        let mut pruned = false;
        let mut referenced = false;

        for (i, entry) in entries.iter().enumerate() {
            let manifest_path = self.resolve(entry);
            if !manifest_path.exists() {
                debug!(entry = %entry, "pruning stale registry entry");
                pruned = true;
                continue;
            }
            surviving.push(entry.clone());

            let manifest = ProjectManifest::load(&manifest_path)?;
            if manifest.contains(identity) {
                // Unvisited entries are kept as-is
                surviving.extend(entries[i + 1..].iter().cloned());
                referenced = true;
                break;
            }
        }

        if pruned {
            self.persist(&surviving)?;
        }
        Ok(referenced)
    }
}

/// A solution-level physical package store
///
/// Each package lives in its own `id.version` directory under the root.
/// Physical removal is gated on the registry's reference count.
#[derive(Debug, Clone)]
pub struct SharedPackageStore {
    root: PathBuf,
    registry: SharedStoreRegistry,
}

impl SharedPackageStore {
    /// Open (creating if needed) a store rooted at the given directory
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            registry: SharedStoreRegistry::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &SharedStoreRegistry {
        &self.registry
    }

    /// Directory holding one package's payload
    pub fn package_dir(&self, identity: &PackageIdentity) -> PathBuf {
        self.root
            .join(format!("{}.{}", identity.id, identity.version))
    }

    /// Whether the package is physically present
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.package_dir(identity).is_dir()
    }

    /// Ensure the package directory exists
    ///
    /// Payload extraction belongs to external collaborators; the store only
    /// manages directory lifetime.
    pub fn materialize(&self, identity: &PackageIdentity) -> Result<()> {
        std::fs::create_dir_all(self.package_dir(identity))?;
        Ok(())
    }

    /// Delete the package directory unless some project still references it
    ///
    /// Returns true when the directory was actually removed.
    pub fn remove_if_unreferenced(&self, identity: &PackageIdentity) -> Result<bool> {
        if self.registry.is_referenced(identity)? {
            debug!(package = %identity, "still referenced, keeping package");
            return Ok(false);
        }
        let dir = self.package_dir(identity);
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
            debug!(package = %identity, "removed package from shared store");
        }
        Ok(true)
    }
}

/// Operation handler wiring a project manifest to a shared store
///
/// Install records the identity in the manifest and materializes the
/// package directory; uninstall removes the record and deletes the
/// directory only once no registered project still needs it. Both are
/// idempotent with respect to already-applied state.
pub struct SharedStoreHandler<'a> {
    store: &'a SharedPackageStore,
    manifest: &'a mut ProjectManifest,
}

impl<'a> SharedStoreHandler<'a> {
    /// Create a handler, registering the project with the store
    pub fn new(
        store: &'a SharedPackageStore,
        manifest: &'a mut ProjectManifest,
    ) -> Result<Self> {
        store.registry.register(manifest.path())?;
        Ok(Self { store, manifest })
    }
}

impl OperationHandler for SharedStoreHandler<'_> {
    fn install(&mut self, package: &PackageIdentity) -> Result<()> {
        self.store.materialize(package)?;
        if !self.manifest.contains(package) {
            self.manifest.add(package.clone(), false);
            self.manifest.save()?;
        }
        Ok(())
    }

    fn uninstall(&mut self, package: &PackageIdentity) -> Result<()> {
        if self.manifest.remove(&package.id) {
            self.manifest.save()?;
        }
        self.store.remove_if_unreferenced(package)?;
        Ok(())
    }
}
