// src/manifest.rs

//! Per-project install manifests.
//!
//! A project's installed packages are recorded in a small TOML document.
//! The manifest is the single mutation point for install state: the
//! resolver only ever sees snapshots (`InstallState`), and operation
//! handlers write changes back through this type.

use crate::error::{Error, Result};
use crate::package::PackageIdentity;
use crate::state::InstallState;
use crate::version::SemanticVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the install manifest inside a project directory
pub const MANIFEST_FILE: &str = "packages.toml";

/// Manifest path for a project directory
pub fn manifest_path(project_dir: &Path) -> PathBuf {
    project_dir.join(MANIFEST_FILE)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestDoc {
    #[serde(default, rename = "package")]
    packages: Vec<PackageRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackageRecord {
    id: String,
    version: String,
    #[serde(default)]
    top_level: bool,
}

/// A project's install manifest, loaded into memory
#[derive(Debug, Clone)]
pub struct ProjectManifest {
    path: PathBuf,
    packages: Vec<(PackageIdentity, bool)>,
}

impl ProjectManifest {
    /// Load a manifest; a missing file is an empty manifest
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                packages: Vec::new(),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|e| Error::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let doc: ManifestDoc = toml::from_str(&text).map_err(|e| Error::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut packages = Vec::new();
        for record in doc.packages {
            let version = SemanticVersion::parse(&record.version)?;
            packages.push((
                PackageIdentity::new(record.id, version),
                record.top_level,
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            packages,
        })
    }

    /// Write the manifest back to disk
    ///
    /// The file persists even when empty: a registered project with zero
    /// packages must keep existing or the store registry would prune it.
    pub fn save(&self) -> Result<()> {
        let mut records: Vec<PackageRecord> = self
            .packages
            .iter()
            .map(|(identity, top_level)| PackageRecord {
                id: identity.id.clone(),
                version: identity.version.to_string(),
                top_level: *top_level,
            })
            .collect();
        records.sort_by(|a, b| a.id.to_ascii_lowercase().cmp(&b.id.to_ascii_lowercase()));

        let doc = ManifestDoc { packages: records };
        let text = toml::to_string_pretty(&doc).map_err(|e| Error::Manifest {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), packages = self.packages.len(), "saved manifest");
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a package, replacing any other version of the same id
    pub fn add(&mut self, identity: PackageIdentity, top_level: bool) {
        self.packages
            .retain(|(p, _)| !p.id.eq_ignore_ascii_case(&identity.id));
        self.packages.push((identity, top_level));
    }

    /// Remove any version of the id; returns whether something was removed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.packages.len();
        self.packages.retain(|(p, _)| !p.id.eq_ignore_ascii_case(id));
        self.packages.len() != before
    }

    /// Mark an installed id as explicitly requested
    pub fn set_top_level(&mut self, id: &str, top_level: bool) {
        for (identity, flag) in &mut self.packages {
            if identity.id.eq_ignore_ascii_case(id) {
                *flag = top_level;
            }
        }
    }

    /// Check for an exact identity
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.packages.iter().any(|(p, _)| p == identity)
    }

    /// Number of recorded packages
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Snapshot for the resolver
    pub fn snapshot(&self) -> InstallState {
        let mut state = InstallState::new();
        for (identity, top_level) in &self.packages {
            state.insert(identity.clone(), *top_level);
        }
        state
    }
}
