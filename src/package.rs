// src/package.rs

//! Core package identity, dependency, and operation types.

use crate::version::{SemanticVersion, VersionRange};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A package id paired with a concrete version
///
/// Id comparison and hashing are ASCII-case-insensitive; version equality
/// is exact (range satisfaction is a separate question).
#[derive(Debug, Clone)]
pub struct PackageIdentity {
    pub id: String,
    pub version: SemanticVersion,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Lowercased id, used as the canonical map key throughout the crate
    pub fn key(&self) -> String {
        self.id.to_ascii_lowercase()
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.to_ascii_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// A dependency declared by a package
///
/// A missing range means any version of the id is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
    pub id: String,
    pub range: Option<VersionRange>,
}

impl PackageDependency {
    pub fn new(id: impl Into<String>, range: Option<VersionRange>) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }

    /// Lowercased id key
    pub fn key(&self) -> String {
        self.id.to_ascii_lowercase()
    }

    /// Check a concrete version against this dependency
    pub fn admits(&self, version: &SemanticVersion) -> bool {
        match self.range {
            Some(ref range) => range.satisfies(version),
            None => true,
        }
    }

    /// The range rendered for error messages, "any" when absent
    pub fn range_display(&self) -> String {
        match self.range {
            Some(ref range) => range.to_string(),
            None => "any".to_string(),
        }
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            Some(ref range) => write!(f, "{} {}", self.id, range),
            None => write!(f, "{}", self.id),
        }
    }
}

/// The two primitive actions a plan is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Install,
    Uninstall,
}

impl OperationKind {
    /// The compensating action used during rollback
    pub fn inverse(self) -> Self {
        match self {
            OperationKind::Install => OperationKind::Uninstall,
            OperationKind::Uninstall => OperationKind::Install,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Install => write!(f, "install"),
            OperationKind::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// One step of an ordered operation plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOperation {
    pub kind: OperationKind,
    pub package: PackageIdentity,
}

impl PackageOperation {
    pub fn install(package: PackageIdentity) -> Self {
        Self {
            kind: OperationKind::Install,
            package,
        }
    }

    pub fn uninstall(package: PackageIdentity) -> Self {
        Self {
            kind: OperationKind::Uninstall,
            package,
        }
    }

    /// The operation that undoes this one
    pub fn inverse(&self) -> Self {
        Self {
            kind: self.kind.inverse(),
            package: self.package.clone(),
        }
    }
}

impl fmt::Display for PackageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.package)
    }
}
