// src/error.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

/// Errors produced by resolution, execution, and the shared store
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed version or range text
    #[error("parse error: {0}")]
    Parse(String),

    /// Package (or a satisfying version of it) absent from the catalog
    #[error("package {id} not found ({requirement})")]
    PackageNotFound { id: String, requirement: String },

    /// Two requirers need versions of the same package that cannot coexist
    #[error(
        "conflicting requirements for {id}: {first_requirer} requires {first_range}, \
         {second_requirer} requires {second_range}"
    )]
    DependencyConflict {
        id: String,
        first_requirer: String,
        first_range: String,
        second_requirer: String,
        second_range: String,
    },

    /// A package depends on itself through the chain shown
    #[error("circular dependency: {0}")]
    CycleDetected(String),

    /// Uninstall target is still required by installed packages
    #[error("cannot uninstall {id}: required by {}", .dependents.join(", "))]
    PackageInUse { id: String, dependents: Vec<String> },

    /// The execution lease is already held
    #[error("another operation is in progress: {0}")]
    Busy(String),

    /// A manifest, registry, or catalog file could not be read or written
    #[error("{path}: {message}")]
    Manifest { path: String, message: String },

    /// An operation handler refused an operation
    #[error("operation failed for {id} {version}: {reason}")]
    ExecutionFailed {
        id: String,
        version: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
