// src/executor/mod.rs

//! Transactional plan execution.
//!
//! The executor applies an ordered operation plan through an
//! `OperationHandler`, firing listener hooks around every step. A plan is
//! all-or-nothing: when a handler fails, every already-applied operation
//! is undone by its inverse, in reverse order, and the original error is
//! re-raised unchanged. Inverse-handler failures are logged and never
//! replace the original error.
//!
//! `ExecutionLease` is the global busy gate: exactly one resolve+execute
//! cycle may run against a store at a time, and a second request fails
//! fast instead of queueing.

use crate::error::{Error, Result};
use crate::events::OperationListener;
use crate::package::{OperationKind, PackageIdentity, PackageOperation};
use chrono::Utc;
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the lease lock inside the store root
pub const LOCK_FILE: &str = "caravel.lock";

/// Applies operations to the real world
///
/// Handlers are supplied by the collaborators that actually touch the
/// filesystem and project files. Both methods must be idempotent with
/// respect to already-applied state, since rollback may replay them.
pub trait OperationHandler {
    fn install(&mut self, package: &PackageIdentity) -> Result<()>;
    fn uninstall(&mut self, package: &PackageIdentity) -> Result<()>;
}

/// Result of a successfully executed plan
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub execution_id: String,
    pub executed: Vec<PackageOperation>,
    pub duration_ms: u64,
}

/// Applies operation plans with rollback-on-failure semantics
#[derive(Default)]
pub struct ActionExecutor {
    listeners: Vec<Box<dyn OperationListener>>,
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a before/after listener; listeners fire in registration order
    pub fn add_listener(&mut self, listener: Box<dyn OperationListener>) {
        self.listeners.push(listener);
    }

    /// Apply a plan in order
    ///
    /// On the first handler error the executed prefix is rolled back in
    /// reverse and the handler's error is returned as-is.
    pub fn execute(
        &self,
        plan: &[PackageOperation],
        handler: &mut dyn OperationHandler,
    ) -> Result<ExecutionReport> {
        let execution_id = uuid::Uuid::new_v4().to_string();
        let start = Utc::now();
        let mut executed: Vec<PackageOperation> = Vec::new();

        debug!(execution = %execution_id, operations = plan.len(), "executing plan");
        for operation in plan {
            self.notify_before(operation);
            match self.apply(operation, handler) {
                Ok(()) => {
                    self.notify_after(operation);
                    executed.push(operation.clone());
                }
                Err(e) => {
                    log::warn!("{} failed ({}), rolling back {} operations", operation, e, executed.len());
                    self.rollback(&executed, handler);
                    return Err(e);
                }
            }
        }

        let duration_ms = Utc::now()
            .signed_duration_since(start)
            .num_milliseconds()
            .max(0) as u64;
        Ok(ExecutionReport {
            execution_id,
            executed,
            duration_ms,
        })
    }

    fn apply(&self, operation: &PackageOperation, handler: &mut dyn OperationHandler) -> Result<()> {
        match operation.kind {
            OperationKind::Install => handler.install(&operation.package),
            OperationKind::Uninstall => handler.uninstall(&operation.package),
        }
    }

    /// Undo the executed prefix in reverse order, best effort
    fn rollback(&self, executed: &[PackageOperation], handler: &mut dyn OperationHandler) {
        for operation in executed.iter().rev() {
            let inverse = operation.inverse();
            self.notify_before(&inverse);
            match self.apply(&inverse, handler) {
                Ok(()) => self.notify_after(&inverse),
                Err(e) => {
                    // Keep unwinding; the remaining operations still deserve
                    // their compensation
                    log::warn!("rollback of {} failed: {}", operation, e);
                }
            }
        }
    }

    fn notify_before(&self, operation: &PackageOperation) {
        for listener in &self.listeners {
            match operation.kind {
                OperationKind::Install => listener.before_install(&operation.package),
                OperationKind::Uninstall => listener.before_uninstall(&operation.package),
            }
        }
    }

    fn notify_after(&self, operation: &PackageOperation) {
        for listener in &self.listeners {
            match operation.kind {
                OperationKind::Install => listener.after_install(&operation.package),
                OperationKind::Uninstall => listener.after_uninstall(&operation.package),
            }
        }
    }
}

/// Exclusive lease over a store for the duration of a resolve+execute cycle
///
/// Backed by an exclusive file lock; acquisition tries exactly once and
/// reports `Busy` when the lease is already held. Released on drop.
#[derive(Debug)]
pub struct ExecutionLease {
    lock_file: File,
    path: PathBuf,
}

impl ExecutionLease {
    pub fn acquire(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE);
        let lock_file = File::create(&path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(Error::Busy(format!(
                "lease already held at {}",
                path.display()
            )));
        }
        debug!(path = %path.display(), "acquired execution lease");
        Ok(Self { lock_file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExecutionLease {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}
