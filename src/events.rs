// src/events.rs

//! Operation event hooks.
//!
//! Collaborators (logging, UI, script runners) observe plan execution
//! through the `OperationListener` trait: a flat before/after callback
//! surface invoked synchronously in plan order, and in reverse order
//! during rollback. Listeners never influence execution.

use crate::package::PackageIdentity;
use std::sync::Mutex;
use tracing::info;

/// Before/after notifications around each executed operation
///
/// All methods default to no-ops so implementations only override what
/// they care about. Implementations should be thread-safe (Send + Sync)
/// since execution may run off the caller's thread.
pub trait OperationListener: Send + Sync {
    /// Fired immediately before a package is installed
    fn before_install(&self, _package: &PackageIdentity) {}

    /// Fired after a package was installed successfully
    fn after_install(&self, _package: &PackageIdentity) {}

    /// Fired immediately before a package is uninstalled
    fn before_uninstall(&self, _package: &PackageIdentity) {}

    /// Fired after a package was uninstalled successfully
    fn after_uninstall(&self, _package: &PackageIdentity) {}
}

/// Listener that logs each operation through tracing
#[derive(Debug, Default)]
pub struct LogListener;

impl LogListener {
    pub fn new() -> Self {
        Self
    }
}

impl OperationListener for LogListener {
    fn before_install(&self, package: &PackageIdentity) {
        info!(package = %package, "installing");
    }

    fn after_install(&self, package: &PackageIdentity) {
        info!(package = %package, "installed");
    }

    fn before_uninstall(&self, package: &PackageIdentity) {
        info!(package = %package, "uninstalling");
    }

    fn after_uninstall(&self, package: &PackageIdentity) {
        info!(package = %package, "uninstalled");
    }
}

/// One recorded listener event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    BeforeInstall(PackageIdentity),
    AfterInstall(PackageIdentity),
    BeforeUninstall(PackageIdentity),
    AfterUninstall(PackageIdentity),
}

/// Listener that records the event sequence it observes
///
/// Mainly useful in tests asserting hook order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<OperationEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<OperationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl OperationListener for RecordingListener {
    fn before_install(&self, package: &PackageIdentity) {
        self.events
            .lock()
            .unwrap()
            .push(OperationEvent::BeforeInstall(package.clone()));
    }

    fn after_install(&self, package: &PackageIdentity) {
        self.events
            .lock()
            .unwrap()
            .push(OperationEvent::AfterInstall(package.clone()));
    }

    fn before_uninstall(&self, package: &PackageIdentity) {
        self.events
            .lock()
            .unwrap()
            .push(OperationEvent::BeforeUninstall(package.clone()));
    }

    fn after_uninstall(&self, package: &PackageIdentity) {
        self.events
            .lock()
            .unwrap()
            .push(OperationEvent::AfterUninstall(package.clone()));
    }
}
