//! Shared test utilities for AppLock.
//!
//! This module provides common setup functions and recording fakes for the
//! native capability traits.

#![cfg(test)]

use crate::db::{migrations, Database};
use crate::error::AppError;
use crate::models::LockEvent;
use crate::native::{CredentialVault, DetectionLayer, PermissionLayer, RecoveryQuery};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (db, dir)
}

/// Same as `setup_test_db`, wrapped for components that share the handle.
pub fn setup_shared_db() -> (Arc<Mutex<Database>>, TempDir) {
    let (db, dir) = setup_test_db();
    (Arc::new(Mutex::new(db)), dir)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    QueryPending,
    BringToFront,
    Relaunch(String),
    CloseOverlay,
    SetLockedPackages(Vec<String>),
}

/// Detection layer that records every call.
pub struct FakeDetection {
    calls: Mutex<Vec<NativeCall>>,
    pending: Mutex<RecoveryQuery>,
    pub running: Mutex<bool>,
    pub relaunch_supported: bool,
    pub fail_actions: bool,
}

impl FakeDetection {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            pending: Mutex::new(RecoveryQuery::Ready(None)),
            running: Mutex::new(true),
            relaunch_supported: true,
            fail_actions: false,
        }
    }

    pub fn with_pending(event: Option<LockEvent>) -> Self {
        let fake = Self::new();
        *fake.pending.lock().unwrap() = RecoveryQuery::Ready(event);
        fake
    }

    pub fn deferred() -> Self {
        let fake = Self::new();
        *fake.pending.lock().unwrap() = RecoveryQuery::Deferred;
        fake
    }

    pub fn failing() -> Self {
        Self {
            fail_actions: true,
            ..Self::new()
        }
    }

    pub fn without_relaunch() -> Self {
        Self {
            relaunch_supported: false,
            ..Self::new()
        }
    }

    pub fn set_running(&self, running: bool) {
        *self.running.lock().unwrap() = running;
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &NativeCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn last_pushed(&self) -> Option<Vec<String>> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| {
            if let NativeCall::SetLockedPackages(p) = c {
                Some(p.clone())
            } else {
                None
            }
        })
    }

    fn record(&self, call: NativeCall, action: &'static str) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_actions {
            return Err(AppError::native(action, "simulated failure"));
        }
        Ok(())
    }
}

impl DetectionLayer for FakeDetection {
    fn query_pending_locked_app(&self) -> Result<RecoveryQuery, AppError> {
        self.calls.lock().unwrap().push(NativeCall::QueryPending);
        Ok(self.pending.lock().unwrap().clone())
    }

    fn bring_to_front(&self) -> Result<(), AppError> {
        self.record(NativeCall::BringToFront, "bring_to_front")
    }

    fn relaunch(&self, package_name: &str) -> Result<(), AppError> {
        self.record(NativeCall::Relaunch(package_name.to_string()), "relaunch")
    }

    fn close_overlay(&self) -> Result<(), AppError> {
        self.record(NativeCall::CloseOverlay, "close_overlay")
    }

    fn set_locked_packages(&self, packages: &[String]) -> Result<(), AppError> {
        self.record(NativeCall::SetLockedPackages(packages.to_vec()), "set_locked_packages")
    }

    fn is_detection_service_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    fn supports_relaunch(&self) -> bool {
        self.relaunch_supported
    }
}

/// Permission layer with switchable grants.
pub struct FakePermissions {
    pub accessibility: Mutex<bool>,
    pub overlay: Mutex<bool>,
    pub usage: Mutex<bool>,
    pub settings_opened: Mutex<usize>,
}

impl FakePermissions {
    pub fn granted() -> Self {
        Self {
            accessibility: Mutex::new(true),
            overlay: Mutex::new(true),
            usage: Mutex::new(true),
            settings_opened: Mutex::new(0),
        }
    }
}

impl PermissionLayer for FakePermissions {
    fn accessibility_status(&self) -> bool {
        *self.accessibility.lock().unwrap()
    }

    fn is_overlay_granted(&self) -> bool {
        *self.overlay.lock().unwrap()
    }

    fn is_usage_access_granted(&self) -> bool {
        *self.usage.lock().unwrap()
    }

    fn open_settings(&self) -> Result<(), AppError> {
        *self.settings_opened.lock().unwrap() += 1;
        Ok(())
    }
}

/// Vault that counts successful wipes.
#[derive(Default)]
pub struct FakeVault {
    pub cleared: Mutex<usize>,
    pub fail: bool,
}

impl FakeVault {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl CredentialVault for FakeVault {
    fn clear(&self) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::native("clear_credential", "simulated failure"));
        }
        *self.cleared.lock().unwrap() += 1;
        Ok(())
    }
}
