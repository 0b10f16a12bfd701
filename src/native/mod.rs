//! Capability seams to the platform.
//!
//! The orchestrator never talks to the OS directly: the detection layer, the
//! permission layer and the credential vault are injected as trait objects so
//! the state machine can run against recording fakes in tests and against the
//! stdio bridge in the native host.

use crate::error::AppError;
use crate::models::LockEvent;

/// Answer to a cold-start recovery query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryQuery {
    /// The layer answered synchronously.
    Ready(Option<LockEvent>),
    /// The answer will arrive later through `LockOrchestrator::on_recovery_result`.
    Deferred,
}

/// Foreground detection and process-level actions.
///
/// Every action is fire-and-forget from the caller's side: failures are
/// reported so they can be logged, never retried.
pub trait DetectionLayer: Send + Sync {
    /// Recover a lock event that fired before this process was alive.
    fn query_pending_locked_app(&self) -> Result<RecoveryQuery, AppError>;

    fn bring_to_front(&self) -> Result<(), AppError>;

    fn relaunch(&self, package_name: &str) -> Result<(), AppError>;

    fn close_overlay(&self) -> Result<(), AppError>;

    fn set_locked_packages(&self, packages: &[String]) -> Result<(), AppError>;

    fn is_detection_service_running(&self) -> bool;

    /// Whether `relaunch` is available on this platform.
    fn supports_relaunch(&self) -> bool {
        true
    }
}

/// OS permission queries the detection service depends on.
pub trait PermissionLayer: Send + Sync {
    fn accessibility_status(&self) -> bool;

    fn is_overlay_granted(&self) -> bool;

    fn is_usage_access_granted(&self) -> bool;

    fn open_settings(&self) -> Result<(), AppError>;
}

/// Storage for the user's PIN. Only wiping is needed here.
pub trait CredentialVault: Send + Sync {
    fn clear(&self) -> Result<(), AppError>;
}
