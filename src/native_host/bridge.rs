use super::messages::OutgoingMessage;
use crate::error::AppError;
use crate::native::{CredentialVault, DetectionLayer, PermissionLayer, RecoveryQuery};
use crate::permission::PermissionStatus;
use log::warn;
use std::sync::{Mutex, MutexGuard};

/// Last status the shell reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub permissions: PermissionStatus,
    pub detection_running: bool,
}

/// Until the shell reports otherwise, assume everything works.
impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            permissions: PermissionStatus {
                accessibility: true,
                overlay: true,
                usage: true,
            },
            detection_running: true,
        }
    }
}

/// Implements the capability traits by queueing frames for the shell.
///
/// Actions are fire-and-forget: they land in the outbox and the host flushes
/// it after every handled message. Queries answer from the cached snapshot;
/// the recovery query is always deferred.
pub struct StdioBridge {
    outbox: Mutex<Vec<OutgoingMessage>>,
    status: Mutex<StatusSnapshot>,
    deep_link: String,
}

/// Lock a mutex, recovering from poisoning if necessary.
fn safe_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Bridge mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl StdioBridge {
    pub fn new(deep_link: String) -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            status: Mutex::new(StatusSnapshot::default()),
            deep_link,
        }
    }

    pub fn update_status(&self, snapshot: StatusSnapshot) {
        *safe_lock(&self.status) = snapshot;
    }

    pub fn status(&self) -> StatusSnapshot {
        *safe_lock(&self.status)
    }

    /// Take every queued frame, oldest first.
    pub fn drain(&self) -> Vec<OutgoingMessage> {
        std::mem::take(&mut *safe_lock(&self.outbox))
    }

    fn send(&self, message: OutgoingMessage) {
        safe_lock(&self.outbox).push(message);
    }
}

impl DetectionLayer for StdioBridge {
    fn query_pending_locked_app(&self) -> Result<RecoveryQuery, AppError> {
        self.send(OutgoingMessage::QueryPendingLockedApp);
        Ok(RecoveryQuery::Deferred)
    }

    fn bring_to_front(&self) -> Result<(), AppError> {
        self.send(OutgoingMessage::BringToFront);
        Ok(())
    }

    fn relaunch(&self, package_name: &str) -> Result<(), AppError> {
        self.send(OutgoingMessage::Relaunch {
            package_name: package_name.to_string(),
        });
        Ok(())
    }

    fn close_overlay(&self) -> Result<(), AppError> {
        self.send(OutgoingMessage::CloseOverlay);
        Ok(())
    }

    fn set_locked_packages(&self, packages: &[String]) -> Result<(), AppError> {
        self.send(OutgoingMessage::SetLockedPackages {
            packages: packages.to_vec(),
        });
        Ok(())
    }

    fn is_detection_service_running(&self) -> bool {
        self.status().detection_running
    }
}

impl PermissionLayer for StdioBridge {
    fn accessibility_status(&self) -> bool {
        self.status().permissions.accessibility
    }

    fn is_overlay_granted(&self) -> bool {
        self.status().permissions.overlay
    }

    fn is_usage_access_granted(&self) -> bool {
        self.status().permissions.usage
    }

    fn open_settings(&self) -> Result<(), AppError> {
        self.send(OutgoingMessage::OpenSettings {
            deep_link: self.deep_link.clone(),
        });
        Ok(())
    }
}

impl CredentialVault for StdioBridge {
    fn clear(&self) -> Result<(), AppError> {
        self.send(OutgoingMessage::ClearCredential);
        Ok(())
    }
}
