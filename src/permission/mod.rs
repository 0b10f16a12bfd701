use crate::config::AppLockConfig;
use crate::constants::MAX_PERMISSION_CHECK_SECS;
use crate::error::AppError;
use crate::native::{DetectionLayer, PermissionLayer};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionStatus {
    pub accessibility: bool,
    pub overlay: bool,
    pub usage: bool,
}

impl PermissionStatus {
    pub fn all_granted(&self) -> bool {
        self.accessibility && self.overlay && self.usage
    }
}

const PROMPT_MESSAGE: &str =
    "App protection is paused. Re-enable the accessibility service to keep your apps locked.";

/// Non-blocking nag shown when the detection service is down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationPrompt {
    pub message: String,
    pub deep_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptUpdate {
    Show(RemediationPrompt),
    Hide,
}

/// Re-validates the permissions the detection service needs.
///
/// The prompt never sits on top of a lock screen: it is withheld while one is
/// up and taken down when one appears. Dismissing it silences it until the next
/// foreground transition.
pub struct PermissionMonitor {
    permissions: Arc<dyn PermissionLayer>,
    detection: Arc<dyn DetectionLayer>,
    interval: Duration,
    deep_link: String,
    last_check: Option<Instant>,
    prompt_visible: bool,
    dismissed: bool,
}

impl PermissionMonitor {
    pub fn new(
        permissions: Arc<dyn PermissionLayer>,
        detection: Arc<dyn DetectionLayer>,
        config: &AppLockConfig,
    ) -> Self {
        Self {
            permissions,
            detection,
            interval: config
                .permission_check_interval
                .min(Duration::from_secs(MAX_PERMISSION_CHECK_SECS)),
            deep_link: config.settings_deep_link.clone(),
            last_check: None,
            prompt_visible: false,
            dismissed: false,
        }
    }

    /// Query every capability independently. Missing ones are logged, never fatal.
    pub fn check_all(&self) -> PermissionStatus {
        let status = PermissionStatus {
            accessibility: self.permissions.accessibility_status(),
            overlay: self.permissions.is_overlay_granted(),
            usage: self.permissions.is_usage_access_granted(),
        };
        if status.all_granted() {
            return status;
        }

        if !status.accessibility {
            warn!("Accessibility permission not granted");
        }
        if !status.overlay {
            warn!("Overlay permission not granted");
        }
        if !status.usage {
            warn!("Usage access not granted");
        }
        status
    }

    pub fn check_accessibility_running(&self) -> bool {
        self.detection.is_detection_service_running()
    }

    /// Re-evaluate now, e.g. on a foreground transition. Clears a previous dismissal.
    pub fn on_foreground(&mut self, lock_showing: bool, now: Instant) -> Option<PromptUpdate> {
        self.dismissed = false;
        self.evaluate(lock_showing, now)
    }

    /// Periodic re-check; does nothing until the interval has passed.
    pub fn poll(&mut self, lock_showing: bool, now: Instant) -> Option<PromptUpdate> {
        if let Some(last) = self.last_check {
            if now.duration_since(last) < self.interval {
                return None;
            }
        }
        self.evaluate(lock_showing, now)
    }

    /// Re-evaluate immediately after fresh status arrived. Keeps a dismissal in force.
    pub fn refresh(&mut self, lock_showing: bool, now: Instant) -> Option<PromptUpdate> {
        self.evaluate(lock_showing, now)
    }

    /// When the next periodic check is due.
    pub fn next_check(&self, now: Instant) -> Instant {
        self.last_check
            .map_or(now, |last| last.checked_add(self.interval).unwrap_or(now))
    }

    /// Take the prompt down because a lock screen just appeared. Unlike a
    /// dismissal, the prompt may come back once the lock is gone.
    pub fn yield_to_lock(&mut self) -> Option<PromptUpdate> {
        if self.prompt_visible {
            debug!("Hiding permission prompt under the lock screen");
        }
        self.hide()
    }

    pub fn dismiss_prompt(&mut self) -> Option<PromptUpdate> {
        self.dismissed = true;
        self.hide()
    }

    pub fn open_settings(&self) -> Result<(), AppError> {
        info!("Opening settings at {}", self.deep_link);
        self.permissions.open_settings()
    }

    pub fn is_prompt_visible(&self) -> bool {
        self.prompt_visible
    }

    fn evaluate(&mut self, lock_showing: bool, now: Instant) -> Option<PromptUpdate> {
        self.last_check = Some(now);
        self.check_all();

        if self.check_accessibility_running() {
            return self.hide();
        }
        warn!("Detection service is not running");

        if lock_showing {
            return self.yield_to_lock();
        }
        if self.dismissed || self.prompt_visible {
            return None;
        }

        self.prompt_visible = true;
        Some(PromptUpdate::Show(RemediationPrompt {
            message: PROMPT_MESSAGE.into(),
            deep_link: self.deep_link.clone(),
        }))
    }

    fn hide(&mut self) -> Option<PromptUpdate> {
        if std::mem::replace(&mut self.prompt_visible, false) {
            Some(PromptUpdate::Hide)
        } else {
            None
        }
    }
}
