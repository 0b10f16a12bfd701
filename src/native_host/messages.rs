use crate::lifecycle::AppLifecycle;
use crate::models::{LockEvent, LockedAppInfo};
use crate::orchestrator::{OrchestratorState, OverlayChange};
use crate::permission::{PromptUpdate, RemediationPrompt};
use serde::{Deserialize, Serialize};

/// Frames sent by the platform shell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// Live foreground transition into a protected app.
    AppLocked { event: LockEvent },
    /// Answer to `query_pending_locked_app`. `event` is null when nothing was pending.
    PendingLockedApp {
        #[serde(default)]
        event: Option<LockEvent>,
    },
    Lifecycle { state: AppLifecycle },
    BackPressed,
    Authenticated,
    Dismiss,
    ForgotCredential,
    ConfirmReset,
    SetLockedApps { packages: Vec<String> },
    #[serde(rename_all = "camelCase")]
    AddLockedApp { package_name: String },
    #[serde(rename_all = "camelCase")]
    RemoveLockedApp { package_name: String },
    SaveRecovery { question: String, answer: String },
    VerifyRecoveryAnswer { answer: String },
    #[serde(rename_all = "camelCase")]
    PermissionStatus {
        accessibility: bool,
        overlay: bool,
        usage: bool,
        detection_running: bool,
    },
    DismissPrompt,
    OpenSettings,
    /// Onboarding finished: credential set and apps chosen.
    CompleteSetup,
    GetState,
}

/// Frames sent to the platform shell: UI updates, native actions and replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    ShowOverlay { app: LockedAppInfo },
    HideOverlay,
    BringToFront,
    #[serde(rename_all = "camelCase")]
    Relaunch { package_name: String },
    CloseOverlay,
    SetLockedPackages { packages: Vec<String> },
    QueryPendingLockedApp,
    ClearCredential,
    #[serde(rename_all = "camelCase")]
    OpenSettings { deep_link: String },
    PermissionPrompt { prompt: RemediationPrompt },
    PromptHidden,
    RecoveryRequested { question: String },
    ResetOffered,
    ResetComplete,
    BackHandled { handled: bool },
    LockedApps { packages: Vec<String> },
    RecoverySaved,
    RecoveryVerified { correct: bool },
    #[serde(rename_all = "camelCase")]
    State {
        orchestrator: OrchestratorState,
        locked_apps: Vec<String>,
        recovery_attempted: bool,
        initial_lock_handled: bool,
        prompt_visible: bool,
        setup_complete: bool,
    },
    Error { message: String },
}

impl From<OverlayChange> for OutgoingMessage {
    fn from(change: OverlayChange) -> Self {
        match change {
            OverlayChange::Show(app) => OutgoingMessage::ShowOverlay { app },
            OverlayChange::Hide => OutgoingMessage::HideOverlay,
        }
    }
}

impl From<PromptUpdate> for OutgoingMessage {
    fn from(update: PromptUpdate) -> Self {
        match update {
            PromptUpdate::Show(prompt) => OutgoingMessage::PermissionPrompt { prompt },
            PromptUpdate::Hide => OutgoingMessage::PromptHidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_lock_event() {
        let msg: IncomingMessage = serde_json::from_str(
            r#"{"type":"app_locked","event":{"packageName":"com.whatsapp","className":"Main","timestamp":100}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            IncomingMessage::AppLocked { event: LockEvent::new("com.whatsapp", "Main", 100) }
        );
    }

    #[test]
    fn test_incoming_pending_answer_may_be_empty() {
        let null: IncomingMessage =
            serde_json::from_str(r#"{"type":"pending_locked_app","event":null}"#).unwrap();
        let missing: IncomingMessage =
            serde_json::from_str(r#"{"type":"pending_locked_app"}"#).unwrap();

        assert_eq!(null, IncomingMessage::PendingLockedApp { event: None });
        assert_eq!(missing, IncomingMessage::PendingLockedApp { event: None });
    }

    #[test]
    fn test_incoming_camel_case_fields() {
        let msg: IncomingMessage = serde_json::from_str(
            r#"{"type":"permission_status","accessibility":true,"overlay":false,"usage":true,"detectionRunning":false}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            IncomingMessage::PermissionStatus {
                accessibility: true,
                overlay: false,
                usage: true,
                detection_running: false,
            }
        );

        let add: IncomingMessage =
            serde_json::from_str(r#"{"type":"add_locked_app","packageName":"com.a"}"#).unwrap();
        assert_eq!(add, IncomingMessage::AddLockedApp { package_name: "com.a".into() });
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<IncomingMessage>(r#"{"type":"self_destruct"}"#).is_err());
    }

    #[test]
    fn test_outgoing_shape() {
        let json = serde_json::to_value(OutgoingMessage::Relaunch {
            package_name: "com.a".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "relaunch");
        assert_eq!(json["packageName"], "com.a");

        let hide = serde_json::to_value(OutgoingMessage::from(OverlayChange::Hide)).unwrap();
        assert_eq!(hide["type"], "hide_overlay");
    }
}
