use crate::models::LockedAppInfo;
use serde::Serialize;

/// The orchestrator is always in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "app", rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    /// Waiting on the cold-start recovery answer.
    PendingCheck,
    Locked(LockedAppInfo),
    /// Just unlocked; lock events are ignored until the cooldown ends.
    Unlocking(LockedAppInfo),
}

impl OrchestratorState {
    pub fn name(&self) -> &'static str {
        match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::PendingCheck => "pending_check",
            OrchestratorState::Locked(_) => "locked",
            OrchestratorState::Unlocking(_) => "unlocking",
        }
    }

    /// The app behind the overlay, while one is owed.
    pub fn locked_app(&self) -> Option<&LockedAppInfo> {
        match self {
            OrchestratorState::Locked(app) | OrchestratorState::Unlocking(app) => Some(app),
            OrchestratorState::Idle | OrchestratorState::PendingCheck => None,
        }
    }

    pub fn is_lock_showing(&self) -> bool {
        self.locked_app().is_some()
    }
}

/// What the UI should do after a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "overlay", content = "app", rename_all = "snake_case")]
pub enum OverlayChange {
    Show(LockedAppInfo),
    Hide,
}

/// One-shot startup flags. Each only ever goes false -> true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupGuards {
    recovery_attempted: bool,
    initial_lock_handled: bool,
}

impl StartupGuards {
    pub fn recovery_attempted(&self) -> bool {
        self.recovery_attempted
    }

    pub fn initial_lock_handled(&self) -> bool {
        self.initial_lock_handled
    }

    /// Returns true only on the call that flips the flag.
    pub(crate) fn mark_recovery_attempted(&mut self) -> bool {
        !std::mem::replace(&mut self.recovery_attempted, true)
    }

    /// Returns true only on the call that flips the flag.
    pub(crate) fn mark_initial_lock_handled(&mut self) -> bool {
        !std::mem::replace(&mut self.initial_lock_handled, true)
    }
}
