//! Lock orchestration state machine.
//!
//! Every input (lock events, recovery answers, lifecycle edges, back presses,
//! authentication, timer ticks) goes through one of the `on_*` entry points and
//! is processed to completion. Duplicate deliveries of the same event over
//! several channels need no extra bookkeeping: `Locked(A)` ignores events for A.

mod state;

pub use state::{OrchestratorState, OverlayChange, StartupGuards};

use crate::config::AppLockConfig;
use crate::lifecycle::LifecycleTransition;
use crate::models::{LockEvent, LockedAppInfo};
use crate::native::{DetectionLayer, RecoveryQuery};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct LockOrchestrator {
    state: OrchestratorState,
    guards: StartupGuards,
    started: bool,
    host_package: String,
    cooldown: Duration,
    /// Set only while `Unlocking`.
    cooldown_deadline: Option<Instant>,
    detection: Arc<dyn DetectionLayer>,
}

impl LockOrchestrator {
    pub fn new(detection: Arc<dyn DetectionLayer>, config: &AppLockConfig) -> Self {
        Self {
            state: OrchestratorState::Idle,
            guards: StartupGuards::default(),
            started: false,
            host_package: config.host_package.clone(),
            cooldown: config.cooldown,
            cooldown_deadline: None,
            detection,
        }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn guards(&self) -> StartupGuards {
        self.guards
    }

    pub fn is_lock_showing(&self) -> bool {
        self.state.is_lock_showing()
    }

    /// When the running cooldown ends, if one is running.
    pub fn cooldown_deadline(&self) -> Option<Instant> {
        self.cooldown_deadline
    }

    /// Run the startup sequence once per process.
    ///
    /// A `pending` app delivered out of band locks immediately and skips the
    /// recovery query; otherwise the query is issued and the orchestrator waits
    /// in `PendingCheck` until it answers.
    pub fn start(&mut self, pending: Option<LockEvent>) -> Option<OverlayChange> {
        if std::mem::replace(&mut self.started, true) {
            warn!("Orchestrator already started, ignoring repeated start");
            return None;
        }

        let pending = pending.filter(|event| {
            let own = self.is_own_package(event);
            if own {
                warn!("Ignoring supplied pending lock for the host package itself");
            }
            !own
        });

        if let Some(event) = pending {
            info!("Starting locked on supplied pending app {}", event.package_name);
            self.guards.mark_recovery_attempted();
            self.guards.mark_initial_lock_handled();
            return self.transition(OrchestratorState::Locked(LockedAppInfo::from(event)));
        }

        if self.guards.recovery_attempted() {
            debug!("Recovery query already issued before start");
            return None;
        }
        let change = self.transition(OrchestratorState::PendingCheck);
        self.issue_recovery_query().or(change)
    }

    /// Answer to the cold-start recovery query, synchronous or deferred.
    pub fn on_recovery_result(&mut self, result: Option<LockEvent>) -> Option<OverlayChange> {
        if !self.guards.mark_initial_lock_handled() {
            debug!("Recovery answer arrived after the initial lock was handled, ignoring");
            return None;
        }

        match &self.state {
            OrchestratorState::Idle | OrchestratorState::PendingCheck => {}
            OrchestratorState::Locked(_) | OrchestratorState::Unlocking(_) => {
                debug!("Recovery answer ignored while {}", self.state.name());
                return None;
            }
        }

        match result.filter(|event| !self.is_own_package(event)) {
            Some(event) => {
                info!("Cold-start recovery found {}", event.package_name);
                let change = self.transition(OrchestratorState::Locked(LockedAppInfo::from(event)));
                self.request_bring_to_front();
                change
            }
            None => self.transition(OrchestratorState::Idle),
        }
    }

    /// A protected app came to the foreground.
    pub fn on_lock_event(&mut self, event: LockEvent) -> Option<OverlayChange> {
        if self.is_own_package(&event) {
            debug!("Dropping lock event for own package");
            return None;
        }

        match &self.state {
            OrchestratorState::Idle | OrchestratorState::PendingCheck => {
                // A live event settles startup; a late recovery answer must not re-lock.
                self.guards.mark_initial_lock_handled();
            }
            OrchestratorState::Locked(current) if current.package_name == event.package_name => {
                debug!("Already locked on {}, ignoring duplicate", event.package_name);
                return None;
            }
            OrchestratorState::Locked(_) => {}
            OrchestratorState::Unlocking(_) => {
                debug!("Dropping lock event for {} during cooldown", event.package_name);
                return None;
            }
        }

        let change = self.transition(OrchestratorState::Locked(LockedAppInfo::from(event)));
        self.request_bring_to_front();
        change
    }

    /// Authentication succeeded: enter the cooldown window.
    ///
    /// Returns the unlocked app so the caller can relaunch it. `None` when
    /// nothing was locked.
    pub fn begin_unlock(&mut self, now: Instant) -> Option<LockedAppInfo> {
        let OrchestratorState::Locked(app) = &self.state else {
            warn!("Authentication reported while {}, ignoring", self.state.name());
            return None;
        };
        let app = app.clone();

        self.transition(OrchestratorState::Unlocking(app.clone()));
        self.cooldown_deadline = Some(now + self.cooldown);
        info!("Unlocked {}, cooldown {:?}", app.package_name, self.cooldown);
        Some(app)
    }

    /// Advance timers. Ends the cooldown once its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Option<OverlayChange> {
        let expired = matches!(self.state, OrchestratorState::Unlocking(_))
            && self.cooldown_deadline.is_some_and(|deadline| now >= deadline);
        if !expired {
            return None;
        }
        debug!("Cooldown elapsed");
        self.transition(OrchestratorState::Idle)
    }

    pub fn on_lifecycle(&mut self, transition: LifecycleTransition) -> Option<OverlayChange> {
        match transition {
            LifecycleTransition::Backgrounded => match &self.state {
                OrchestratorState::Unlocking(_) => {
                    debug!("Host backgrounded during cooldown, ending it early");
                    self.transition(OrchestratorState::Idle)
                }
                OrchestratorState::Idle
                | OrchestratorState::PendingCheck
                | OrchestratorState::Locked(_) => None,
            },
            // Never reissues once attempted.
            LifecycleTransition::Foregrounded => self.issue_recovery_query(),
        }
    }

    /// Close the overlay without relaunching (forgot-credential recovery, reset).
    pub fn dismiss(&mut self) -> Option<OverlayChange> {
        match &self.state {
            OrchestratorState::Locked(app) => {
                info!("Dismissing lock for {}", app.package_name);
                let change = self.transition(OrchestratorState::Idle);
                if let Err(e) = self.detection.close_overlay() {
                    error!("close_overlay failed: {e}");
                }
                change
            }
            OrchestratorState::Idle
            | OrchestratorState::PendingCheck
            | OrchestratorState::Unlocking(_) => None,
        }
    }

    /// Hardware back press. Returns true when it was swallowed.
    pub fn on_back_pressed(&self) -> bool {
        let handled = self.state.is_lock_showing();
        if handled {
            debug!("Back press suppressed while {}", self.state.name());
        }
        handled
    }

    fn issue_recovery_query(&mut self) -> Option<OverlayChange> {
        if !self.guards.mark_recovery_attempted() {
            return None;
        }

        match self.detection.query_pending_locked_app() {
            Ok(RecoveryQuery::Ready(result)) => self.on_recovery_result(result),
            Ok(RecoveryQuery::Deferred) => {
                debug!("Recovery query issued, awaiting answer");
                None
            }
            Err(e) => {
                error!("Recovery query failed: {e}");
                self.on_recovery_result(None)
            }
        }
    }

    fn is_own_package(&self, event: &LockEvent) -> bool {
        event.package_name == self.host_package
    }

    fn request_bring_to_front(&self) {
        // The overlay is still rendered in-process if this fails.
        if let Err(e) = self.detection.bring_to_front() {
            error!("bring_to_front failed: {e}");
        }
    }

    fn transition(&mut self, next: OrchestratorState) -> Option<OverlayChange> {
        let before = self.state.locked_app().cloned();

        let change = match &next {
            OrchestratorState::Locked(app) if before.as_ref() != Some(app) => {
                Some(OverlayChange::Show(app.clone()))
            }
            OrchestratorState::Idle | OrchestratorState::PendingCheck if before.is_some() => {
                Some(OverlayChange::Hide)
            }
            OrchestratorState::Idle
            | OrchestratorState::PendingCheck
            | OrchestratorState::Locked(_)
            | OrchestratorState::Unlocking(_) => None,
        };

        debug!("State {} -> {}", self.state.name(), next.name());
        self.state = next;
        self.cooldown_deadline = None;
        change
    }
}
