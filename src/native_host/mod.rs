//! Native messaging host.
//!
//! Runs the lock core as a standalone process next to the platform shell. Both
//! directions use length-prefixed JSON frames (little-endian u32 length) over
//! stdin/stdout. Logging goes to stderr so it never corrupts the stream.

mod bridge;
mod messages;

pub use bridge::{StatusSnapshot, StdioBridge};
pub use messages::{IncomingMessage, OutgoingMessage};

use crate::config::AppLockConfig;
use crate::constants::MAX_MESSAGE_SIZE;
use crate::db::{with_connection, Database};
use crate::error::AppError;
use crate::lifecycle::{AppLifecycle, LifecycleObserver, LifecycleTransition};
use crate::models::setup::{is_setup_complete, set_setup_complete};
use crate::models::{LockEvent, LockedAppSet};
use crate::native::{CredentialVault, DetectionLayer, PermissionLayer};
use crate::orchestrator::{LockOrchestrator, OrchestratorState, OverlayChange};
use crate::permission::{PermissionMonitor, PermissionStatus, PromptUpdate};
use crate::registry::LockedAppRegistry;
use crate::unlock::{ForgotCredential, ResetConfirmation, UnlockFlow};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// Read one frame body. Oversized frames are rejected before allocating.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = usize::try_from(u32::from_le_bytes(len_bytes))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {len} bytes (max: {MAX_MESSAGE_SIZE} bytes)"),
        ));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

pub fn write_message<W: Write, T: Serialize>(writer: &mut W, message: &T) -> io::Result<()> {
    let json = serde_json::to_vec(message)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Outgoing message too large: {} bytes", json.len()),
        ));
    }
    let len = u32::try_from(json.len())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()
}

enum Inbound {
    Message(IncomingMessage),
    /// A complete frame that did not decode; the stream is still in sync.
    Malformed(serde_json::Error),
    Closed(io::Error),
}

fn read_loop<R: Read>(mut reader: R, tx: &Sender<Inbound>) {
    loop {
        let inbound = match read_frame(&mut reader) {
            Ok(frame) => match serde_json::from_slice(&frame) {
                Ok(message) => Inbound::Message(message),
                Err(e) => Inbound::Malformed(e),
            },
            Err(e) => Inbound::Closed(e),
        };
        let closed = matches!(inbound, Inbound::Closed(_));
        if tx.send(inbound).is_err() || closed {
            break;
        }
    }
}

fn overlay(change: Option<OverlayChange>) -> Vec<OutgoingMessage> {
    change.into_iter().map(OutgoingMessage::from).collect()
}

fn prompt(update: Option<PromptUpdate>) -> Vec<OutgoingMessage> {
    update.into_iter().map(OutgoingMessage::from).collect()
}

fn error_reply(e: AppError) -> Vec<OutgoingMessage> {
    vec![OutgoingMessage::Error { message: e.into() }]
}

pub struct NativeHost {
    db: Arc<Mutex<Database>>,
    bridge: Arc<StdioBridge>,
    host_package: String,
    orchestrator: LockOrchestrator,
    registry: LockedAppRegistry,
    unlock: UnlockFlow,
    permissions: PermissionMonitor,
    lifecycle: LifecycleObserver,
    /// Reset offered on the lock screen of this package, waiting for confirmation.
    pending_reset: Option<(String, ResetConfirmation)>,
}

impl NativeHost {
    pub fn new(db: Arc<Mutex<Database>>, config: &AppLockConfig) -> Self {
        let bridge = Arc::new(StdioBridge::new(config.settings_deep_link.clone()));
        let detection: Arc<dyn DetectionLayer> = Arc::<StdioBridge>::clone(&bridge);
        let permission_layer: Arc<dyn PermissionLayer> = Arc::<StdioBridge>::clone(&bridge);
        let vault: Arc<dyn CredentialVault> = Arc::<StdioBridge>::clone(&bridge);

        Self {
            host_package: config.host_package.clone(),
            orchestrator: LockOrchestrator::new(Arc::clone(&detection), config),
            registry: LockedAppRegistry::new(
                Arc::clone(&db),
                Arc::clone(&detection),
                &config.host_package,
            ),
            permissions: PermissionMonitor::new(permission_layer, Arc::clone(&detection), config),
            unlock: UnlockFlow::new(Arc::clone(&db), detection, vault),
            db,
            lifecycle: LifecycleObserver::default(),
            pending_reset: None,
            bridge,
        }
    }

    pub fn orchestrator(&self) -> &LockOrchestrator {
        &self.orchestrator
    }

    /// Load the locked apps and run the startup sequence.
    pub fn start(&mut self, pending: Option<LockEvent>, now: Instant) -> Vec<OutgoingMessage> {
        info!("Native host starting as {}", self.host_package);
        self.registry.load();

        let mut replies = overlay(self.orchestrator.start(pending));
        let lock_showing = self.orchestrator.is_lock_showing();
        replies.extend(prompt(self.permissions.on_foreground(lock_showing, now)));
        self.collect(replies)
    }

    /// Process one frame to completion. Native actions queued while handling
    /// it come first, followed by UI updates and replies.
    pub fn handle_message(
        &mut self,
        message: IncomingMessage,
        now: Instant,
    ) -> Vec<OutgoingMessage> {
        let mut replies = match message {
            IncomingMessage::AppLocked { event } => overlay(self.orchestrator.on_lock_event(event)),
            IncomingMessage::PendingLockedApp { event } => {
                overlay(self.orchestrator.on_recovery_result(event))
            }
            IncomingMessage::Lifecycle { state } => self.on_lifecycle(state, now),
            IncomingMessage::BackPressed => vec![OutgoingMessage::BackHandled {
                handled: self.orchestrator.on_back_pressed(),
            }],
            IncomingMessage::Authenticated => {
                self.unlock.on_authenticated(&mut self.orchestrator, now);
                Vec::new()
            }
            IncomingMessage::Dismiss => overlay(self.orchestrator.dismiss()),
            IncomingMessage::ForgotCredential => self.on_forgot_credential(),
            IncomingMessage::ConfirmReset => self.on_confirm_reset(),
            IncomingMessage::SetLockedApps { packages } => {
                self.registry
                    .replace(LockedAppSet::from_packages(packages, &self.host_package));
                self.locked_apps()
            }
            IncomingMessage::AddLockedApp { package_name } => {
                match self.registry.add(&package_name) {
                    Ok(_) => self.locked_apps(),
                    Err(e) => error_reply(e),
                }
            }
            IncomingMessage::RemoveLockedApp { package_name } => {
                self.registry.remove(&package_name);
                self.locked_apps()
            }
            IncomingMessage::SaveRecovery { question, answer } => {
                match self.unlock.save_recovery(&question, &answer) {
                    Ok(()) => vec![OutgoingMessage::RecoverySaved],
                    Err(e) => error_reply(e),
                }
            }
            IncomingMessage::VerifyRecoveryAnswer { answer } => {
                match self.unlock.verify_recovery_answer(&answer) {
                    Ok(correct) => vec![OutgoingMessage::RecoveryVerified { correct }],
                    Err(e) => error_reply(e),
                }
            }
            IncomingMessage::PermissionStatus {
                accessibility,
                overlay,
                usage,
                detection_running,
            } => {
                self.bridge.update_status(StatusSnapshot {
                    permissions: PermissionStatus { accessibility, overlay, usage },
                    detection_running,
                });
                let lock_showing = self.orchestrator.is_lock_showing();
                prompt(self.permissions.refresh(lock_showing, now))
            }
            IncomingMessage::DismissPrompt => prompt(self.permissions.dismiss_prompt()),
            IncomingMessage::OpenSettings => match self.permissions.open_settings() {
                Ok(()) => Vec::new(),
                Err(e) => error_reply(e),
            },
            IncomingMessage::CompleteSetup => {
                match with_connection(&self.db, "mark setup complete", |conn| {
                    set_setup_complete(conn, true)
                }) {
                    Ok(()) => vec![self.state()],
                    Err(e) => error_reply(e),
                }
            }
            IncomingMessage::GetState => vec![self.state()],
        };

        if self.orchestrator.is_lock_showing() {
            replies.extend(prompt(self.permissions.yield_to_lock()));
        }
        self.withdraw_stale_reset_offer();

        self.collect(replies)
    }

    /// Advance timers: the unlock cooldown and the periodic permission check.
    pub fn tick(&mut self, now: Instant) -> Vec<OutgoingMessage> {
        let mut replies = overlay(self.orchestrator.tick(now));
        let lock_showing = self.orchestrator.is_lock_showing();
        replies.extend(prompt(self.permissions.poll(lock_showing, now)));
        self.collect(replies)
    }

    /// The earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self, now: Instant) -> Instant {
        let permission_check = self.permissions.next_check(now);
        self.orchestrator
            .cooldown_deadline()
            .map_or(permission_check, |deadline| deadline.min(permission_check))
    }

    /// Serve stdin/stdout until the shell closes the pipe.
    pub fn run(self, pending: Option<LockEvent>) -> io::Result<()> {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        self.run_with(io::stdin(), &mut writer, pending)
    }

    /// Event loop over arbitrary streams.
    ///
    /// Frames are read on a separate thread so timers keep firing while the
    /// shell is quiet. Returns the read error that closed the stream;
    /// `UnexpectedEof` is the normal shutdown.
    pub fn run_with<R, W>(
        mut self,
        reader: R,
        writer: &mut W,
        pending: Option<LockEvent>,
    ) -> io::Result<()>
    where
        R: Read + Send + 'static,
        W: Write,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || read_loop(reader, &tx));

        let startup = self.start(pending, Instant::now());
        write_all(writer, &startup)?;

        loop {
            let now = Instant::now();
            let wait = self.next_deadline(now).saturating_duration_since(now);

            let replies = match rx.recv_timeout(wait) {
                Ok(Inbound::Message(message)) => {
                    debug!("Received {message:?}");
                    self.handle_message(message, Instant::now())
                }
                Ok(Inbound::Malformed(e)) => {
                    warn!("Dropping malformed message: {e}");
                    vec![OutgoingMessage::Error {
                        message: format!("malformed message: {e}"),
                    }]
                }
                Ok(Inbound::Closed(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => Vec::new(),
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            };
            write_all(writer, &replies)?;

            let timers = self.tick(Instant::now());
            write_all(writer, &timers)?;
        }
    }

    fn on_lifecycle(&mut self, state: AppLifecycle, now: Instant) -> Vec<OutgoingMessage> {
        let Some(transition) = self.lifecycle.observe(state) else {
            return Vec::new();
        };

        let mut replies = overlay(self.orchestrator.on_lifecycle(transition));
        if transition == LifecycleTransition::Foregrounded {
            let lock_showing = self.orchestrator.is_lock_showing();
            replies.extend(prompt(self.permissions.on_foreground(lock_showing, now)));
        }
        replies
    }

    fn on_forgot_credential(&mut self) -> Vec<OutgoingMessage> {
        let outcome = match self.unlock.on_forgot_credential(&mut self.orchestrator) {
            Ok(outcome) => outcome,
            Err(e) => return error_reply(e),
        };

        let mut replies = overlay(outcome.overlay);
        match outcome.next {
            ForgotCredential::Recovery { question } => {
                replies.push(OutgoingMessage::RecoveryRequested { question });
            }
            ForgotCredential::ResetOffered(confirmation) => {
                if let OrchestratorState::Locked(app) = self.orchestrator.state() {
                    self.pending_reset = Some((app.package_name.clone(), confirmation));
                }
                replies.push(OutgoingMessage::ResetOffered);
            }
        }
        replies
    }

    fn on_confirm_reset(&mut self) -> Vec<OutgoingMessage> {
        let Some((_, confirmation)) = self.pending_reset.take() else {
            warn!("Reset confirmation without a pending offer, ignoring");
            return vec![OutgoingMessage::Error {
                message: "no reset has been offered".into(),
            }];
        };

        match self
            .unlock
            .reset_all(confirmation, &mut self.orchestrator, &mut self.registry)
        {
            Ok(change) => {
                let mut replies = overlay(change);
                replies.push(OutgoingMessage::ResetComplete);
                replies
            }
            Err(e) => error_reply(e),
        }
    }

    /// A reset offer belongs to the lock screen it was made on.
    fn withdraw_stale_reset_offer(&mut self) {
        let Some((offered_on, _)) = &self.pending_reset else {
            return;
        };
        let same_screen = matches!(
            self.orchestrator.state(),
            OrchestratorState::Locked(app) if app.package_name == *offered_on
        );
        if !same_screen {
            debug!("Lock screen for {offered_on} gone, withdrawing reset offer");
            self.pending_reset = None;
        }
    }

    fn locked_apps(&self) -> Vec<OutgoingMessage> {
        vec![OutgoingMessage::LockedApps {
            packages: self.registry.apps().to_vec(),
        }]
    }

    fn state(&self) -> OutgoingMessage {
        let guards = self.orchestrator.guards();
        // Unreadable storage reports as not set up
        let setup_complete =
            with_connection(&self.db, "read setup flag", is_setup_complete).unwrap_or(false);
        OutgoingMessage::State {
            orchestrator: self.orchestrator.state().clone(),
            locked_apps: self.registry.apps().to_vec(),
            recovery_attempted: guards.recovery_attempted(),
            initial_lock_handled: guards.initial_lock_handled(),
            prompt_visible: self.permissions.is_prompt_visible(),
            setup_complete,
        }
    }

    fn collect(&self, replies: Vec<OutgoingMessage>) -> Vec<OutgoingMessage> {
        let mut out = self.bridge.drain();
        out.extend(replies);
        out
    }
}

fn write_all<W: Write>(writer: &mut W, messages: &[OutgoingMessage]) -> io::Result<()> {
    for message in messages {
        write_message(writer, message)?;
    }
    Ok(())
}
