use crate::constants::KEY_LOCKED_APPS;
use crate::db::{kv, with_connection, Database};
use crate::error::AppError;
use crate::models::setup::set_setup_complete;
use crate::models::{LockedAppInfo, RecoveryData};
use crate::native::{CredentialVault, DetectionLayer};
use crate::orchestrator::{LockOrchestrator, OverlayChange};
use crate::registry::LockedAppRegistry;
use crate::validation::{validate_recovery_answer, validate_recovery_question};
use log::{error, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Proof that the user was offered the reset and confirmed it.
///
/// Only `UnlockFlow::on_forgot_credential` can mint one, so a full reset can
/// never run without passing through the confirmation step.
#[derive(Debug, PartialEq, Eq)]
pub struct ResetConfirmation(());

#[derive(Debug, PartialEq, Eq)]
pub enum ForgotCredential {
    /// Recovery data exists: the overlay was dismissed and the external
    /// recovery flow should ask this question.
    Recovery { question: String },
    /// No recovery data: a destructive reset is the only way out.
    ResetOffered(ResetConfirmation),
}

#[derive(Debug, PartialEq, Eq)]
pub struct ForgotCredentialOutcome {
    pub next: ForgotCredential,
    pub overlay: Option<OverlayChange>,
}

/// Side effects of authentication and of the forgot-credential path.
pub struct UnlockFlow {
    db: Arc<Mutex<Database>>,
    detection: Arc<dyn DetectionLayer>,
    vault: Arc<dyn CredentialVault>,
}

impl UnlockFlow {
    pub fn new(
        db: Arc<Mutex<Database>>,
        detection: Arc<dyn DetectionLayer>,
        vault: Arc<dyn CredentialVault>,
    ) -> Self {
        Self { db, detection, vault }
    }

    /// Enter the cooldown and hand the user back to the app they opened.
    pub fn on_authenticated(
        &self,
        orchestrator: &mut LockOrchestrator,
        now: Instant,
    ) -> Option<LockedAppInfo> {
        let app = orchestrator.begin_unlock(now)?;

        let result = if self.detection.supports_relaunch() {
            self.detection.relaunch(&app.package_name)
        } else {
            info!("Relaunch unavailable, closing overlay instead");
            self.detection.close_overlay()
        };
        if let Err(e) = result {
            error!("Failed to return to {}: {e}", app.package_name);
        }

        Some(app)
    }

    pub fn on_forgot_credential(
        &self,
        orchestrator: &mut LockOrchestrator,
    ) -> Result<ForgotCredentialOutcome, AppError> {
        let recovery = with_connection(&self.db, "load recovery data", RecoveryData::load)?;

        Ok(match recovery {
            Some(data) => ForgotCredentialOutcome {
                overlay: orchestrator.dismiss(),
                next: ForgotCredential::Recovery { question: data.question },
            },
            None => {
                info!("No recovery data, offering full reset");
                ForgotCredentialOutcome {
                    next: ForgotCredential::ResetOffered(ResetConfirmation(())),
                    overlay: None,
                }
            }
        })
    }

    /// Wipe the locked apps, the recovery data, the setup flag and the credential.
    ///
    /// Irreversible. Stored records go first in one transaction, then the
    /// credential. Any failure returns an error with the lock still showing;
    /// running the reset again finishes the job.
    pub fn reset_all(
        &self,
        confirmation: ResetConfirmation,
        orchestrator: &mut LockOrchestrator,
        registry: &mut LockedAppRegistry,
    ) -> Result<Option<OverlayChange>, AppError> {
        let ResetConfirmation(()) = confirmation;
        warn!("Performing full reset");

        with_connection(&self.db, "wipe stored data", |conn| {
            let tx = conn.unchecked_transaction()?;
            kv::remove(&tx, KEY_LOCKED_APPS)?;
            RecoveryData::clear(&tx)?;
            set_setup_complete(&tx, false)?;
            tx.commit()
        })?;
        self.vault.clear()?;
        registry.forget_all();

        Ok(orchestrator.dismiss())
    }

    pub fn save_recovery(&self, question: &str, answer: &str) -> Result<(), AppError> {
        let question = validate_recovery_question(question)?;
        let answer = validate_recovery_answer(answer)?;
        let data = RecoveryData::new(question, answer);
        with_connection(&self.db, "save recovery data", |conn| data.save(conn))
    }

    pub fn verify_recovery_answer(&self, answer: &str) -> Result<bool, AppError> {
        let recovery = with_connection(&self.db, "load recovery data", RecoveryData::load)?;
        Ok(recovery.is_some_and(|data| data.matches(answer)))
    }
}
