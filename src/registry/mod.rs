use crate::constants::KEY_LOCKED_APPS;
use crate::db::{kv, with_connection, Database};
use crate::error::AppError;
use crate::models::LockedAppSet;
use crate::native::DetectionLayer;
use crate::validation::validate_package_name;
use log::{error, info, warn};
use std::sync::{Arc, Mutex};

/// Owns the set of protected packages.
///
/// The persisted record is the source of truth: every mutation is written
/// first and then pushed to the detection layer. A failed push is logged and
/// does not roll the write back; the next `load` re-pushes.
pub struct LockedAppRegistry {
    db: Arc<Mutex<Database>>,
    detection: Arc<dyn DetectionLayer>,
    host_package: String,
    apps: LockedAppSet,
}

impl LockedAppRegistry {
    pub fn new(
        db: Arc<Mutex<Database>>,
        detection: Arc<dyn DetectionLayer>,
        host_package: &str,
    ) -> Self {
        Self {
            db,
            detection,
            host_package: host_package.to_string(),
            apps: LockedAppSet::new(),
        }
    }

    /// Read the persisted set, healing corrupt payloads, and push it.
    pub fn load(&mut self) -> LockedAppSet {
        let stored = with_connection(&self.db, "load locked apps", |conn| {
            kv::get(conn, KEY_LOCKED_APPS)
        });

        let apps = match stored {
            Ok(Some(payload)) => match LockedAppSet::from_stored(&payload, &self.host_package) {
                Ok(apps) => apps,
                Err(e) => {
                    warn!("Locked app list is corrupt ({e}), resetting to empty");
                    self.discard_stored();
                    LockedAppSet::new()
                }
            },
            Ok(None) => LockedAppSet::new(),
            // Storage unavailable: degrade to nothing locked rather than fail startup.
            Err(_) => LockedAppSet::new(),
        };

        info!("Loaded {} locked app(s)", apps.len());
        self.apps = apps;
        self.push();
        self.apps.clone()
    }

    /// Persist `apps` and push it to the detection layer. Both steps are best-effort.
    pub fn replace(&mut self, apps: LockedAppSet) {
        let apps = LockedAppSet::from_packages(apps, &self.host_package);

        match apps.to_stored() {
            Ok(payload) => {
                // with_connection already logs the failure
                let _ = with_connection(&self.db, "save locked apps", |conn| {
                    kv::set(conn, KEY_LOCKED_APPS, &payload)
                });
            }
            Err(e) => error!("Failed to encode locked apps: {e}"),
        }

        self.apps = apps;
        self.push();
    }

    /// Protect one more package. Returns false if it was already protected.
    pub fn add(&mut self, package_name: &str) -> Result<bool, AppError> {
        let package_name = validate_package_name(package_name)?;
        if package_name == self.host_package {
            return Err(AppError::InvalidInput {
                field: "package_name",
                reason: "cannot lock the app locker itself".into(),
            });
        }
        if self.apps.contains(package_name) {
            return Ok(false);
        }
        let mut apps = self.apps.clone();
        apps.insert(package_name);
        self.replace(apps);
        Ok(true)
    }

    /// Stop protecting a package. Returns false if it was not protected.
    pub fn remove(&mut self, package_name: &str) -> bool {
        if !self.apps.contains(package_name) {
            return false;
        }
        let mut apps = self.apps.clone();
        apps.remove(package_name);
        self.replace(apps);
        true
    }

    pub fn clear(&mut self) {
        self.replace(LockedAppSet::new());
    }

    /// Adopt an empty set after the stored record was wiped elsewhere, and push it.
    pub fn forget_all(&mut self) {
        self.apps = LockedAppSet::new();
        self.push();
    }

    pub fn contains(&self, package_name: &str) -> bool {
        self.apps.contains(package_name)
    }

    pub fn apps(&self) -> &LockedAppSet {
        &self.apps
    }

    fn discard_stored(&self) {
        let _ = with_connection(&self.db, "discard corrupt locked apps", |conn| {
            kv::remove(conn, KEY_LOCKED_APPS)
        });
    }

    fn push(&self) {
        if let Err(e) = self.detection.set_locked_packages(&self.apps.to_vec()) {
            error!("Failed to push locked apps to detection layer: {e}");
        }
    }
}
