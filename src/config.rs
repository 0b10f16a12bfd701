use crate::constants::{
    DEFAULT_COOLDOWN_MS, DEFAULT_HOST_PACKAGE, DEFAULT_PERMISSION_CHECK_SECS,
    DEFAULT_SETTINGS_DEEP_LINK, MAX_PERMISSION_CHECK_SECS,
};
use directories::ProjectDirs;
use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const ENV_HOST_PACKAGE: &str = "APPLOCK_HOST_PACKAGE";
pub const ENV_COOLDOWN_MS: &str = "APPLOCK_COOLDOWN_MS";
pub const ENV_PERMISSION_INTERVAL_SECS: &str = "APPLOCK_PERMISSION_INTERVAL_SECS";
pub const ENV_SETTINGS_DEEP_LINK: &str = "APPLOCK_SETTINGS_DEEP_LINK";
pub const ENV_DB_PATH: &str = "APPLOCK_DB_PATH";
pub const ENV_PENDING_LOCKED_APP: &str = "APPLOCK_PENDING_LOCKED_APP";

#[derive(Debug, Clone)]
pub struct AppLockConfig {
    /// Identifier of the host app; its own foreground events are never locked.
    pub host_package: String,
    /// How long lock events are ignored after a successful unlock.
    pub cooldown: Duration,
    /// Clamped to `1..=MAX_PERMISSION_CHECK_SECS` seconds.
    pub permission_check_interval: Duration,
    /// Always an absolute URL.
    pub settings_deep_link: String,
    /// Overrides the platform data directory when set.
    pub db_path: Option<PathBuf>,
}

impl Default for AppLockConfig {
    fn default() -> Self {
        Self {
            host_package: DEFAULT_HOST_PACKAGE.to_string(),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            permission_check_interval: Duration::from_secs(DEFAULT_PERMISSION_CHECK_SECS),
            settings_deep_link: DEFAULT_SETTINGS_DEEP_LINK.to_string(),
            db_path: None,
        }
    }
}

impl AppLockConfig {
    /// Defaults with any `APPLOCK_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_HOST_PACKAGE) {
            let host = host.trim();
            if host.is_empty() {
                warn!("{ENV_HOST_PACKAGE} is empty, keeping {}", config.host_package);
            } else {
                config.host_package = host.to_string();
            }
        }
        if let Some(ms) = parse_override::<u64, _>(&lookup, ENV_COOLDOWN_MS) {
            config.cooldown = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_override::<u64, _>(&lookup, ENV_PERMISSION_INTERVAL_SECS) {
            let clamped = secs.clamp(1, MAX_PERMISSION_CHECK_SECS);
            if clamped != secs {
                warn!("{ENV_PERMISSION_INTERVAL_SECS}={secs} out of range, using {clamped}");
            }
            config.permission_check_interval = Duration::from_secs(clamped);
        }
        if let Some(link) = lookup(ENV_SETTINGS_DEEP_LINK) {
            match Url::parse(link.trim()) {
                Ok(url) => config.settings_deep_link = url.into(),
                Err(e) => warn!("Ignoring {ENV_SETTINGS_DEEP_LINK}={link}: {e}"),
            }
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }

        config
    }

    /// Resolve the database location, creating the data directory if needed.
    pub fn resolve_db_path(&self) -> std::io::Result<PathBuf> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }
        let proj_dirs = ProjectDirs::from("com", "applock", "AppLock").ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine project directories",
            )
        })?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("applock.db"))
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {key}={raw}: not a valid number");
            None
        }
    }
}
