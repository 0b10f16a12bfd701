//! Native messaging host for AppLock.
//!
//! This binary runs the lock core as a standalone process for the platform shell.
//! It communicates via stdin/stdout using length-prefixed JSON frames; logs go to stderr.

use applock_lib::config::{AppLockConfig, ENV_PENDING_LOCKED_APP};
use applock_lib::db::{migrations, Database};
use applock_lib::error::AppError;
use applock_lib::models::LockEvent;
use applock_lib::native_host::NativeHost;
use log::{error, info, warn};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "applock_lib=info,applock_native_host=info";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // stdout carries protocol frames
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn open_database(config: &AppLockConfig) -> Result<Database, AppError> {
    let db_path = config.resolve_db_path()?;
    info!("Using database at {}", db_path.display());
    let db = Database::open(&db_path)?;
    migrations::run(db.connection())?;
    Ok(db)
}

/// A lock event captured before this process started, handed over by the shell.
fn pending_from_env() -> Option<LockEvent> {
    let raw = std::env::var(ENV_PENDING_LOCKED_APP).ok()?;
    match serde_json::from_str::<LockEvent>(&raw) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Ignoring malformed {ENV_PENDING_LOCKED_APP}: {e}");
            None
        }
    }
}

fn main() -> ExitCode {
    init_logging();

    let config = AppLockConfig::from_env();
    let db = match open_database(&config) {
        Ok(db) => db,
        Err(e) => {
            error!("Initialization error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let host = NativeHost::new(Arc::new(Mutex::new(db)), &config);

    // EOF is expected when the shell closes the connection
    match host.run(pending_from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            info!("Shell closed the connection");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Native host error: {e}");
            ExitCode::FAILURE
        }
    }
}
