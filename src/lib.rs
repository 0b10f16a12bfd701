pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod native;
pub mod native_host;
pub mod orchestrator;
pub mod permission;
pub mod registry;
pub mod unlock;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use config::AppLockConfig;
pub use error::AppError;
pub use orchestrator::{LockOrchestrator, OrchestratorState, OverlayChange};
