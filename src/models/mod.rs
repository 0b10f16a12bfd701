pub mod lock_event;
pub mod locked_apps;
pub mod recovery;
pub mod setup;

pub use lock_event::{display_name_for, LockEvent, LockedAppInfo};
pub use locked_apps::LockedAppSet;
pub use recovery::RecoveryData;
