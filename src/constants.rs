// src/constants.rs

/// Package identifier the host application runs under.
pub const DEFAULT_HOST_PACKAGE: &str = "com.applock";

/// Echo-absorbing window after a successful unlock, in milliseconds.
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

/// Interval between periodic permission re-checks, in seconds.
pub const DEFAULT_PERMISSION_CHECK_SECS: u64 = 5;

/// Upper bound for the permission re-check interval (one hour).
pub const MAX_PERMISSION_CHECK_SECS: u64 = 60 * 60;

/// Where the remediation prompt sends the user.
pub const DEFAULT_SETTINGS_DEEP_LINK: &str = "app-settings://accessibility";

/// Maximum package identifier length
pub const MAX_PACKAGE_NAME_LEN: usize = 255;

/// Maximum recovery question length
pub const MAX_RECOVERY_QUESTION_LEN: usize = 200;

/// Maximum recovery answer length
pub const MAX_RECOVERY_ANSWER_LEN: usize = 100;

/// Native messaging frames are capped at 1 MiB.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

// Persisted record keys
pub const KEY_LOCKED_APPS: &str = "locked_apps";
pub const KEY_RECOVERY_QUESTION: &str = "recovery_question";
pub const KEY_RECOVERY_ANSWER: &str = "recovery_answer";
pub const KEY_SETUP_COMPLETE: &str = "setup_complete";
