use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Native call '{action}' failed: {reason}")]
    Native { action: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Shorthand for a failed fire-and-forget native action.
    pub fn native(action: &'static str, reason: impl Into<String>) -> Self {
        Self::Native {
            action,
            reason: reason.into(),
        }
    }
}

// For protocol replies - converts AppError to String
impl From<AppError> for String {
    fn from(e: AppError) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_message_names_action() {
        let err = AppError::native("relaunch", "activity not found");
        assert_eq!(err.to_string(), "Native call 'relaunch' failed: activity not found");
    }

    #[test]
    fn test_invalid_input_converts_to_string() {
        let message: String = AppError::InvalidInput {
            field: "package_name",
            reason: "cannot be empty".into(),
        }
        .into();
        assert_eq!(message, "Invalid package_name: cannot be empty");
    }
}
