use crate::constants::{MAX_PACKAGE_NAME_LEN, MAX_RECOVERY_ANSWER_LEN, MAX_RECOVERY_QUESTION_LEN};
use crate::error::AppError;

/// Validate a package identifier. Returns the trimmed identifier.
pub fn validate_package_name(package_name: &str) -> Result<&str, AppError> {
    let package_name = package_name.trim();
    if package_name.is_empty() {
        return Err(AppError::InvalidInput {
            field: "package_name",
            reason: "cannot be empty".into(),
        });
    }
    if package_name.len() > MAX_PACKAGE_NAME_LEN {
        return Err(AppError::InvalidInput {
            field: "package_name",
            reason: format!("cannot exceed {MAX_PACKAGE_NAME_LEN} characters"),
        });
    }
    if package_name.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidInput {
            field: "package_name",
            reason: "cannot contain whitespace".into(),
        });
    }
    Ok(package_name)
}

/// Validate a recovery question.
pub fn validate_recovery_question(question: &str) -> Result<&str, AppError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::InvalidInput {
            field: "recovery_question",
            reason: "cannot be empty".into(),
        });
    }
    if question.len() > MAX_RECOVERY_QUESTION_LEN {
        return Err(AppError::InvalidInput {
            field: "recovery_question",
            reason: format!("cannot exceed {MAX_RECOVERY_QUESTION_LEN} characters"),
        });
    }
    Ok(question)
}

/// Validate a recovery answer.
pub fn validate_recovery_answer(answer: &str) -> Result<&str, AppError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(AppError::InvalidInput {
            field: "recovery_answer",
            reason: "cannot be empty".into(),
        });
    }
    if answer.len() > MAX_RECOVERY_ANSWER_LEN {
        return Err(AppError::InvalidInput {
            field: "recovery_answer",
            reason: format!("cannot exceed {MAX_RECOVERY_ANSWER_LEN} characters"),
        });
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_package_name_valid() {
        assert_eq!(validate_package_name("com.whatsapp").unwrap(), "com.whatsapp");
        assert_eq!(validate_package_name("  com.a  ").unwrap(), "com.a");
    }

    #[test]
    fn test_validate_package_name_empty() {
        assert!(validate_package_name("").is_err());
        assert!(validate_package_name("   ").is_err());
    }

    #[test]
    fn test_validate_package_name_whitespace_inside() {
        assert!(validate_package_name("com.what sapp").is_err());
    }

    #[test]
    fn test_validate_package_name_too_long() {
        let long = "a".repeat(MAX_PACKAGE_NAME_LEN + 1);
        assert!(validate_package_name(&long).is_err());
    }

    #[test]
    fn test_validate_recovery_question() {
        assert!(validate_recovery_question("Name of first pet?").is_ok());
        assert!(validate_recovery_question("  ").is_err());
        assert!(validate_recovery_question(&"q".repeat(MAX_RECOVERY_QUESTION_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_recovery_answer() {
        assert_eq!(validate_recovery_answer(" Rex ").unwrap(), "Rex");
        assert!(validate_recovery_answer("").is_err());
        assert!(validate_recovery_answer(&"a".repeat(MAX_RECOVERY_ANSWER_LEN + 1)).is_err());
    }
}
