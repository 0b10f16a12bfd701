use crate::constants::{KEY_RECOVERY_ANSWER, KEY_RECOVERY_QUESTION};
use crate::db::kv;
use log::warn;
use rusqlite::{Connection, Result};
use serde::{Deserialize, Serialize};

/// Security question used to recover from a forgotten credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryData {
    pub question: String,
    /// Stored trimmed and lowercase.
    pub answer: String,
}

impl RecoveryData {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            question: question.trim().to_string(),
            answer: normalize_answer(answer),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        !self.answer.is_empty() && self.answer == normalize_answer(candidate)
    }

    /// Load the stored pair. A missing half or an undecodable value counts as
    /// no recovery data, and undecodable values are deleted.
    pub fn load(conn: &Connection) -> Result<Option<Self>> {
        let question = kv::get(conn, KEY_RECOVERY_QUESTION)?;
        let answer = kv::get(conn, KEY_RECOVERY_ANSWER)?;

        let (Some(question), Some(answer)) = (question, answer) else {
            return Ok(None);
        };

        let decoded = serde_json::from_str::<String>(&question)
            .and_then(|q| serde_json::from_str::<String>(&answer).map(|a| (q, a)));

        match decoded {
            Ok((question, answer)) if !question.trim().is_empty() => {
                Ok(Some(Self::new(&question, &answer)))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("Recovery data is corrupt ({e}), discarding");
                Self::clear(conn)?;
                Ok(None)
            }
        }
    }

    /// Write both halves atomically.
    pub fn save(&self, conn: &Connection) -> Result<()> {
        let question = encode(&self.question)?;
        let answer = encode(&self.answer)?;

        let tx = conn.unchecked_transaction()?;
        kv::set(&tx, KEY_RECOVERY_QUESTION, &question)?;
        kv::set(&tx, KEY_RECOVERY_ANSWER, &answer)?;
        tx.commit()
    }

    pub fn clear(conn: &Connection) -> Result<()> {
        kv::remove(conn, KEY_RECOVERY_QUESTION)?;
        kv::remove(conn, KEY_RECOVERY_ANSWER)?;
        Ok(())
    }
}

pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

fn encode(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn test_answer_normalized_on_create() {
        let data = RecoveryData::new(" First pet? ", "  Rex ");
        assert_eq!(data.question, "First pet?");
        assert_eq!(data.answer, "rex");
    }

    #[test]
    fn test_matches_ignores_case_and_padding() {
        let data = RecoveryData::new("First pet?", "Rex");
        assert!(data.matches("REX"));
        assert!(data.matches(" rex\n"));
        assert!(!data.matches("max"));
    }

    #[test]
    fn test_empty_answer_never_matches() {
        let data = RecoveryData::new("q", "   ");
        assert!(!data.matches(""));
    }

    #[test]
    fn test_load_returns_none_when_unset() {
        let (db, _dir) = setup_test_db();
        assert!(RecoveryData::load(db.connection()).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();

        RecoveryData::new("First pet?", "Rex").save(conn).unwrap();

        let loaded = RecoveryData::load(conn).unwrap().unwrap();
        assert_eq!(loaded.question, "First pet?");
        assert_eq!(loaded.answer, "rex");
        assert_eq!(
            kv::get(conn, KEY_RECOVERY_ANSWER).unwrap().as_deref(),
            Some("\"rex\"")
        );
    }

    #[test]
    fn test_load_missing_answer_is_none() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();
        kv::set(conn, KEY_RECOVERY_QUESTION, "\"First pet?\"").unwrap();

        assert!(RecoveryData::load(conn).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_value_is_discarded() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();
        kv::set(conn, KEY_RECOVERY_QUESTION, "\"First pet?\"").unwrap();
        kv::set(conn, KEY_RECOVERY_ANSWER, "{broken").unwrap();

        assert!(RecoveryData::load(conn).unwrap().is_none());
        assert!(kv::get(conn, KEY_RECOVERY_QUESTION).unwrap().is_none());
        assert!(kv::get(conn, KEY_RECOVERY_ANSWER).unwrap().is_none());
    }

    #[test]
    fn test_failed_save_keeps_previous_pair() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();
        RecoveryData::new("First pet?", "Rex").save(conn).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER block_answer BEFORE UPDATE ON kv_store
             WHEN NEW.key = 'recovery_answer'
             BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
        )
        .unwrap();

        assert!(RecoveryData::new("Home town?", "Oslo").save(conn).is_err());

        let loaded = RecoveryData::load(conn).unwrap().unwrap();
        assert_eq!(loaded.question, "First pet?");
        assert_eq!(loaded.answer, "rex");
    }

    #[test]
    fn test_clear_removes_both_records() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();
        RecoveryData::new("q", "a").save(conn).unwrap();

        RecoveryData::clear(conn).unwrap();

        assert!(RecoveryData::load(conn).unwrap().is_none());
    }
}
