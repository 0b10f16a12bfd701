// src/db/kv.rs
//
// Flat key/value records backing the locked-app list, recovery data and setup flag.
// Values are stored as JSON text; callers decide how to decode them.

use rusqlite::{params, Connection, OptionalExtension, Result};
use std::time::{SystemTime, UNIX_EPOCH};

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or(0)
}

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, current_timestamp()],
    )?;
    Ok(())
}

/// Deletes a record. Returns whether anything was removed.
pub fn remove(conn: &Connection, key: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
    Ok(affected > 0)
}
