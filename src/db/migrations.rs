use log::debug;
use rusqlite::{params, Connection, Result};
use super::schema::{SCHEMA, SCHEMA_VERSION};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    record_version(conn)?;
    if let Some(version) = current_version(conn)? {
        debug!("Database schema at version {version}");
    }
    Ok(())
}

fn record_version(conn: &Connection) -> Result<()> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM schema_version WHERE version = ?1",
        params![SCHEMA_VERSION],
        |row| row.get(0),
    )?;

    if count == 0 {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// Highest schema version applied to this database, if any.
pub fn current_version(conn: &Connection) -> Result<Option<i32>> {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
}
