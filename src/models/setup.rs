use crate::constants::KEY_SETUP_COMPLETE;
use crate::db::kv;
use log::warn;
use rusqlite::{Connection, Result};

/// Whether first-run setup (PIN + locked apps) has been completed.
pub fn is_setup_complete(conn: &Connection) -> Result<bool> {
    match kv::get(conn, KEY_SETUP_COMPLETE)? {
        Some(raw) => match serde_json::from_str::<bool>(&raw) {
            Ok(done) => Ok(done),
            Err(_) => {
                warn!("Setup flag is corrupt ({raw}), treating as incomplete");
                kv::remove(conn, KEY_SETUP_COMPLETE)?;
                Ok(false)
            }
        },
        None => Ok(false),
    }
}

pub fn set_setup_complete(conn: &Connection, done: bool) -> Result<()> {
    if done {
        kv::set(conn, KEY_SETUP_COMPLETE, "true")
    } else {
        kv::remove(conn, KEY_SETUP_COMPLETE).map(|_| ())
    }
}
