pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY NOT NULL
);
";

/// Bumped whenever `SCHEMA` changes shape.
pub const SCHEMA_VERSION: i32 = 1;
