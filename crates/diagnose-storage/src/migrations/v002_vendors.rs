//! Local vendor table snapshot.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vendors (
    domain TEXT PRIMARY KEY,
    vendor_id TEXT NOT NULL,
    iab_id INTEGER
) STRICT, WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS vendor_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version TEXT NOT NULL,
    stored_at INTEGER NOT NULL
) STRICT;
"#;
