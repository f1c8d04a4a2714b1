//! Events, dimension tables and config history.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS state_strings (
    id INTEGER PRIMARY KEY,
    value TEXT NOT NULL UNIQUE
) STRICT;

CREATE TABLE IF NOT EXISTS consent_strings (
    id INTEGER PRIMARY KEY,
    value TEXT NOT NULL UNIQUE
) STRICT;

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_time INTEGER NOT NULL,
    flags INTEGER NOT NULL,
    vendor_id TEXT,
    domain TEXT,
    consent_string_id INTEGER REFERENCES consent_strings(id),
    state_string_id INTEGER REFERENCES state_strings(id)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_events_time ON events(event_time, id);
CREATE INDEX IF NOT EXISTS idx_events_state ON events(state_string_id);
CREATE INDEX IF NOT EXISTS idx_events_consent ON events(consent_string_id);

CREATE TABLE IF NOT EXISTS config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    config_time INTEGER NOT NULL,
    config_version TEXT NOT NULL,
    value TEXT NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_config_version_time ON config(config_version, config_time);
"#;
