//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use super::ProxyError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), ProxyError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, ProxyError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    ).map_err(|e| ProxyError::Connection(format!("Failed to create schema_version table: {}", e)))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), ProxyError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| ProxyError::Connection(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| ProxyError::Connection(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), ProxyError> {
    conn.execute_batch(ASSETS_SCHEMA)
        .map_err(|e| ProxyError::Connection(format!("Failed to create asset tables: {}", e)))?;

    conn.execute_batch(ENVIRONMENTS_SCHEMA)
        .map_err(|e| ProxyError::Connection(format!("Failed to create environment tables: {}", e)))?;

    conn.execute_batch(GOALS_SCHEMA)
        .map_err(|e| ProxyError::Connection(format!("Failed to create goal tables: {}", e)))?;

    conn.execute_batch(DEPENDENCIES_SCHEMA)
        .map_err(|e| ProxyError::Connection(format!("Failed to create dependency tables: {}", e)))?;

    conn.execute_batch(VALUE_TYPES_SCHEMA)
        .map_err(|e| ProxyError::Connection(format!("Failed to create value type tables: {}", e)))?;

    Ok(())
}

const ASSETS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    short_code TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    significance TEXT NOT NULL DEFAULT '',
    asset_type TEXT NOT NULL DEFAULT '',
    is_critical INTEGER NOT NULL DEFAULT 0,
    critical_rationale TEXT NOT NULL DEFAULT '',
    tags_json TEXT NOT NULL DEFAULT '[]',
    interfaces_json TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL DEFAULT 1
);

-- One row per environment the asset is scoped to.
-- properties_json / rationale_json are 8-element arrays indexed by attribute id.
CREATE TABLE IF NOT EXISTS asset_environments (
    asset_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    environment_name TEXT NOT NULL,
    properties_json TEXT NOT NULL,
    rationale_json TEXT NOT NULL,
    associations_json TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (asset_id, environment_name),
    FOREIGN KEY (asset_id) REFERENCES assets(id) ON DELETE CASCADE
);
"#;

const ENVIRONMENTS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS environments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    short_code TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    duplicate_property TEXT NOT NULL DEFAULT '',
    overriding_environment TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS environment_composites (
    environment_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    sub_environment TEXT NOT NULL,
    PRIMARY KEY (environment_id, sub_environment),
    FOREIGN KEY (environment_id) REFERENCES environments(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS environment_tensions (
    environment_id INTEGER NOT NULL,
    base_attr_id INTEGER NOT NULL,
    attr_id INTEGER NOT NULL,
    value TEXT NOT NULL,
    rationale TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (environment_id, base_attr_id, attr_id),
    FOREIGN KEY (environment_id) REFERENCES environments(id) ON DELETE CASCADE
);
"#;

const GOALS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS goals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    originator TEXT NOT NULL DEFAULT '',
    tags_json TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS goal_environments (
    goal_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    environment_name TEXT NOT NULL,
    properties_json TEXT NOT NULL,
    PRIMARY KEY (goal_id, environment_name),
    FOREIGN KEY (goal_id) REFERENCES goals(id) ON DELETE CASCADE
);
"#;

const DEPENDENCIES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dependencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    environment_name TEXT NOT NULL,
    depender TEXT NOT NULL,
    dependee TEXT NOT NULL,
    dependency_type TEXT NOT NULL,
    dependency TEXT NOT NULL,
    rationale TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL DEFAULT 1,
    UNIQUE (environment_name, depender, dependee, dependency)
);

CREATE INDEX IF NOT EXISTS idx_dependencies_environment ON dependencies(environment_name);
"#;

const VALUE_TYPES_SCHEMA: &str = r#"
-- environment_name '' means the value type is global
CREATE TABLE IF NOT EXISTS value_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    environment_name TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    score INTEGER NOT NULL DEFAULT 0,
    rationale TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL DEFAULT 1,
    UNIQUE (kind, environment_name, name)
);

CREATE INDEX IF NOT EXISTS idx_value_types_kind ON value_types(kind, environment_name);
"#;
