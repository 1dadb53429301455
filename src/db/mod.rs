//! SQLite persistence handle
//!
//! `DbProxy` is the only component that talks SQL. The DAO layer calls it
//! per entity type (`get_*`, `add_*`, `update_*`, `delete_*`, `name_check`)
//! and translates its typed `ProxyError`s into `CairisError`s.
//!
//! ## Tables
//!
//! - `assets`, `asset_environments` - assets and their per-environment
//!   security property vectors
//! - `environments`, `environment_composites`, `environment_tensions`
//! - `goals`, `goal_environments`
//! - `dependencies` - unique on (environment, depender, dependee, dependency)
//! - `value_types` - asset types and asset values, unique per kind and scope
//!
//! Every entity row carries a `version` that updates bump; an update that
//! names an expected version only writes when it still matches.

pub mod schema;
pub mod assets;
pub mod environments;
pub mod goals;
pub mod dependencies;
pub mod value_types;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::DependencyKey;

/// Named dimensions known to `name_check` and `get_dimension_names`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Asset,
    Environment,
    Goal,
    AssetType,
    AssetValue,
    Dependency,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Environment => "environment",
            Self::Goal => "goal",
            Self::AssetType => "asset_type",
            Self::AssetValue => "asset_value",
            Self::Dependency => "dependency",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by the persistence handle
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("The {dimension} name {name} already exists")]
    AlreadyExists { dimension: Dimension, name: String },

    #[error("Row {id} was modified concurrently (expected version {expected})")]
    VersionMismatch { id: i64, expected: i64 },

    #[error("{0}")]
    RuleViolation(String),

    #[error("{0}")]
    Connection(String),

    #[error("Stored data could not be decoded: {0}")]
    Corrupt(String),
}

/// Map a rusqlite error raised while touching `dimension` rows
///
/// UNIQUE violations become `AlreadyExists`, other constraint failures
/// `RuleViolation`, anything else is a connection-level failure.
pub(crate) fn write_error(dimension: Dimension, name: &str, err: rusqlite::Error) -> ProxyError {
    match err.sqlite_error() {
        Some(e) if e.code == ErrorCode::ConstraintViolation => {
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                ProxyError::AlreadyExists {
                    dimension,
                    name: name.to_string(),
                }
            } else {
                ProxyError::RuleViolation(format!("{} {}: {}", dimension, name, err))
            }
        }
        _ => ProxyError::Connection(format!("{} {}: {}", dimension, name, err)),
    }
}

/// Map a rusqlite error raised by a read
pub(crate) fn read_error(context: &str, err: rusqlite::Error) -> ProxyError {
    ProxyError::Connection(format!("{}: {}", context, err))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ProxyError> {
    serde_json::to_string(value).map_err(|e| ProxyError::Corrupt(e.to_string()))
}

pub(crate) fn from_json<T: DeserializeOwned>(column: &str, text: &str) -> Result<T, ProxyError> {
    serde_json::from_str(text).map_err(|e| ProxyError::Corrupt(format!("{}: {}", column, e)))
}

/// Settle a versioned `UPDATE` that touched `changes` rows
pub(crate) fn check_update(
    conn: &Connection,
    dimension: Dimension,
    table: &str,
    id: i64,
    expected_version: Option<i64>,
    changes: usize,
) -> Result<(), ProxyError> {
    if changes > 0 {
        return Ok(());
    }

    let exists = conn
        .query_row(&format!("SELECT 1 FROM {} WHERE id = ?", table), params![id], |_| Ok(()))
        .is_ok();

    match expected_version {
        Some(expected) if exists => Err(ProxyError::VersionMismatch { id, expected }),
        _ => Err(ProxyError::RuleViolation(format!("{} {} does not exist", dimension, id))),
    }
}

/// SQLite-backed persistence handle for one session
pub struct DbProxy {
    conn: Mutex<Connection>,
}

impl DbProxy {
    /// Open or create the database file
    pub fn open(db_path: &Path) -> Result<Self, ProxyError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)
            .map_err(|e| ProxyError::Connection(format!("Failed to open SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;")
            .map_err(|e| ProxyError::Connection(format!("Failed to set PRAGMA: {}", e)))?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, ProxyError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| ProxyError::Connection(format!("Failed to open in-memory SQLite: {}", e)))?;

        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, ProxyError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| ProxyError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ProxyError>
    where
        F: FnOnce(&Connection) -> Result<T, ProxyError>,
    {
        let conn = self.conn.lock()
            .map_err(|e| ProxyError::Connection(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, ProxyError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ProxyError>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| ProxyError::Connection(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Release the connection after a failed operation
    ///
    /// Rolls back any transaction left open so the next call on this
    /// session starts from a clean state. A poisoned lock is recovered.
    pub fn reset(&self) {
        let conn = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Recovering poisoned connection lock");
                self.conn.clear_poison();
                poisoned.into_inner()
            }
        };

        if !conn.is_autocommit() {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Rollback during connection reset failed");
            } else {
                debug!("Rolled back open transaction");
            }
        }
    }

    /// Fail with `AlreadyExists` when `name` is taken within `dimension`
    pub fn name_check(&self, name: &str, dimension: Dimension) -> Result<(), ProxyError> {
        self.with_conn(|conn| {
            let sql = match dimension {
                Dimension::Asset => "SELECT COUNT(*) FROM assets WHERE name = ?1",
                Dimension::Environment => "SELECT COUNT(*) FROM environments WHERE name = ?1",
                Dimension::Goal => "SELECT COUNT(*) FROM goals WHERE name = ?1",
                Dimension::AssetType => "SELECT COUNT(*) FROM value_types WHERE kind = 'asset_type' AND name = ?1",
                Dimension::AssetValue => "SELECT COUNT(*) FROM value_types WHERE kind = 'asset_value' AND name = ?1",
                Dimension::Dependency => {
                    "SELECT COUNT(*) FROM dependencies
                     WHERE environment_name = ?1 AND depender = ?2 AND dependee = ?3 AND dependency = ?4"
                }
            };

            let count: i64 = match dimension {
                // Compare segment by segment; a key without four segments names nothing
                Dimension::Dependency => match DependencyKey::parse(name) {
                    Some(key) => conn.query_row(
                        sql,
                        params![key.environment, key.depender, key.dependee, key.dependency],
                        |row| row.get(0),
                    ),
                    None => Ok(0),
                },
                _ => conn.query_row(sql, params![name], |row| row.get(0)),
            }
            .map_err(|e| read_error("Name check failed", e))?;

            if count > 0 {
                Err(ProxyError::AlreadyExists {
                    dimension,
                    name: name.to_string(),
                })
            } else {
                Ok(())
            }
        })
    }

    /// Sorted, distinct names within a dimension
    pub fn get_dimension_names(&self, dimension: Dimension) -> Result<Vec<String>, ProxyError> {
        self.with_conn(|conn| {
            let sql = match dimension {
                Dimension::Asset => "SELECT name FROM assets ORDER BY name",
                Dimension::Environment => "SELECT name FROM environments ORDER BY name",
                Dimension::Goal => "SELECT name FROM goals ORDER BY name",
                Dimension::AssetType => "SELECT DISTINCT name FROM value_types WHERE kind = 'asset_type' ORDER BY name",
                Dimension::AssetValue => "SELECT DISTINCT name FROM value_types WHERE kind = 'asset_value' ORDER BY name",
                Dimension::Dependency => {
                    "SELECT environment_name || '/' || depender || '/' || dependee || '/' || dependency
                     FROM dependencies ORDER BY 1"
                }
            };

            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| read_error("Prepare failed", e))?;

            let names = stmt
                .query_map([], |row| row.get(0))
                .map_err(|e| read_error("Query failed", e))?
                .collect::<Result<Vec<String>, _>>()
                .map_err(|e| read_error("Row parse failed", e))?;

            Ok(names)
        })
    }

    pub fn stats(&self) -> Result<DbStats, ProxyError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64, ProxyError> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get::<_, i64>(0))
                    .map(|n| n as u64)
                    .map_err(|e| read_error("Query failed", e))
            };

            Ok(DbStats {
                asset_count: count("assets")?,
                environment_count: count("environments")?,
                goal_count: count("goals")?,
                dependency_count: count("dependencies")?,
                value_type_count: count("value_types")?,
            })
        })
    }
}

/// Row counts per entity table
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub asset_count: u64,
    pub environment_count: u64,
    pub goal_count: u64,
    pub dependency_count: u64,
    pub value_type_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, AssetParameters, Dependency, DependencyParameters};

    #[test]
    fn test_name_check_detects_existing() {
        let db = DbProxy::open_in_memory().unwrap();
        assert!(db.name_check("ServerA", Dimension::Asset).is_ok());

        db.add_asset(&AssetParameters::from_asset(&Asset::new("ServerA"))).unwrap();

        let err = db.name_check("ServerA", Dimension::Asset).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::AlreadyExists { dimension: Dimension::Asset, ref name } if name == "ServerA"
        ));
        // Names are scoped per dimension
        assert!(db.name_check("ServerA", Dimension::Goal).is_ok());
    }

    #[test]
    fn test_dependency_name_check_compares_segments() {
        let db = DbProxy::open_in_memory().unwrap();
        let stored = Dependency::new("Day", "Op/x", "Admin", "goal", "Backup");
        db.add_dependency(&DependencyParameters::from_dependency(&stored)).unwrap();

        assert!(db.name_check("Day/Op/x/Admin", Dimension::Dependency).is_ok());
        assert!(db.name_check("Day/Op/x/Admin/Backup", Dimension::Dependency).is_ok());

        let plain = Dependency::new("Day", "Op", "Admin", "goal", "Backup");
        db.add_dependency(&DependencyParameters::from_dependency(&plain)).unwrap();
        assert!(matches!(
            db.name_check("Day/Op/Admin/Backup", Dimension::Dependency),
            Err(ProxyError::AlreadyExists { dimension: Dimension::Dependency, .. })
        ));
    }

    #[test]
    fn test_reset_rolls_back_open_transaction() {
        let db = DbProxy::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("BEGIN; INSERT INTO goals (name) VALUES ('half-written');")
                .map_err(|e| read_error("setup", e))
        })
        .unwrap();

        db.reset();

        let names = db.get_dimension_names(Dimension::Goal).unwrap();
        assert!(names.is_empty());
        assert!(db.with_conn(|conn| Ok(conn.is_autocommit())).unwrap());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cairis.db");
        {
            let db = DbProxy::open(&path).unwrap();
            db.add_asset(&AssetParameters::from_asset(&Asset::new("Laptop"))).unwrap();
        }

        let reopened = DbProxy::open(&path).unwrap();
        assert_eq!(reopened.get_dimension_names(Dimension::Asset).unwrap(), vec!["Laptop"]);
        assert_eq!(reopened.stats().unwrap().asset_count, 1);
    }
}
