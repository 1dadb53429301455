//! Dependency persistence

use rusqlite::{params, Connection};
use tracing::debug;

use super::{check_update, read_error, write_error, DbProxy, Dimension, ProxyError};
use crate::model::{Dependency, DependencyParameters, NamedCollection};

/// All dependencies, keyed by `environment/depender/dependee/dependency`
pub fn get_dependencies(
    conn: &Connection,
    constraint_id: Option<i64>,
) -> Result<NamedCollection<Dependency>, ProxyError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, environment_name, depender, dependee, dependency_type, dependency, rationale, version
             FROM dependencies WHERE (?1 IS NULL OR id = ?1)
             ORDER BY environment_name, depender, dependee, dependency",
        )
        .map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![constraint_id], |row| {
            Ok(Dependency {
                id: row.get(0)?,
                environment_name: row.get(1)?,
                depender: row.get(2)?,
                dependee: row.get(3)?,
                dependency_type: row.get(4)?,
                dependency: row.get(5)?,
                rationale: row.get(6)?,
                version: Some(row.get(7)?),
            })
        })
        .map_err(|e| read_error("Query failed", e))?;

    let dependencies = rows
        .collect::<Result<NamedCollection<Dependency>, _>>()
        .map_err(|e| read_error("Row parse failed", e))?;

    debug!(count = dependencies.len(), "Loaded dependencies");
    Ok(dependencies)
}

pub fn add_dependency(conn: &Connection, params: &DependencyParameters) -> Result<i64, ProxyError> {
    let key = format!(
        "{}/{}/{}/{}",
        params.environment_name(),
        params.depender(),
        params.dependee(),
        params.dependency()
    );

    conn.execute(
        "INSERT INTO dependencies (
            environment_name, depender, dependee, dependency_type, dependency, rationale
        ) VALUES (?, ?, ?, ?, ?, ?)",
        params![
            params.environment_name(),
            params.depender(),
            params.dependee(),
            params.dependency_type(),
            params.dependency(),
            params.rationale(),
        ],
    )
    .map_err(|e| write_error(Dimension::Dependency, &key, e))?;

    Ok(conn.last_insert_rowid())
}

pub fn update_dependency(conn: &Connection, params: &DependencyParameters) -> Result<(), ProxyError> {
    let dependency_id = params
        .id()
        .ok_or_else(|| ProxyError::RuleViolation("dependency update requires an id".into()))?;

    let changes = conn
        .execute(
            "UPDATE dependencies SET
                environment_name = ?1, depender = ?2, dependee = ?3,
                dependency_type = ?4, dependency = ?5, rationale = ?6,
                version = version + 1
             WHERE id = ?7 AND (?8 IS NULL OR version = ?8)",
            params![
                params.environment_name(),
                params.depender(),
                params.dependee(),
                params.dependency_type(),
                params.dependency(),
                params.rationale(),
                dependency_id,
                params.expected_version(),
            ],
        )
        .map_err(|e| write_error(Dimension::Dependency, params.dependency(), e))?;

    check_update(
        conn,
        Dimension::Dependency,
        "dependencies",
        dependency_id,
        params.expected_version(),
        changes,
    )
}

/// Delete a dependency, checking it still has the dependum type the caller saw
pub fn delete_dependency(conn: &Connection, dependency_id: i64, dependency_type: &str) -> Result<(), ProxyError> {
    let changes = conn
        .execute(
            "DELETE FROM dependencies WHERE id = ? AND dependency_type = ?",
            params![dependency_id, dependency_type],
        )
        .map_err(|e| write_error(Dimension::Dependency, &dependency_id.to_string(), e))?;

    if changes == 0 {
        return Err(ProxyError::RuleViolation(format!(
            "{} dependency {} does not exist",
            dependency_type, dependency_id
        )));
    }
    Ok(())
}

/// Delete every `(id, dependency_type)` pair in one transaction
pub fn delete_dependencies(conn: &mut Connection, targets: &[(i64, String)]) -> Result<usize, ProxyError> {
    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    for (dependency_id, dependency_type) in targets {
        delete_dependency(&tx, *dependency_id, dependency_type)?;
    }

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(targets.len())
}

impl DbProxy {
    pub fn get_dependencies(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Dependency>, ProxyError> {
        self.with_conn(|conn| get_dependencies(conn, constraint_id))
    }

    pub fn add_dependency(&self, params: &DependencyParameters) -> Result<i64, ProxyError> {
        self.with_conn(|conn| add_dependency(conn, params))
    }

    pub fn update_dependency(&self, params: &DependencyParameters) -> Result<(), ProxyError> {
        self.with_conn(|conn| update_dependency(conn, params))
    }

    pub fn delete_dependency(&self, dependency_id: i64, dependency_type: &str) -> Result<(), ProxyError> {
        self.with_conn(|conn| delete_dependency(conn, dependency_id, dependency_type))
    }

    pub fn delete_dependencies(&self, targets: &[(i64, String)]) -> Result<usize, ProxyError> {
        self.with_conn_mut(|conn| delete_dependencies(conn, targets))
    }
}
