//! Asset type and asset value persistence

use rusqlite::{params, Connection};

use super::{check_update, read_error, write_error, DbProxy, Dimension, ProxyError};
use crate::model::{ValueType, ValueTypeKind, ValueTypeParameters};

fn dimension_of(kind: ValueTypeKind) -> Dimension {
    match kind {
        ValueTypeKind::AssetType => Dimension::AssetType,
        ValueTypeKind::AssetValue => Dimension::AssetValue,
    }
}

fn kind_from_str(kind: &str) -> Result<ValueTypeKind, ProxyError> {
    match kind {
        "asset_type" => Ok(ValueTypeKind::AssetType),
        "asset_value" => Ok(ValueTypeKind::AssetValue),
        other => Err(ProxyError::Corrupt(format!("unknown value type kind {}", other))),
    }
}

/// Value types of `kind` scoped to `environment_name` (`""` for global ones)
pub fn get_value_types(
    conn: &Connection,
    kind: ValueTypeKind,
    environment_name: &str,
) -> Result<Vec<ValueType>, ProxyError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, description, kind, environment_name, score, rationale, version
             FROM value_types WHERE kind = ? AND environment_name = ?
             ORDER BY score, name",
        )
        .map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![kind.as_str(), environment_name], |row| {
            Ok((
                ValueType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    kind,
                    environment_name: row.get(4)?,
                    score: row.get(5)?,
                    rationale: row.get(6)?,
                    version: Some(row.get(7)?),
                },
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(|e| read_error("Query failed", e))?;

    let mut value_types = vec![];
    for row in rows {
        let (mut value_type, stored_kind) = row.map_err(|e| read_error("Row parse failed", e))?;
        value_type.kind = kind_from_str(&stored_kind)?;
        value_types.push(value_type);
    }
    Ok(value_types)
}

pub fn add_value_type(conn: &Connection, params: &ValueTypeParameters) -> Result<i64, ProxyError> {
    conn.execute(
        "INSERT INTO value_types (kind, environment_name, name, description, score, rationale)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            params.kind().as_str(),
            params.environment_name(),
            params.name(),
            params.description(),
            params.score(),
            params.rationale(),
        ],
    )
    .map_err(|e| write_error(dimension_of(params.kind()), params.name(), e))?;

    Ok(conn.last_insert_rowid())
}

pub fn update_value_type(conn: &Connection, params: &ValueTypeParameters) -> Result<(), ProxyError> {
    let value_type_id = params
        .id()
        .ok_or_else(|| ProxyError::RuleViolation(format!("{} update requires an id", params.kind())))?;

    let changes = conn
        .execute(
            "UPDATE value_types SET
                name = ?1, description = ?2, score = ?3, rationale = ?4, version = version + 1
             WHERE id = ?5 AND kind = ?6 AND (?7 IS NULL OR version = ?7)",
            params![
                params.name(),
                params.description(),
                params.score(),
                params.rationale(),
                value_type_id,
                params.kind().as_str(),
                params.expected_version(),
            ],
        )
        .map_err(|e| write_error(dimension_of(params.kind()), params.name(), e))?;

    check_update(
        conn,
        dimension_of(params.kind()),
        "value_types",
        value_type_id,
        params.expected_version(),
        changes,
    )
}

pub fn delete_value_type(conn: &Connection, value_type_id: i64, kind: ValueTypeKind) -> Result<(), ProxyError> {
    let changes = conn
        .execute(
            "DELETE FROM value_types WHERE id = ? AND kind = ?",
            params![value_type_id, kind.as_str()],
        )
        .map_err(|e| write_error(dimension_of(kind), &value_type_id.to_string(), e))?;

    if changes == 0 {
        return Err(ProxyError::RuleViolation(format!("{} {} does not exist", kind, value_type_id)));
    }
    Ok(())
}

impl DbProxy {
    pub fn get_value_types(&self, kind: ValueTypeKind, environment_name: &str) -> Result<Vec<ValueType>, ProxyError> {
        self.with_conn(|conn| get_value_types(conn, kind, environment_name))
    }

    pub fn add_value_type(&self, params: &ValueTypeParameters) -> Result<i64, ProxyError> {
        self.with_conn(|conn| add_value_type(conn, params))
    }

    pub fn update_value_type(&self, params: &ValueTypeParameters) -> Result<(), ProxyError> {
        self.with_conn(|conn| update_value_type(conn, params))
    }

    pub fn delete_value_type(&self, value_type_id: i64, kind: ValueTypeKind) -> Result<(), ProxyError> {
        self.with_conn(|conn| delete_value_type(conn, value_type_id, kind))
    }
}
