//! Environment persistence

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use super::{check_update, read_error, write_error, DbProxy, Dimension, ProxyError};
use crate::model::{
    Environment, EnvironmentParameters, NamedCollection, SecurityLevel, Tension, TensionKey, ValueTypeKind,
};

fn load_composites(conn: &Connection, environment_id: i64) -> Result<Vec<String>, ProxyError> {
    let mut stmt = conn
        .prepare("SELECT sub_environment FROM environment_composites WHERE environment_id = ? ORDER BY position")
        .map_err(|e| read_error("Prepare failed", e))?;

    let names = stmt
        .query_map(params![environment_id], |row| row.get(0))
        .map_err(|e| read_error("Query failed", e))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| read_error("Row parse failed", e))?;

    Ok(names)
}

fn load_tensions(conn: &Connection, environment_id: i64) -> Result<BTreeMap<TensionKey, Tension>, ProxyError> {
    let mut stmt = conn
        .prepare(
            "SELECT base_attr_id, attr_id, value, rationale
             FROM environment_tensions WHERE environment_id = ?",
        )
        .map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![environment_id], |row| {
            Ok((
                (row.get::<_, i32>(0)?, row.get::<_, i32>(1)?),
                Tension::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?),
            ))
        })
        .map_err(|e| read_error("Query failed", e))?;

    let mut tensions = BTreeMap::new();
    for row in rows {
        let (key, tension) = row.map_err(|e| read_error("Row parse failed", e))?;
        tensions.insert(key, tension);
    }
    Ok(tensions)
}

/// All environments, or only the environment with `constraint_id`
pub fn get_environments(
    conn: &Connection,
    constraint_id: Option<i64>,
) -> Result<NamedCollection<Environment>, ProxyError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, short_code, description, duplicate_property, overriding_environment, version
             FROM environments WHERE (?1 IS NULL OR id = ?1) ORDER BY name",
        )
        .map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![constraint_id], |row| {
            let mut env = Environment::new(row.get::<_, String>(1)?);
            env.id = row.get(0)?;
            env.short_code = row.get(2)?;
            env.description = row.get(3)?;
            env.duplicate_property = row.get(4)?;
            env.overriding_environment = row.get(5)?;
            env.version = Some(row.get(6)?);
            Ok(env)
        })
        .map_err(|e| read_error("Query failed", e))?;

    let mut environments = NamedCollection::new();
    for row in rows {
        let mut env = row.map_err(|e| read_error("Row parse failed", e))?;
        env.environments = load_composites(conn, env.id)?;
        env.tensions = load_tensions(conn, env.id)?;
        environments.insert(env);
    }

    debug!(count = environments.len(), "Loaded environments");
    Ok(environments)
}

fn write_children(
    tx: &Transaction,
    environment_id: i64,
    params: &EnvironmentParameters,
) -> Result<(), ProxyError> {
    tx.execute("DELETE FROM environment_composites WHERE environment_id = ?", params![environment_id])
        .map_err(|e| write_error(Dimension::Environment, params.name(), e))?;
    tx.execute("DELETE FROM environment_tensions WHERE environment_id = ?", params![environment_id])
        .map_err(|e| write_error(Dimension::Environment, params.name(), e))?;

    for (position, sub) in params.environments().iter().enumerate() {
        tx.execute(
            "INSERT INTO environment_composites (environment_id, position, sub_environment) VALUES (?, ?, ?)",
            params![environment_id, position as i64, sub],
        )
        .map_err(|e| {
            ProxyError::RuleViolation(format!("environment {} lists {} twice: {}", params.name(), sub, e))
        })?;
    }

    for ((base_attr_id, attr_id), tension) in params.tensions() {
        tx.execute(
            "INSERT INTO environment_tensions (environment_id, base_attr_id, attr_id, value, rationale)
             VALUES (?, ?, ?, ?, ?)",
            params![environment_id, base_attr_id, attr_id, tension.value, tension.rationale],
        )
        .map_err(|e| write_error(Dimension::Environment, params.name(), e))?;
    }

    Ok(())
}

/// Every environment starts with one asset value per security level
fn seed_asset_values(tx: &Transaction, environment_name: &str) -> Result<(), ProxyError> {
    for level in [SecurityLevel::None, SecurityLevel::Low, SecurityLevel::Medium, SecurityLevel::High] {
        tx.execute(
            "INSERT OR IGNORE INTO value_types (kind, environment_name, name, score) VALUES (?, ?, ?, ?)",
            params![ValueTypeKind::AssetValue.as_str(), environment_name, level.label(), level.ordinal()],
        )
        .map_err(|e| write_error(Dimension::AssetValue, level.label(), e))?;
    }
    Ok(())
}

pub fn add_environment(conn: &mut Connection, params: &EnvironmentParameters) -> Result<i64, ProxyError> {
    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    tx.execute(
        "INSERT INTO environments (name, short_code, description, duplicate_property, overriding_environment)
         VALUES (?, ?, ?, ?, ?)",
        params![
            params.name(),
            params.short_code(),
            params.description(),
            params.duplicate_property(),
            params.overriding_environment(),
        ],
    )
    .map_err(|e| write_error(Dimension::Environment, params.name(), e))?;

    let environment_id = tx.last_insert_rowid();
    write_children(&tx, environment_id, params)?;
    seed_asset_values(&tx, params.name())?;

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(environment_id)
}

pub fn update_environment(conn: &mut Connection, params: &EnvironmentParameters) -> Result<(), ProxyError> {
    let environment_id = params
        .id()
        .ok_or_else(|| ProxyError::RuleViolation("environment update requires an id".into()))?;

    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    let previous_name: Option<String> = tx
        .query_row("SELECT name FROM environments WHERE id = ?", params![environment_id], |row| row.get(0))
        .optional()
        .map_err(|e| read_error("Query failed", e))?;

    let changes = tx
        .execute(
            "UPDATE environments SET
                name = ?1, short_code = ?2, description = ?3,
                duplicate_property = ?4, overriding_environment = ?5,
                version = version + 1
             WHERE id = ?6 AND (?7 IS NULL OR version = ?7)",
            params![
                params.name(),
                params.short_code(),
                params.description(),
                params.duplicate_property(),
                params.overriding_environment(),
                environment_id,
                params.expected_version(),
            ],
        )
        .map_err(|e| write_error(Dimension::Environment, params.name(), e))?;

    check_update(
        &tx,
        Dimension::Environment,
        "environments",
        environment_id,
        params.expected_version(),
        changes,
    )?;
    write_children(&tx, environment_id, params)?;

    if let Some(previous) = previous_name.filter(|n| n != params.name()) {
        rename_references(&tx, &previous, params.name())?;
    }

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(())
}

/// Point every by-name reference at the environment's new name
fn rename_references(tx: &Transaction, previous: &str, name: &str) -> Result<(), ProxyError> {
    const RENAMES: [&str; 6] = [
        "UPDATE value_types SET environment_name = ?1 WHERE environment_name = ?2",
        "UPDATE asset_environments SET environment_name = ?1 WHERE environment_name = ?2",
        // Goal properties embed the environment name in their JSON
        "UPDATE goal_environments
         SET environment_name = ?1, properties_json = json_set(properties_json, '$.environmentName', ?1)
         WHERE environment_name = ?2",
        "UPDATE dependencies SET environment_name = ?1 WHERE environment_name = ?2",
        "UPDATE environment_composites SET sub_environment = ?1 WHERE sub_environment = ?2",
        "UPDATE environments SET overriding_environment = ?1 WHERE overriding_environment = ?2",
    ];

    for sql in RENAMES {
        tx.execute(sql, params![name, previous])
            .map_err(|e| write_error(Dimension::Environment, name, e))?;
    }

    debug!(from = previous, to = name, "Environment references renamed");
    Ok(())
}

pub fn delete_environment(conn: &mut Connection, environment_id: i64) -> Result<(), ProxyError> {
    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    tx.execute(
        "DELETE FROM value_types WHERE environment_name IN (SELECT name FROM environments WHERE id = ?)",
        params![environment_id],
    )
    .map_err(|e| write_error(Dimension::Environment, &environment_id.to_string(), e))?;

    let changes = tx
        .execute("DELETE FROM environments WHERE id = ?", params![environment_id])
        .map_err(|e| write_error(Dimension::Environment, &environment_id.to_string(), e))?;

    if changes == 0 {
        return Err(ProxyError::RuleViolation(format!(
            "environment {} does not exist",
            environment_id
        )));
    }

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(())
}

impl DbProxy {
    pub fn get_environments(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Environment>, ProxyError> {
        self.with_conn(|conn| get_environments(conn, constraint_id))
    }

    pub fn add_environment(&self, params: &EnvironmentParameters) -> Result<i64, ProxyError> {
        self.with_conn_mut(|conn| add_environment(conn, params))
    }

    pub fn update_environment(&self, params: &EnvironmentParameters) -> Result<(), ProxyError> {
        self.with_conn_mut(|conn| update_environment(conn, params))
    }

    pub fn delete_environment(&self, environment_id: i64) -> Result<(), ProxyError> {
        self.with_conn_mut(|conn| delete_environment(conn, environment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prod() -> Environment {
        let mut env = Environment::new("Prod");
        env.short_code = "PRD".into();
        env.tensions.insert((0, 1), Tension::new("High", "x"));
        env.tensions.insert((2, 3), Tension::new("Low", ""));
        env
    }

    #[test]
    fn test_add_and_load_tensions() {
        let db = DbProxy::open_in_memory().unwrap();
        let id = db.add_environment(&EnvironmentParameters::from_environment(&prod())).unwrap();

        let envs = db.get_environments(Some(id)).unwrap();
        let loaded = envs.get("Prod").unwrap();
        assert_eq!(loaded.tensions.len(), 2);
        assert_eq!(loaded.tensions[&(0, 1)], Tension::new("High", "x"));
        assert_eq!(loaded.version, Some(1));
    }

    #[test]
    fn test_composite_order_preserved() {
        let db = DbProxy::open_in_memory().unwrap();
        let mut env = Environment::new("Complete");
        env.environments = vec!["Night".into(), "Day".into()];
        db.add_environment(&EnvironmentParameters::from_environment(&env)).unwrap();

        let loaded = db.get_environments(None).unwrap().get("Complete").unwrap().clone();
        assert_eq!(loaded.environments, vec!["Night", "Day"]);
        assert!(loaded.is_composite());
    }

    #[test]
    fn test_update_replaces_tensions() {
        let db = DbProxy::open_in_memory().unwrap();
        let id = db.add_environment(&EnvironmentParameters::from_environment(&prod())).unwrap();

        let mut current = db.get_environments(None).unwrap().get("Prod").unwrap().clone();
        current.tensions.clear();
        current.tensions.insert((4, 5), Tension::new("Medium", "traffic analysis"));
        let mut params = EnvironmentParameters::from_environment(&current);
        params.set_id(id);
        db.update_environment(&params).unwrap();

        let loaded = db.get_environments(None).unwrap().get("Prod").unwrap().clone();
        assert_eq!(loaded.tensions.keys().copied().collect::<Vec<_>>(), vec![(4, 5)]);
        assert_eq!(loaded.version, Some(2));
    }

    #[test]
    fn test_duplicate_environment() {
        let db = DbProxy::open_in_memory().unwrap();
        db.add_environment(&EnvironmentParameters::from_environment(&prod())).unwrap();
        let err = db
            .add_environment(&EnvironmentParameters::from_environment(&prod()))
            .unwrap_err();
        assert_eq!(err.to_string(), "The environment name Prod already exists");
    }

    #[test]
    fn test_asset_values_follow_environment() {
        let db = DbProxy::open_in_memory().unwrap();
        let id = db.add_environment(&EnvironmentParameters::from_environment(&prod())).unwrap();

        let values = db.get_value_types(ValueTypeKind::AssetValue, "Prod").unwrap();
        assert_eq!(
            values.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            vec!["None", "Low", "Medium", "High"]
        );

        let mut renamed = db.get_environments(None).unwrap().get("Prod").unwrap().clone();
        renamed.name = "Production".into();
        let mut params = EnvironmentParameters::from_environment(&renamed);
        params.set_id(id);
        db.update_environment(&params).unwrap();
        assert!(db.get_value_types(ValueTypeKind::AssetValue, "Prod").unwrap().is_empty());
        assert_eq!(db.get_value_types(ValueTypeKind::AssetValue, "Production").unwrap().len(), 4);

        db.delete_environment(id).unwrap();
        assert!(db.get_value_types(ValueTypeKind::AssetValue, "Production").unwrap().is_empty());
    }

    #[test]
    fn test_delete_environment() {
        let db = DbProxy::open_in_memory().unwrap();
        let id = db.add_environment(&EnvironmentParameters::from_environment(&prod())).unwrap();
        db.delete_environment(id).unwrap();
        assert!(db.get_environments(None).unwrap().is_empty());
        assert!(db.delete_environment(id).is_err());
    }
}
