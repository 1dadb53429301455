//! Goal persistence

use rusqlite::{params, Connection, Transaction};
use tracing::debug;

use super::{check_update, from_json, read_error, to_json, write_error, DbProxy, Dimension, ProxyError};
use crate::model::{Goal, GoalEnvironmentProperties, GoalParameters, NamedCollection};

fn load_environment_properties(
    conn: &Connection,
    goal_id: i64,
) -> Result<Vec<GoalEnvironmentProperties>, ProxyError> {
    let mut stmt = conn
        .prepare("SELECT properties_json FROM goal_environments WHERE goal_id = ? ORDER BY position")
        .map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![goal_id], |row| row.get::<_, String>(0))
        .map_err(|e| read_error("Query failed", e))?;

    let mut props = vec![];
    for row in rows {
        let json = row.map_err(|e| read_error("Row parse failed", e))?;
        props.push(from_json::<GoalEnvironmentProperties>("properties_json", &json)?);
    }
    Ok(props)
}

/// All goals, or only the goal with `constraint_id`
pub fn get_goals(conn: &Connection, constraint_id: Option<i64>) -> Result<NamedCollection<Goal>, ProxyError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, originator, tags_json, version
             FROM goals WHERE (?1 IS NULL OR id = ?1) ORDER BY name",
        )
        .map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![constraint_id], |row| {
            let mut goal = Goal::new(row.get::<_, String>(1)?);
            goal.id = row.get(0)?;
            goal.originator = row.get(2)?;
            goal.version = Some(row.get(4)?);
            Ok((goal, row.get::<_, String>(3)?))
        })
        .map_err(|e| read_error("Query failed", e))?;

    let mut goals = NamedCollection::new();
    for row in rows {
        let (mut goal, tags) = row.map_err(|e| read_error("Row parse failed", e))?;
        goal.tags = from_json::<Vec<String>>("tags_json", &tags)?;
        let props = load_environment_properties(conn, goal.id)?;
        goals.insert(goal.with_environment_properties(props));
    }

    debug!(count = goals.len(), "Loaded goals");
    Ok(goals)
}

fn write_environment_properties(
    tx: &Transaction,
    goal_id: i64,
    params: &GoalParameters,
) -> Result<(), ProxyError> {
    tx.execute("DELETE FROM goal_environments WHERE goal_id = ?", params![goal_id])
        .map_err(|e| write_error(Dimension::Goal, params.name(), e))?;

    for (position, prop) in params.environment_properties().iter().enumerate() {
        tx.execute(
            "INSERT INTO goal_environments (goal_id, position, environment_name, properties_json)
             VALUES (?, ?, ?, ?)",
            params![goal_id, position as i64, prop.environment_name, to_json(prop)?],
        )
        .map_err(|e| {
            ProxyError::RuleViolation(format!(
                "goal {} environment {}: {}",
                params.name(),
                prop.environment_name,
                e
            ))
        })?;
    }
    Ok(())
}

pub fn add_goal(conn: &mut Connection, params: &GoalParameters) -> Result<i64, ProxyError> {
    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    tx.execute(
        "INSERT INTO goals (name, originator, tags_json) VALUES (?, ?, ?)",
        params![params.name(), params.originator(), to_json(params.tags())?],
    )
    .map_err(|e| write_error(Dimension::Goal, params.name(), e))?;

    let goal_id = tx.last_insert_rowid();
    write_environment_properties(&tx, goal_id, params)?;

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(goal_id)
}

pub fn update_goal(conn: &mut Connection, params: &GoalParameters) -> Result<(), ProxyError> {
    let goal_id = params
        .id()
        .ok_or_else(|| ProxyError::RuleViolation("goal update requires an id".into()))?;

    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    let changes = tx
        .execute(
            "UPDATE goals SET name = ?1, originator = ?2, tags_json = ?3, version = version + 1
             WHERE id = ?4 AND (?5 IS NULL OR version = ?5)",
            params![
                params.name(),
                params.originator(),
                to_json(params.tags())?,
                goal_id,
                params.expected_version(),
            ],
        )
        .map_err(|e| write_error(Dimension::Goal, params.name(), e))?;

    check_update(&tx, Dimension::Goal, "goals", goal_id, params.expected_version(), changes)?;
    write_environment_properties(&tx, goal_id, params)?;

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(())
}

pub fn delete_goal(conn: &mut Connection, goal_id: i64) -> Result<(), ProxyError> {
    let changes = conn
        .execute("DELETE FROM goals WHERE id = ?", params![goal_id])
        .map_err(|e| write_error(Dimension::Goal, &goal_id.to_string(), e))?;

    if changes == 0 {
        return Err(ProxyError::RuleViolation(format!("goal {} does not exist", goal_id)));
    }
    Ok(())
}

impl DbProxy {
    pub fn get_goals(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Goal>, ProxyError> {
        self.with_conn(|conn| get_goals(conn, constraint_id))
    }

    pub fn add_goal(&self, params: &GoalParameters) -> Result<i64, ProxyError> {
        self.with_conn_mut(|conn| add_goal(conn, params))
    }

    pub fn update_goal(&self, params: &GoalParameters) -> Result<(), ProxyError> {
        self.with_conn_mut(|conn| update_goal(conn, params))
    }

    pub fn delete_goal(&self, goal_id: i64) -> Result<(), ProxyError> {
        self.with_conn_mut(|conn| delete_goal(conn, goal_id))
    }
}
