//! Asset persistence

use rusqlite::{params, Connection, Row, Transaction};
use tracing::debug;

use super::{check_update, from_json, read_error, to_json, write_error, DbProxy, Dimension, ProxyError};
use crate::model::{
    Asset, AssetAssociation, AssetEnvironmentProperties, AssetInterface, AssetParameters,
    NamedCollection, ATTRIBUTE_COUNT,
};

const ASSET_COLUMNS: &str = "id, name, short_code, description, significance, asset_type,
    is_critical, critical_rationale, tags_json, interfaces_json, version";

fn asset_from_row(row: &Row) -> Result<(Asset, String, String), rusqlite::Error> {
    let mut asset = Asset::new(row.get::<_, String>("name")?);
    asset.id = row.get("id")?;
    asset.short_code = row.get("short_code")?;
    asset.description = row.get("description")?;
    asset.significance = row.get("significance")?;
    asset.asset_type = row.get("asset_type")?;
    asset.is_critical = row.get::<_, i64>("is_critical")? != 0;
    asset.critical_rationale = row.get("critical_rationale")?;
    asset.version = Some(row.get("version")?);
    Ok((asset, row.get("tags_json")?, row.get("interfaces_json")?))
}

fn load_environment_properties(
    conn: &Connection,
    asset_id: i64,
) -> Result<Vec<AssetEnvironmentProperties>, ProxyError> {
    let mut stmt = conn
        .prepare(
            "SELECT environment_name, properties_json, rationale_json, associations_json
             FROM asset_environments WHERE asset_id = ? ORDER BY position",
        )
        .map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![asset_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(|e| read_error("Query failed", e))?;

    let mut props = vec![];
    for row in rows {
        let (environment_name, properties, rationale, associations) =
            row.map_err(|e| read_error("Row parse failed", e))?;
        props.push(AssetEnvironmentProperties {
            environment_name,
            properties: from_json::<[i32; ATTRIBUTE_COUNT]>("properties_json", &properties)?,
            rationale: from_json::<[String; ATTRIBUTE_COUNT]>("rationale_json", &rationale)?,
            associations: from_json::<Vec<AssetAssociation>>("associations_json", &associations)?,
        });
    }

    Ok(props)
}

/// All assets, or only the asset with `constraint_id`
pub fn get_assets(conn: &Connection, constraint_id: Option<i64>) -> Result<NamedCollection<Asset>, ProxyError> {
    let sql = format!(
        "SELECT {} FROM assets WHERE (?1 IS NULL OR id = ?1) ORDER BY name",
        ASSET_COLUMNS
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| read_error("Prepare failed", e))?;

    let rows = stmt
        .query_map(params![constraint_id], asset_from_row)
        .map_err(|e| read_error("Query failed", e))?;

    let mut assets = NamedCollection::new();
    for row in rows {
        let (asset, tags, interfaces) = row.map_err(|e| read_error("Row parse failed", e))?;
        let mut asset = asset;
        asset.tags = from_json::<Vec<String>>("tags_json", &tags)?;
        asset.interfaces = from_json::<Vec<AssetInterface>>("interfaces_json", &interfaces)?;
        let props = load_environment_properties(conn, asset.id)?;
        assets.insert(asset.with_environment_properties(props));
    }

    debug!(count = assets.len(), "Loaded assets");
    Ok(assets)
}

fn write_environment_properties(
    tx: &Transaction,
    asset_id: i64,
    params: &AssetParameters,
) -> Result<(), ProxyError> {
    tx.execute("DELETE FROM asset_environments WHERE asset_id = ?", params![asset_id])
        .map_err(|e| write_error(Dimension::Asset, params.name(), e))?;

    for (position, prop) in params.environment_properties().iter().enumerate() {
        tx.execute(
            "INSERT INTO asset_environments (
                asset_id, position, environment_name, properties_json, rationale_json, associations_json
            ) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                asset_id,
                position as i64,
                prop.environment_name,
                to_json(&prop.properties)?,
                to_json(&prop.rationale)?,
                to_json(&prop.associations)?,
            ],
        )
        .map_err(|e| {
            ProxyError::RuleViolation(format!(
                "asset {} environment {}: {}",
                params.name(),
                prop.environment_name,
                e
            ))
        })?;
    }

    Ok(())
}

pub fn add_asset(conn: &mut Connection, params: &AssetParameters) -> Result<i64, ProxyError> {
    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    tx.execute(
        "INSERT INTO assets (
            name, short_code, description, significance, asset_type,
            is_critical, critical_rationale, tags_json, interfaces_json
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            params.name(),
            params.short_code(),
            params.description(),
            params.significance(),
            params.asset_type(),
            params.is_critical() as i64,
            params.critical_rationale(),
            to_json(params.tags())?,
            to_json(params.interfaces())?,
        ],
    )
    .map_err(|e| write_error(Dimension::Asset, params.name(), e))?;

    let asset_id = tx.last_insert_rowid();
    write_environment_properties(&tx, asset_id, params)?;

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(asset_id)
}

pub fn update_asset(conn: &mut Connection, params: &AssetParameters) -> Result<(), ProxyError> {
    let asset_id = params
        .id()
        .ok_or_else(|| ProxyError::RuleViolation("asset update requires an id".into()))?;

    let tx = conn.transaction()
        .map_err(|e| read_error("Transaction failed", e))?;

    let changes = tx
        .execute(
            "UPDATE assets SET
                name = ?1, short_code = ?2, description = ?3, significance = ?4, asset_type = ?5,
                is_critical = ?6, critical_rationale = ?7, tags_json = ?8, interfaces_json = ?9,
                version = version + 1
             WHERE id = ?10 AND (?11 IS NULL OR version = ?11)",
            params![
                params.name(),
                params.short_code(),
                params.description(),
                params.significance(),
                params.asset_type(),
                params.is_critical() as i64,
                params.critical_rationale(),
                to_json(params.tags())?,
                to_json(params.interfaces())?,
                asset_id,
                params.expected_version(),
            ],
        )
        .map_err(|e| write_error(Dimension::Asset, params.name(), e))?;

    check_update(&tx, Dimension::Asset, "assets", asset_id, params.expected_version(), changes)?;
    write_environment_properties(&tx, asset_id, params)?;

    tx.commit()
        .map_err(|e| read_error("Commit failed", e))?;

    Ok(())
}

pub fn delete_asset(conn: &mut Connection, asset_id: i64) -> Result<(), ProxyError> {
    let changes = conn
        .execute("DELETE FROM assets WHERE id = ?", params![asset_id])
        .map_err(|e| write_error(Dimension::Asset, &asset_id.to_string(), e))?;

    if changes == 0 {
        return Err(ProxyError::RuleViolation(format!("asset {} does not exist", asset_id)));
    }
    Ok(())
}

impl DbProxy {
    pub fn get_assets(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Asset>, ProxyError> {
        self.with_conn(|conn| get_assets(conn, constraint_id))
    }

    pub fn add_asset(&self, params: &AssetParameters) -> Result<i64, ProxyError> {
        self.with_conn_mut(|conn| add_asset(conn, params))
    }

    pub fn update_asset(&self, params: &AssetParameters) -> Result<(), ProxyError> {
        self.with_conn_mut(|conn| update_asset(conn, params))
    }

    pub fn delete_asset(&self, asset_id: i64) -> Result<(), ProxyError> {
        self.with_conn_mut(|conn| delete_asset(conn, asset_id))
    }
}
