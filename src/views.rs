//! View types for HTTP API boundary
//!
//! These types use camelCase serialization and are the only shapes that
//! cross the wire. Rich entities in `model` carry server-only indices
//! (`environment_index`) and storage-friendly encodings (score vectors,
//! tuple-keyed tension maps) that views flatten.
//!
//! Pattern:
//! - DAOs return rich entities
//! - `Simplify` maps a rich entity to its view for responses
//! - `TryFrom<*View>` maps a request view back to a rich entity; unknown
//!   attribute names, level labels or attribute ids are `MalformedInput`
//!
//! Request bodies use the envelope `{"object": {...}, "session_id": "..."}`.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{CairisError, Result};
use crate::model::{
    Asset, AssetAssociation, AssetEnvironmentProperties, AssetInterface, Dependency, Environment, Goal,
    GoalEnvironmentProperties, NamedCollection, SecurityAttribute, SecurityLevel, Tension, TensionKey,
    ATTRIBUTE_COUNT,
};
use crate::model::asset::UNSET_ID;

fn unset_id() -> i64 {
    UNSET_ID
}

/// Map a rich entity to its transport shape, dropping server-only indices
pub trait Simplify {
    type View: Serialize;

    fn simplify(self) -> Self::View;
}

/// Simplify every entity of a collection, keeping its keys
pub fn simplify_all<T: Simplify>(collection: NamedCollection<T>) -> BTreeMap<String, T::View> {
    collection
        .into_iter()
        .map(|(key, entity)| (key, entity.simplify()))
        .collect()
}

// ============================================================================
// Request Envelope
// ============================================================================

/// A request view and the keys its JSON object must carry
pub trait WireObject: DeserializeOwned {
    const REQUIRED: &'static [&'static str];
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub object: Value,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Parse a request body into its envelope
pub fn parse_envelope(body: &[u8]) -> Result<Envelope> {
    let json: Value = serde_json::from_slice(body)
        .map_err(|e| CairisError::MalformedInput(format!("request body is not JSON: {}", e)))?;

    if json.get("object").is_none() {
        return Err(CairisError::MalformedInput("request body has no object".into()));
    }
    Ok(serde_json::from_value(json)?)
}

/// `session_id` carried in a JSON body, if any
pub fn body_session_id(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Value>(body)
        .ok()?
        .get("session_id")?
        .as_str()
        .map(str::to_string)
}

/// Fail with `MissingParameter` listing `required` unless every key is present
pub fn check_required_keys(object: &Value, required: &[&str]) -> Result<()> {
    let map = object
        .as_object()
        .ok_or_else(|| CairisError::MalformedInput("object is not a JSON object".into()))?;

    if required.iter().all(|key| map.contains_key(*key)) {
        Ok(())
    } else {
        Err(CairisError::missing(required.iter().copied()))
    }
}

/// Decode a view from a JSON object after checking its required keys
pub fn decode_object<V: WireObject>(object: Value) -> Result<V> {
    check_required_keys(&object, V::REQUIRED)?;
    Ok(serde_json::from_value(object)?)
}

/// Decode a JSON list of views, checking each element's required keys
pub fn decode_list<V: WireObject>(object: Value) -> Result<Vec<V>> {
    match object {
        Value::Array(items) => items.into_iter().map(decode_object).collect(),
        _ => Err(CairisError::MalformedInput("object is not a JSON list".into())),
    }
}

// ============================================================================
// Asset Views
// ============================================================================

/// One security attribute score: `{name, value, rationale}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAttributeView {
    pub name: String,
    pub value: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEnvironmentPropertiesView {
    pub environment_name: String,
    pub properties: Vec<SecurityAttributeView>,
    #[serde(default)]
    pub associations: Vec<AssetAssociation>,
}

impl WireObject for AssetEnvironmentPropertiesView {
    const REQUIRED: &'static [&'static str] = &["environmentName", "properties"];
}

/// Score vector to `{name, value, rationale}` triples
///
/// Slots holding an ordinal outside the level scale are logged and skipped.
impl From<AssetEnvironmentProperties> for AssetEnvironmentPropertiesView {
    fn from(p: AssetEnvironmentProperties) -> Self {
        let mut properties = Vec::with_capacity(ATTRIBUTE_COUNT);
        for (attribute, (score, rationale)) in SecurityAttribute::ALL
            .into_iter()
            .zip(p.properties.iter().zip(p.rationale))
        {
            match SecurityLevel::from_ordinal(*score) {
                Some(level) => properties.push(SecurityAttributeView {
                    name: attribute.name().to_string(),
                    value: level.label().to_string(),
                    rationale,
                }),
                None => warn!(
                    environment = %p.environment_name,
                    attribute = %attribute,
                    score,
                    "Unable to map security property score; attribute skipped"
                ),
            }
        }

        Self {
            environment_name: p.environment_name,
            properties,
            associations: p.associations,
        }
    }
}

/// Triples back to a full 8-slot vector; unnamed attributes stay `None`,
/// an attribute named twice is rejected
impl TryFrom<AssetEnvironmentPropertiesView> for AssetEnvironmentProperties {
    type Error = CairisError;

    fn try_from(v: AssetEnvironmentPropertiesView) -> Result<Self> {
        let mut props = AssetEnvironmentProperties::new(v.environment_name);
        let mut seen = BTreeSet::new();
        for attr in v.properties {
            let attribute = SecurityAttribute::from_name(&attr.name).ok_or_else(|| {
                CairisError::MalformedInput(format!("unknown security attribute {}", attr.name))
            })?;
            if !seen.insert(attribute) {
                return Err(CairisError::MalformedInput(format!(
                    "security attribute {} given more than once",
                    attr.name
                )));
            }
            let level = SecurityLevel::from_label(&attr.value).ok_or_else(|| {
                CairisError::MalformedInput(format!("unknown security level {} for {}", attr.value, attr.name))
            })?;
            props = props.with_property(attribute, level, attr.rationale);
        }
        props.associations = v.associations;
        Ok(props)
    }
}

/// Decode a list of environment property views
pub fn props_from_views(views: Vec<AssetEnvironmentPropertiesView>) -> Result<Vec<AssetEnvironmentProperties>> {
    views.into_iter().map(AssetEnvironmentProperties::try_from).collect()
}

pub fn props_to_views(props: Vec<AssetEnvironmentProperties>) -> Vec<AssetEnvironmentPropertiesView> {
    props.into_iter().map(Into::into).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    #[serde(default = "unset_id")]
    pub id: i64,
    pub name: String,
    pub short_code: String,
    pub description: String,
    #[serde(default)]
    pub significance: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub is_critical: bool,
    #[serde(default)]
    pub critical_rationale: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<AssetInterface>,
    #[serde(default)]
    pub environment_properties: Vec<AssetEnvironmentPropertiesView>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl WireObject for AssetView {
    const REQUIRED: &'static [&'static str] = &["name", "shortCode", "description", "type", "isCritical"];
}

impl Simplify for Asset {
    type View = AssetView;

    fn simplify(self) -> AssetView {
        AssetView {
            id: self.id,
            name: self.name,
            short_code: self.short_code,
            description: self.description,
            significance: self.significance,
            asset_type: self.asset_type,
            is_critical: self.is_critical,
            critical_rationale: self.critical_rationale,
            tags: self.tags,
            interfaces: self.interfaces,
            environment_properties: props_to_views(self.environment_properties),
            version: self.version,
        }
    }
}

impl TryFrom<AssetView> for Asset {
    type Error = CairisError;

    fn try_from(v: AssetView) -> Result<Self> {
        let mut asset = Asset::new(v.name);
        asset.id = v.id;
        asset.short_code = v.short_code;
        asset.description = v.description;
        asset.significance = v.significance;
        asset.asset_type = v.asset_type;
        asset.is_critical = v.is_critical;
        asset.critical_rationale = v.critical_rationale;
        asset.tags = v.tags;
        asset.interfaces = v.interfaces;
        asset.version = v.version;
        Ok(asset.with_environment_properties(props_from_views(v.environment_properties)?))
    }
}

// ============================================================================
// Environment Views
// ============================================================================

/// One tension record: `{baseAttrId, attrId, value, rationale}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TensionView {
    pub base_attr_id: i32,
    pub attr_id: i32,
    pub value: String,
    #[serde(default)]
    pub rationale: String,
}

pub fn tensions_to_views(tensions: BTreeMap<TensionKey, Tension>) -> Vec<TensionView> {
    tensions
        .into_iter()
        .map(|((base_attr_id, attr_id), t)| TensionView {
            base_attr_id,
            attr_id,
            value: t.value,
            rationale: t.rationale,
        })
        .collect()
}

fn check_attr_id(id: i32) -> Result<()> {
    usize::try_from(id)
        .ok()
        .and_then(SecurityAttribute::from_id)
        .map(|_| ())
        .ok_or_else(|| CairisError::MalformedInput(format!("unknown security attribute id {}", id)))
}

/// Tension records back to the keyed map; a key given twice is rejected
pub fn tensions_from_views(views: Vec<TensionView>) -> Result<BTreeMap<TensionKey, Tension>> {
    let mut tensions = BTreeMap::new();
    for v in views {
        check_attr_id(v.base_attr_id)?;
        check_attr_id(v.attr_id)?;
        let key = (v.base_attr_id, v.attr_id);
        if tensions.insert(key, Tension::new(v.value, v.rationale)).is_some() {
            return Err(CairisError::MalformedInput(format!(
                "tension ({}, {}) given more than once",
                key.0, key.1
            )));
        }
    }
    Ok(tensions)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentView {
    #[serde(default = "unset_id")]
    pub id: i64,
    pub name: String,
    pub short_code: String,
    pub description: String,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub duplicate_property: String,
    #[serde(default)]
    pub overriding_environment: String,
    #[serde(default)]
    pub tensions: Vec<TensionView>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl WireObject for EnvironmentView {
    const REQUIRED: &'static [&'static str] = &["name", "shortCode", "description"];
}

impl Simplify for Environment {
    type View = EnvironmentView;

    fn simplify(self) -> EnvironmentView {
        EnvironmentView {
            id: self.id,
            name: self.name,
            short_code: self.short_code,
            description: self.description,
            environments: self.environments,
            duplicate_property: self.duplicate_property,
            overriding_environment: self.overriding_environment,
            tensions: tensions_to_views(self.tensions),
            version: self.version,
        }
    }
}

impl TryFrom<EnvironmentView> for Environment {
    type Error = CairisError;

    fn try_from(v: EnvironmentView) -> Result<Self> {
        let mut env = Environment::new(v.name);
        env.id = v.id;
        env.short_code = v.short_code;
        env.description = v.description;
        env.environments = v.environments;
        env.duplicate_property = v.duplicate_property;
        env.overriding_environment = v.overriding_environment;
        env.tensions = tensions_from_views(v.tensions)?;
        env.version = v.version;
        Ok(env)
    }
}

// ============================================================================
// Goal Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalView {
    #[serde(default = "unset_id")]
    pub id: i64,
    pub name: String,
    pub originator: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub environment_properties: Vec<GoalEnvironmentProperties>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl WireObject for GoalView {
    const REQUIRED: &'static [&'static str] = &["name", "originator"];
}

impl Simplify for Goal {
    type View = GoalView;

    fn simplify(self) -> GoalView {
        GoalView {
            id: self.id,
            name: self.name,
            originator: self.originator,
            tags: self.tags,
            environment_properties: self.environment_properties,
            version: self.version,
        }
    }
}

impl From<GoalView> for Goal {
    fn from(v: GoalView) -> Self {
        let mut goal = Goal::new(v.name);
        goal.id = v.id;
        goal.originator = v.originator;
        goal.tags = v.tags;
        goal.version = v.version;
        goal.with_environment_properties(v.environment_properties)
    }
}

// ============================================================================
// Dependency Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyView {
    #[serde(default = "unset_id")]
    pub id: i64,
    pub environment_name: String,
    pub depender: String,
    pub dependee: String,
    pub dependency_type: String,
    pub dependency: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub version: Option<i64>,
}

impl WireObject for DependencyView {
    const REQUIRED: &'static [&'static str] =
        &["environmentName", "depender", "dependee", "dependencyType", "dependency"];
}

impl Simplify for Dependency {
    type View = DependencyView;

    fn simplify(self) -> DependencyView {
        DependencyView {
            id: self.id,
            environment_name: self.environment_name,
            depender: self.depender,
            dependee: self.dependee,
            dependency_type: self.dependency_type,
            dependency: self.dependency,
            rationale: self.rationale,
            version: self.version,
        }
    }
}

impl From<DependencyView> for Dependency {
    fn from(v: DependencyView) -> Self {
        Self {
            id: v.id,
            environment_name: v.environment_name,
            depender: v.depender,
            dependee: v.dependee,
            dependency_type: v.dependency_type,
            dependency: v.dependency,
            rationale: v.rationale,
            version: v.version,
        }
    }
}

// ============================================================================
// Value Types
// ============================================================================

impl WireObject for crate::model::ValueType {
    const REQUIRED: &'static [&'static str] = &["name"];
}
