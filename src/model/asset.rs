//! Assets and their environment-scoped security properties

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::security::{SecurityAttribute, SecurityLevel, ATTRIBUTE_COUNT};
use super::{index_environments, Keyed};

/// Id of an entity that has not been stored yet
pub const UNSET_ID: i64 = -1;

/// Association between this asset and another, as drawn on the asset model
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAssociation {
    pub head_navigation: i32,
    pub head_adornment: String,
    pub head_multiplicity: String,
    pub head_role: String,
    pub tail_role: String,
    pub tail_multiplicity: String,
    pub tail_adornment: String,
    pub tail_navigation: i32,
    pub tail_asset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInterface {
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    pub access_right: String,
    pub privilege: String,
}

/// Security property scores of an asset within one environment
///
/// `properties[i]` and `rationale[i]` both describe the attribute with id `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEnvironmentProperties {
    pub environment_name: String,
    pub properties: [i32; ATTRIBUTE_COUNT],
    pub rationale: [String; ATTRIBUTE_COUNT],
    #[serde(default)]
    pub associations: Vec<AssetAssociation>,
}

impl AssetEnvironmentProperties {
    /// Every attribute scored `None` with rationale "None"
    pub fn new(environment_name: impl Into<String>) -> Self {
        Self {
            environment_name: environment_name.into(),
            properties: [SecurityLevel::None.ordinal(); ATTRIBUTE_COUNT],
            rationale: std::array::from_fn(|_| SecurityLevel::None.label().to_string()),
            associations: Vec::new(),
        }
    }

    pub fn with_property(
        mut self,
        attribute: SecurityAttribute,
        level: SecurityLevel,
        rationale: impl Into<String>,
    ) -> Self {
        self.properties[attribute.id()] = level.ordinal();
        self.rationale[attribute.id()] = rationale.into();
        self
    }

    pub fn level(&self, attribute: SecurityAttribute) -> Option<SecurityLevel> {
        SecurityLevel::from_ordinal(self.properties[attribute.id()])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    pub short_code: String,
    pub description: String,
    pub significance: String,
    pub asset_type: String,
    pub is_critical: bool,
    pub critical_rationale: String,
    pub tags: Vec<String>,
    pub interfaces: Vec<AssetInterface>,
    pub environment_properties: Vec<AssetEnvironmentProperties>,
    /// Row version, `None` when the caller did not supply one
    pub version: Option<i64>,
    /// Environment name -> position in `environment_properties`
    pub environment_index: BTreeMap<String, usize>,
}

impl Asset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UNSET_ID,
            name: name.into(),
            short_code: String::new(),
            description: String::new(),
            significance: String::new(),
            asset_type: String::new(),
            is_critical: false,
            critical_rationale: String::new(),
            tags: Vec::new(),
            interfaces: Vec::new(),
            environment_properties: Vec::new(),
            version: None,
            environment_index: BTreeMap::new(),
        }
    }

    pub fn with_environment_properties(mut self, props: Vec<AssetEnvironmentProperties>) -> Self {
        self.set_environment_properties(props);
        self
    }

    pub fn set_environment_properties(&mut self, props: Vec<AssetEnvironmentProperties>) {
        self.environment_index =
            index_environments(props.iter().map(|p| p.environment_name.as_str()));
        self.environment_properties = props;
    }

    pub fn environment_properties_for(&self, environment: &str) -> Option<&AssetEnvironmentProperties> {
        self.environment_index
            .get(environment)
            .and_then(|&idx| self.environment_properties.get(idx))
    }
}

impl Keyed for Asset {
    fn id(&self) -> i64 {
        self.id
    }

    fn key(&self) -> String {
        self.name.clone()
    }
}

/// Fields needed to create or update an asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetParameters {
    id: Option<i64>,
    expected_version: Option<i64>,
    name: String,
    short_code: String,
    description: String,
    significance: String,
    asset_type: String,
    is_critical: bool,
    critical_rationale: String,
    tags: Vec<String>,
    interfaces: Vec<AssetInterface>,
    environment_properties: Vec<AssetEnvironmentProperties>,
}

impl AssetParameters {
    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            id: None,
            expected_version: asset.version,
            name: asset.name.clone(),
            short_code: asset.short_code.clone(),
            description: asset.description.clone(),
            significance: asset.significance.clone(),
            asset_type: asset.asset_type.clone(),
            is_critical: asset.is_critical,
            critical_rationale: asset.critical_rationale.clone(),
            tags: asset.tags.clone(),
            interfaces: asset.interfaces.clone(),
            environment_properties: asset.environment_properties.clone(),
        }
    }

    /// Replace the environment properties, keeping every other field
    pub fn with_environment_properties(mut self, props: Vec<AssetEnvironmentProperties>) -> Self {
        self.environment_properties = props;
        self
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn expected_version(&self) -> Option<i64> {
        self.expected_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_code(&self) -> &str {
        &self.short_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn significance(&self) -> &str {
        &self.significance
    }

    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    pub fn is_critical(&self) -> bool {
        self.is_critical
    }

    pub fn critical_rationale(&self) -> &str {
        &self.critical_rationale
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn interfaces(&self) -> &[AssetInterface] {
        &self.interfaces
    }

    pub fn environment_properties(&self) -> &[AssetEnvironmentProperties] {
        &self.environment_properties
    }
}
