//! Categorical value types (asset types, asset values)

use serde::{Deserialize, Serialize};

use super::asset::UNSET_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTypeKind {
    AssetType,
    AssetValue,
}

impl ValueTypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssetType => "asset_type",
            Self::AssetValue => "asset_value",
        }
    }
}

impl std::fmt::Display for ValueTypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, scored category, scoped to an environment (empty name = global)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueType {
    #[serde(default = "unset_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ValueTypeKind,
    #[serde(default)]
    pub environment_name: String,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub version: Option<i64>,
}

fn unset_id() -> i64 { UNSET_ID }
fn default_kind() -> ValueTypeKind { ValueTypeKind::AssetType }

impl ValueType {
    pub fn new(name: impl Into<String>, kind: ValueTypeKind) -> Self {
        Self {
            id: UNSET_ID,
            name: name.into(),
            description: String::new(),
            kind,
            environment_name: String::new(),
            score: 0,
            rationale: String::new(),
            version: None,
        }
    }
}

/// Fields needed to create or update a value type
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTypeParameters {
    id: Option<i64>,
    expected_version: Option<i64>,
    name: String,
    description: String,
    kind: ValueTypeKind,
    environment_name: String,
    score: i32,
    rationale: String,
}

impl ValueTypeParameters {
    /// Kind and environment scope come from the caller, not the payload
    pub fn new(value_type: &ValueType, kind: ValueTypeKind, environment_name: &str) -> Self {
        Self {
            id: None,
            expected_version: value_type.version,
            name: value_type.name.clone(),
            description: value_type.description.clone(),
            kind,
            environment_name: environment_name.to_string(),
            score: value_type.score,
            rationale: value_type.rationale.clone(),
        }
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

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ValueTypeKind {
        self.kind
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }
}
