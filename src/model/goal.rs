//! Goals and their environment-scoped properties

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::asset::UNSET_ID;
use super::{index_environments, Keyed};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalEnvironmentProperties {
    pub environment_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub fit_criterion: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub concerns: Vec<String>,
}

impl GoalEnvironmentProperties {
    pub fn new(environment_name: impl Into<String>) -> Self {
        Self {
            environment_name: environment_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub originator: String,
    pub tags: Vec<String>,
    pub environment_properties: Vec<GoalEnvironmentProperties>,
    pub version: Option<i64>,
    /// Environment name -> position in `environment_properties`
    pub environment_index: BTreeMap<String, usize>,
}

impl Goal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UNSET_ID,
            name: name.into(),
            originator: String::new(),
            tags: Vec::new(),
            environment_properties: Vec::new(),
            version: None,
            environment_index: BTreeMap::new(),
        }
    }

    pub fn with_environment_properties(mut self, props: Vec<GoalEnvironmentProperties>) -> Self {
        self.environment_index =
            index_environments(props.iter().map(|p| p.environment_name.as_str()));
        self.environment_properties = props;
        self
    }

    pub fn environment_properties_for(&self, environment: &str) -> Option<&GoalEnvironmentProperties> {
        self.environment_index
            .get(environment)
            .and_then(|&idx| self.environment_properties.get(idx))
    }
}

impl Keyed for Goal {
    fn id(&self) -> i64 {
        self.id
    }

    fn key(&self) -> String {
        self.name.clone()
    }
}

/// Fields needed to create or update a goal
#[derive(Debug, Clone, PartialEq)]
pub struct GoalParameters {
    id: Option<i64>,
    expected_version: Option<i64>,
    name: String,
    originator: String,
    tags: Vec<String>,
    environment_properties: Vec<GoalEnvironmentProperties>,
}

impl GoalParameters {
    pub fn from_goal(goal: &Goal) -> Self {
        Self {
            id: None,
            expected_version: goal.version,
            name: goal.name.clone(),
            originator: goal.originator.clone(),
            tags: goal.tags.clone(),
            environment_properties: goal.environment_properties.clone(),
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

    pub fn originator(&self) -> &str {
        &self.originator
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn environment_properties(&self) -> &[GoalEnvironmentProperties] {
        &self.environment_properties
    }
}
