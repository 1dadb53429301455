//! Environments and their security attribute tensions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::asset::UNSET_ID;
use super::security::SecurityAttribute;
use super::Keyed;

/// Pair of security attribute ids a tension is defined over
pub type TensionKey = (i32, i32);

/// Tradeoff between two security attributes within an environment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tension {
    pub value: String,
    pub rationale: String,
}

impl Tension {
    pub fn new(value: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            rationale: rationale.into(),
        }
    }
}

/// Key of the tension between two attributes
pub fn tension_key(base: SecurityAttribute, attr: SecurityAttribute) -> TensionKey {
    (base.id() as i32, attr.id() as i32)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub id: i64,
    pub name: String,
    pub short_code: String,
    pub description: String,
    /// Environments this one is composed of
    pub environments: Vec<String>,
    pub duplicate_property: String,
    pub overriding_environment: String,
    pub tensions: BTreeMap<TensionKey, Tension>,
    pub version: Option<i64>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UNSET_ID,
            name: name.into(),
            short_code: String::new(),
            description: String::new(),
            environments: Vec::new(),
            duplicate_property: String::new(),
            overriding_environment: String::new(),
            tensions: BTreeMap::new(),
            version: None,
        }
    }

    pub fn is_composite(&self) -> bool {
        !self.environments.is_empty()
    }
}

impl Keyed for Environment {
    fn id(&self) -> i64 {
        self.id
    }

    fn key(&self) -> String {
        self.name.clone()
    }
}

/// Fields needed to create or update an environment
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentParameters {
    id: Option<i64>,
    expected_version: Option<i64>,
    name: String,
    short_code: String,
    description: String,
    environments: Vec<String>,
    duplicate_property: String,
    overriding_environment: String,
    tensions: BTreeMap<TensionKey, Tension>,
}

impl EnvironmentParameters {
    pub fn from_environment(environment: &Environment) -> Self {
        Self {
            id: None,
            expected_version: environment.version,
            name: environment.name.clone(),
            short_code: environment.short_code.clone(),
            description: environment.description.clone(),
            environments: environment.environments.clone(),
            duplicate_property: environment.duplicate_property.clone(),
            overriding_environment: environment.overriding_environment.clone(),
            tensions: environment.tensions.clone(),
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

    pub fn short_code(&self) -> &str {
        &self.short_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn environments(&self) -> &[String] {
        &self.environments
    }

    pub fn duplicate_property(&self) -> &str {
        &self.duplicate_property
    }

    pub fn overriding_environment(&self) -> &str {
        &self.overriding_environment
    }

    pub fn tensions(&self) -> &BTreeMap<TensionKey, Tension> {
        &self.tensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tension_key_uses_attribute_ids() {
        assert_eq!(
            tension_key(SecurityAttribute::Confidentiality, SecurityAttribute::Integrity),
            (0, 1)
        );
        assert_eq!(
            tension_key(SecurityAttribute::Unobservability, SecurityAttribute::Anonymity),
            (7, 4)
        );
    }

    #[test]
    fn test_composite() {
        let mut env = Environment::new("Complete");
        assert!(!env.is_composite());
        env.environments = vec!["Day".into(), "Night".into()];
        assert!(env.is_composite());
        let params = EnvironmentParameters::from_environment(&env);
        assert_eq!(params.environments(), ["Day".to_string(), "Night".to_string()]);
        assert_eq!(params.id(), None);
    }
}
