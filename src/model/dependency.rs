//! Dependencies between actors, keyed by a four-segment composite key

use super::asset::UNSET_ID;
use super::Keyed;

/// Separator between composite key segments
pub const KEY_SEPARATOR: char = '/';

/// Segment value matching any value in a dependency query
pub const WILDCARD: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub id: i64,
    pub environment_name: String,
    pub depender: String,
    pub dependee: String,
    /// Kind of the dependum: `goal`, `task` or `asset`
    pub dependency_type: String,
    /// Name of the dependum
    pub dependency: String,
    pub rationale: String,
    pub version: Option<i64>,
}

impl Dependency {
    pub fn new(
        environment_name: impl Into<String>,
        depender: impl Into<String>,
        dependee: impl Into<String>,
        dependency_type: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        Self {
            id: UNSET_ID,
            environment_name: environment_name.into(),
            depender: depender.into(),
            dependee: dependee.into(),
            dependency_type: dependency_type.into(),
            dependency: dependency.into(),
            rationale: String::new(),
            version: None,
        }
    }

    pub fn composite_key(&self) -> DependencyKey {
        DependencyKey::new(
            &self.environment_name,
            &self.depender,
            &self.dependee,
            &self.dependency,
        )
    }
}

impl Keyed for Dependency {
    fn id(&self) -> i64 {
        self.id
    }

    fn key(&self) -> String {
        self.composite_key().to_string()
    }
}

/// `environment/depender/dependee/dependency`, any segment possibly `all`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyKey {
    pub environment: String,
    pub depender: String,
    pub dependee: String,
    pub dependency: String,
}

impl DependencyKey {
    pub fn new(environment: &str, depender: &str, dependee: &str, dependency: &str) -> Self {
        Self {
            environment: environment.to_string(),
            depender: depender.to_string(),
            dependee: dependee.to_string(),
            dependency: dependency.to_string(),
        }
    }

    /// Split `a/b/c/d` into its four segments
    pub fn parse(key: &str) -> Option<Self> {
        let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        match parts.as_slice() {
            [environment, depender, dependee, dependency] => {
                Some(Self::new(environment, depender, dependee, dependency))
            }
            _ => None,
        }
    }

    fn segments(&self) -> [&str; 4] {
        [&self.environment, &self.depender, &self.dependee, &self.dependency]
    }

    /// First segment that cannot be stored: one holding the separator, or the wildcard
    pub fn invalid_segment(&self) -> Option<&str> {
        self.segments()
            .into_iter()
            .find(|segment| segment.contains(KEY_SEPARATOR) || *segment == WILDCARD)
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments().contains(&WILDCARD)
    }

    pub fn matches(&self, dependency: &Dependency) -> bool {
        let values = [
            dependency.environment_name.as_str(),
            dependency.depender.as_str(),
            dependency.dependee.as_str(),
            dependency.dependency.as_str(),
        ];
        self.segments()
            .iter()
            .zip(values)
            .all(|(segment, value)| *segment == WILDCARD || *segment == value)
    }
}

impl std::fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.environment,
            self.depender,
            self.dependee,
            self.dependency,
            sep = KEY_SEPARATOR
        )
    }
}

/// Fields needed to create or update a dependency
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyParameters {
    id: Option<i64>,
    expected_version: Option<i64>,
    environment_name: String,
    depender: String,
    dependee: String,
    dependency_type: String,
    dependency: String,
    rationale: String,
}

impl DependencyParameters {
    pub fn from_dependency(dependency: &Dependency) -> Self {
        Self {
            id: None,
            expected_version: dependency.version,
            environment_name: dependency.environment_name.clone(),
            depender: dependency.depender.clone(),
            dependee: dependency.dependee.clone(),
            dependency_type: dependency.dependency_type.clone(),
            dependency: dependency.dependency.clone(),
            rationale: dependency.rationale.clone(),
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

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn depender(&self) -> &str {
        &self.depender
    }

    pub fn dependee(&self) -> &str {
        &self.dependee
    }

    pub fn dependency_type(&self) -> &str {
        &self.dependency_type
    }

    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }
}
