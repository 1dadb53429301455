//! Dependency DAO
//!
//! Dependencies have no single name; they are addressed by the composite
//! key `environment/depender/dependee/dependency`, where any segment may be
//! the wildcard `all`.

use tracing::{debug, info};

use super::{CairisDao, EntityDao};
use crate::db::{Dimension, ProxyError};
use crate::error::{CairisError, Result};
use crate::model::dependency::{KEY_SEPARATOR, WILDCARD};
use crate::model::{Dependency, DependencyKey, DependencyParameters, NamedCollection};
use crate::session::SessionContext;

pub struct DependencyDao {
    base: CairisDao,
}

impl EntityDao for DependencyDao {
    type Entity = Dependency;
    const LABEL: &'static str = "dependency";

    fn base(&self) -> &CairisDao {
        &self.base
    }

    fn fetch(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Dependency>, ProxyError> {
        self.base.db().get_dependencies(constraint_id)
    }
}

impl DependencyDao {
    pub fn new(session: SessionContext) -> Self {
        Self {
            base: CairisDao::new(session),
        }
    }

    /// Dependencies matching `key`
    ///
    /// A fully concrete key yields exactly one dependency or `NotFound`; a
    /// key with any `all` segment yields every match, possibly none.
    pub fn get_dependency(&self, key: &DependencyKey) -> Result<Vec<Dependency>> {
        if !key.has_wildcard() {
            return Ok(vec![self.get_by_name(&key.to_string())?]);
        }

        let found: Vec<Dependency> = self
            .get_all(None)?
            .into_iter()
            .map(|(_, dependency)| dependency)
            .filter(|dependency| key.matches(dependency))
            .collect();

        debug!(key = %key, matches = found.len(), "Wildcard dependency query");
        Ok(found)
    }

    pub fn add_dependency(&self, dependency: &Dependency) -> Result<i64> {
        self.check_segments(dependency)?;
        let key = dependency.composite_key().to_string();
        if self.base.name_exists(&key, Dimension::Dependency)? {
            return Err(self.base.fail(CairisError::Conflict(format!(
                "The dependency {} already exists",
                key
            ))));
        }

        let params = DependencyParameters::from_dependency(dependency);
        let dependency_id = self.base.proxy(self.base.db().add_dependency(&params))?;

        info!(dependency = %key, dependency_id, "Dependency created");
        Ok(dependency_id)
    }

    /// Replace the dependency stored under the concrete key `key`
    pub fn update_dependency(&self, key: &DependencyKey, dependency: &Dependency) -> Result<()> {
        self.check_segments(dependency)?;
        let existing = self.get_by_name(&key.to_string())?;

        let mut params = DependencyParameters::from_dependency(dependency);
        params.set_id(existing.id);
        self.base.proxy(self.base.db().update_dependency(&params))?;

        info!(dependency = %key, dependency_id = existing.id, "Dependency updated");
        Ok(())
    }

    /// Reject segments that would make the composite key ambiguous
    fn check_segments(&self, dependency: &Dependency) -> Result<()> {
        match dependency.composite_key().invalid_segment() {
            Some(segment) => Err(self.base.fail(CairisError::MalformedInput(format!(
                "dependency segment '{}' may not be '{}' or contain '{}'",
                segment,
                WILDCARD,
                KEY_SEPARATOR
            )))),
            None => Ok(()),
        }
    }

    /// Delete every dependency matching `key`, returning how many went
    pub fn delete_dependencies(&self, key: &DependencyKey) -> Result<usize> {
        let targets: Vec<(i64, String)> = self
            .get_dependency(key)?
            .into_iter()
            .map(|dependency| (dependency.id, dependency.dependency_type))
            .collect();

        if targets.is_empty() {
            return Ok(0);
        }

        let deleted = self.base.proxy(self.base.db().delete_dependencies(&targets))?;
        info!(key = %key, deleted, "Dependencies deleted");
        Ok(deleted)
    }
}
