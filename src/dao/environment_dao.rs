//! Environment DAO

use tracing::info;

use super::{CairisDao, EntityDao, ObjectRef};
use crate::db::{Dimension, ProxyError};
use crate::error::{CairisError, Result};
use crate::model::{Environment, EnvironmentParameters, NamedCollection};
use crate::session::SessionContext;

pub struct EnvironmentDao {
    base: CairisDao,
}

impl EntityDao for EnvironmentDao {
    type Entity = Environment;
    const LABEL: &'static str = "environment";

    fn base(&self) -> &CairisDao {
        &self.base
    }

    fn fetch(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Environment>, ProxyError> {
        self.base.db().get_environments(constraint_id)
    }
}

impl EnvironmentDao {
    pub fn new(session: SessionContext) -> Self {
        Self {
            base: CairisDao::new(session),
        }
    }

    pub fn get_environment_names(&self) -> Result<Vec<String>> {
        self.base.dimension_names(Dimension::Environment)
    }

    pub fn check_existing_environment(&self, name: &str) -> Result<bool> {
        self.base.name_exists(name, Dimension::Environment)
    }

    pub fn add_environment(&self, environment: &Environment) -> Result<i64> {
        if self.check_existing_environment(&environment.name)? {
            return Err(self.base.fail(CairisError::Conflict(format!(
                "The environment name {} already exists",
                environment.name
            ))));
        }

        let params = EnvironmentParameters::from_environment(environment);
        let environment_id = self.base.proxy(self.base.db().add_environment(&params))?;

        info!(
            environment = %environment.name,
            environment_id,
            tensions = environment.tensions.len(),
            "Environment created"
        );
        Ok(environment_id)
    }

    pub fn update_environment(&self, environment: &Environment, target: &ObjectRef) -> Result<()> {
        let existing = self.resolve(target)?;

        let mut params = EnvironmentParameters::from_environment(environment);
        params.set_id(existing.id);
        self.base.proxy(self.base.db().update_environment(&params))?;

        info!(environment = %environment.name, environment_id = existing.id, "Environment updated");
        Ok(())
    }

    pub fn delete_environment(&self, target: &ObjectRef) -> Result<()> {
        let existing = self.resolve(target)?;
        self.base.proxy(self.base.db().delete_environment(existing.id))?;

        info!(environment = %existing.name, environment_id = existing.id, "Environment deleted");
        Ok(())
    }
}
