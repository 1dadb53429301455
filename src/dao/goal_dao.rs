//! Goal DAO

use tracing::info;

use super::{CairisDao, EntityDao, ObjectRef};
use crate::db::{Dimension, ProxyError};
use crate::error::Result;
use crate::model::{Goal, GoalParameters, NamedCollection};
use crate::session::SessionContext;

pub struct GoalDao {
    base: CairisDao,
}

impl EntityDao for GoalDao {
    type Entity = Goal;
    const LABEL: &'static str = "goal";

    fn base(&self) -> &CairisDao {
        &self.base
    }

    fn fetch(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Goal>, ProxyError> {
        self.base.db().get_goals(constraint_id)
    }
}

impl GoalDao {
    pub fn new(session: SessionContext) -> Self {
        Self {
            base: CairisDao::new(session),
        }
    }

    pub fn get_goal_names(&self) -> Result<Vec<String>> {
        self.base.dimension_names(Dimension::Goal)
    }

    /// Every goal with its environment properties stripped
    pub fn get_goal_outlines(&self) -> Result<NamedCollection<Goal>> {
        Ok(self
            .get_all(None)?
            .into_iter()
            .map(|(_, goal)| goal.with_environment_properties(Vec::new()))
            .collect())
    }

    pub fn add_goal(&self, goal: &Goal) -> Result<i64> {
        self.base.name_check(&goal.name, Dimension::Goal)?;

        let params = GoalParameters::from_goal(goal);
        let goal_id = self.base.proxy(self.base.db().add_goal(&params))?;

        info!(goal = %goal.name, goal_id, "Goal created");
        Ok(goal_id)
    }

    pub fn update_goal(&self, goal: &Goal, target: &ObjectRef) -> Result<()> {
        let existing = self.resolve(target)?;

        let mut params = GoalParameters::from_goal(goal);
        params.set_id(existing.id);
        self.base.proxy(self.base.db().update_goal(&params))?;

        info!(goal = %goal.name, goal_id = existing.id, "Goal updated");
        Ok(())
    }

    pub fn delete_goal(&self, target: &ObjectRef) -> Result<()> {
        let existing = self.resolve(target)?;
        self.base.proxy(self.base.db().delete_goal(existing.id))?;

        info!(goal = %existing.name, goal_id = existing.id, "Goal deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CairisError;
    use crate::model::GoalEnvironmentProperties;

    fn dao() -> GoalDao {
        GoalDao::new(SessionContext::in_memory().unwrap())
    }

    fn backup() -> Goal {
        let mut goal = Goal::new("Backup data");
        goal.originator = "ops".into();
        let mut day = GoalEnvironmentProperties::new("Day");
        day.definition = "Nightly backups".into();
        goal.with_environment_properties(vec![day])
    }

    #[test]
    fn test_id_and_name_agree() {
        let dao = dao();
        let id = dao.add_goal(&backup()).unwrap();
        let by_name = dao.get_by_name("Backup data").unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(dao.get_by_id(id).unwrap(), by_name);
        assert_eq!(by_name.environment_properties[0].definition, "Nightly backups");
    }

    #[test]
    fn test_outlines_strip_environment_properties() {
        let dao = dao();
        dao.add_goal(&backup()).unwrap();
        let outlines = dao.get_goal_outlines().unwrap();
        let outline = outlines.get("Backup data").unwrap();
        assert!(outline.environment_properties.is_empty());
        assert!(outline.environment_index.is_empty());
        assert_eq!(outline.originator, "ops");
    }

    #[test]
    fn test_conflict_and_not_found() {
        let dao = dao();
        dao.add_goal(&backup()).unwrap();
        assert!(matches!(dao.add_goal(&backup()), Err(CairisError::Conflict(_))));
        assert!(matches!(
            dao.update_goal(&backup(), &ObjectRef::Name("Restore data".into())),
            Err(CairisError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_and_delete() {
        let dao = dao();
        let id = dao.add_goal(&backup()).unwrap();

        let mut renamed = backup();
        renamed.name = "Back up data".into();
        dao.update_goal(&renamed, &ObjectRef::Id(id)).unwrap();
        assert_eq!(dao.get_goal_names().unwrap(), vec!["Back up data"]);

        dao.delete_goal(&ObjectRef::Name("Back up data".into())).unwrap();
        assert!(dao.get_all(None).unwrap().is_empty());
    }
}
