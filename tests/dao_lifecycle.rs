//! End-to-end DAO behaviour against in-memory and file-backed databases

use cairis::dao::{AssetDao, DependencyDao, EntityDao, EnvironmentDao, GoalDao, ObjectRef};
use cairis::model::environment::tension_key;
use cairis::model::{
    Asset, AssetEnvironmentProperties, Dependency, DependencyKey, Environment, Goal,
    GoalEnvironmentProperties, SecurityAttribute, SecurityLevel, Tension,
};
use cairis::views::{props_from_views, props_to_views, Simplify};
use cairis::{CairisError, DbTarget, SessionContext, SessionRegistry};

fn session() -> SessionContext {
    SessionContext::in_memory().unwrap()
}

fn server_a() -> Asset {
    let mut asset = Asset::new("ServerA");
    asset.short_code = "SA".into();
    asset.asset_type = "Hardware".into();
    asset.is_critical = true;
    asset.critical_rationale = "Hosts the ledger".into();
    asset
}

#[test]
fn test_server_a_example() {
    let dao = AssetDao::new(session());
    let id = dao.add_asset(&server_a()).unwrap();
    assert!(id >= 0);

    let stored = dao.get_by_name("ServerA").unwrap();
    assert_eq!(stored.id, id);
    assert!(stored.is_critical);

    let view = stored.simplify();
    assert!(view.is_critical);
    assert!(view.environment_properties.is_empty());
}

#[test]
fn test_added_fields_survive() {
    let session = session();
    let assets = AssetDao::new(session.clone());
    let goals = GoalDao::new(session);

    let mut asset = server_a();
    asset.tags = vec!["core".into(), "dc1".into()];
    assets.add_asset(&asset).unwrap();
    let stored = assets.get_by_name("ServerA").unwrap();
    assert_eq!(stored.short_code, "SA");
    assert_eq!(stored.asset_type, "Hardware");
    assert_eq!(stored.critical_rationale, "Hosts the ledger");
    assert_eq!(stored.tags, vec!["core", "dc1"]);

    let mut goal = Goal::new("Keep ledger available");
    goal.originator = "CISO".into();
    goals.add_goal(&goal).unwrap();
    assert_eq!(goals.get_by_name("Keep ledger available").unwrap().originator, "CISO");
}

#[test]
fn test_id_and_name_resolve_to_same_record() {
    let session = session();
    let assets = AssetDao::new(session.clone());
    let environments = EnvironmentDao::new(session.clone());
    let goals = GoalDao::new(session.clone());
    let dependencies = DependencyDao::new(session);

    assets.add_asset(&server_a()).unwrap();
    environments.add_environment(&Environment::new("Prod")).unwrap();
    goals.add_goal(&Goal::new("Audit access")).unwrap();
    dependencies
        .add_dependency(&Dependency::new("Prod", "Operator", "Admin", "goal", "Audit access"))
        .unwrap();

    let asset = assets.get_by_name("ServerA").unwrap();
    assert_eq!(assets.get_by_id(asset.id).unwrap(), asset);

    let prod = environments.get_by_name("Prod").unwrap();
    assert_eq!(environments.get_by_id(prod.id).unwrap(), prod);

    let goal = goals.get_by_name("Audit access").unwrap();
    assert_eq!(goals.get_by_id(goal.id).unwrap(), goal);

    let dependency = dependencies.get_by_name("Prod/Operator/Admin/Audit access").unwrap();
    assert_eq!(dependencies.get_by_id(dependency.id).unwrap(), dependency);
}

#[test]
fn test_duplicate_add_conflicts_without_writing() {
    let dao = AssetDao::new(session());
    dao.add_asset(&server_a()).unwrap();

    let mut again = server_a();
    again.description = "second copy".into();
    assert!(matches!(dao.add_asset(&again), Err(CairisError::Conflict(_))));

    let all = dao.get_all(None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all.get("ServerA").unwrap().description, "");
}

#[test]
fn test_unresolvable_targets() {
    let dao = AssetDao::new(session());
    dao.add_asset(&server_a()).unwrap();

    let ghost = ObjectRef::Name("ServerB".into());
    assert!(matches!(dao.update_asset(&server_a(), &ghost), Err(CairisError::NotFound(_))));
    assert!(matches!(dao.delete_asset(&ghost), Err(CairisError::NotFound(_))));
    assert!(matches!(dao.delete_asset(&ObjectRef::Id(999)), Err(CairisError::NotFound(_))));
    assert!(matches!(ObjectRef::from_parts(None, None), Err(CairisError::MissingParameter(_))));

    // Failures leave the session usable
    assert_eq!(dao.get_asset_names().unwrap(), vec!["ServerA"]);
}

#[test]
fn test_security_properties_round_trip_through_store() {
    let dao = AssetDao::new(session());
    let day = AssetEnvironmentProperties::new("Day")
        .with_property(SecurityAttribute::Confidentiality, SecurityLevel::High, "Customer data")
        .with_property(SecurityAttribute::Unobservability, SecurityLevel::Low, "Traffic is visible");
    dao.add_asset(&server_a().with_environment_properties(vec![day.clone()]))
        .unwrap();

    let stored = dao.get_asset_props("ServerA").unwrap();
    assert_eq!(stored, vec![day.clone()]);

    let wire = props_to_views(stored);
    assert_eq!(wire[0].properties.len(), 8);
    assert_eq!(props_from_views(wire).unwrap(), vec![day]);
}

#[test]
fn test_update_properties_keeps_other_fields() {
    let dao = AssetDao::new(session());
    dao.add_asset(&server_a()).unwrap();

    let night = AssetEnvironmentProperties::new("Night")
        .with_property(SecurityAttribute::Availability, SecurityLevel::Medium, "Batch window");
    dao.update_asset_properties(vec![night], "ServerA").unwrap();

    let stored = dao.get_by_name("ServerA").unwrap();
    assert!(stored.is_critical);
    assert_eq!(
        stored
            .environment_properties_for("Night")
            .and_then(|p| p.level(SecurityAttribute::Availability)),
        Some(SecurityLevel::Medium)
    );
}

#[test]
fn test_prod_tension_example() {
    let dao = EnvironmentDao::new(session());
    dao.add_environment(&Environment::new("Prod")).unwrap();

    let mut prod = dao.get_by_name("Prod").unwrap();
    prod.tensions.insert(
        tension_key(SecurityAttribute::Confidentiality, SecurityAttribute::Integrity),
        Tension::new("High", "tradeoff"),
    );
    dao.update_environment(&prod, &ObjectRef::Name("Prod".into())).unwrap();

    let view = dao.get_by_name("Prod").unwrap().simplify();
    assert_eq!(view.tensions.len(), 1);
    let tension = &view.tensions[0];
    assert_eq!((tension.base_attr_id, tension.attr_id), (0, 1));
    assert_eq!(tension.value, "High");
    assert_eq!(tension.rationale, "tradeoff");

    let back = Environment::try_from(view).unwrap();
    assert_eq!(back.tensions, dao.get_by_name("Prod").unwrap().tensions);
}

#[test]
fn test_dependency_queries() {
    let dao = DependencyDao::new(session());
    for (env, depender, dependee, dependency) in [
        ("Day", "Operator", "Admin", "Backup"),
        ("Day", "Auditor", "Admin", "Logs"),
        ("Night", "Operator", "Guard", "Backup"),
    ] {
        dao.add_dependency(&Dependency::new(env, depender, dependee, "goal", dependency))
            .unwrap();
    }

    let all = dao.get_dependency(&DependencyKey::new("all", "all", "all", "all")).unwrap();
    assert_eq!(all.len(), 3);

    let backups = dao
        .get_dependency(&DependencyKey::new("all", "all", "all", "Backup"))
        .unwrap();
    assert_eq!(backups.len(), 2);
    assert!(backups.iter().all(|d| d.dependency == "Backup"));

    let exact = dao
        .get_dependency(&DependencyKey::new("Night", "Operator", "Guard", "Backup"))
        .unwrap();
    assert_eq!(exact.len(), 1);

    assert!(matches!(
        dao.get_dependency(&DependencyKey::new("Night", "Operator", "Admin", "Backup")),
        Err(CairisError::NotFound(_))
    ));

    assert_eq!(
        dao.delete_dependencies(&DependencyKey::new("Day", "all", "all", "all")).unwrap(),
        2
    );
    assert_eq!(dao.get_all(None).unwrap().len(), 1);
}

#[test]
fn test_environment_seeds_asset_values() {
    let session = session();
    EnvironmentDao::new(session.clone())
        .add_environment(&Environment::new("Day"))
        .unwrap();

    let assets = AssetDao::new(session);
    let values: Vec<String> = assets
        .get_asset_values("Day")
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(values, vec!["None", "Low", "Medium", "High"]);
    assert!(assets.check_existing_asset_value("High", "Day").unwrap());
    assert!(!assets.check_existing_asset_value("Extreme", "Day").unwrap());
}

#[test]
fn test_stale_update_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SessionRegistry::new(DbTarget::File(dir.path().join("cairis.db")));
    let first = AssetDao::new(registry.get(&registry.open_session().unwrap()).unwrap());
    let second = AssetDao::new(registry.get(&registry.open_session().unwrap()).unwrap());

    first.add_asset(&server_a()).unwrap();

    // Both sessions read version 1
    let mut ours = first.get_by_name("ServerA").unwrap();
    let mut theirs = second.get_by_name("ServerA").unwrap();
    assert_eq!(ours.version, Some(1));

    theirs.description = "patched by the second session".into();
    second.update_asset(&theirs, &ObjectRef::Name("ServerA".into())).unwrap();

    ours.description = "patched by the first session".into();
    assert!(matches!(
        first.update_asset(&ours, &ObjectRef::Name("ServerA".into())),
        Err(CairisError::Conflict(_))
    ));

    let stored = first.get_by_name("ServerA").unwrap();
    assert_eq!(stored.description, "patched by the second session");
    assert_eq!(stored.version, Some(2));

    // Without a version the write is unconditional
    ours.version = None;
    first.update_asset(&ours, &ObjectRef::Name("ServerA".into())).unwrap();
    assert_eq!(second.get_by_name("ServerA").unwrap().description, "patched by the first session");
}

#[test]
fn test_environment_rename_follows_references() {
    let session = session();
    let environments = EnvironmentDao::new(session.clone());
    let assets = AssetDao::new(session.clone());
    let goals = GoalDao::new(session.clone());
    let dependencies = DependencyDao::new(session);

    environments.add_environment(&Environment::new("Day")).unwrap();
    let mut shift = Environment::new("Shift");
    shift.environments = vec!["Day".into()];
    shift.overriding_environment = "Day".into();
    environments.add_environment(&shift).unwrap();

    let day_props = AssetEnvironmentProperties::new("Day")
        .with_property(SecurityAttribute::Integrity, SecurityLevel::High, "Ledger writes");
    assets
        .add_asset(&server_a().with_environment_properties(vec![day_props]))
        .unwrap();
    goals
        .add_goal(&Goal::new("Audit access").with_environment_properties(vec![GoalEnvironmentProperties::new("Day")]))
        .unwrap();
    dependencies
        .add_dependency(&Dependency::new("Day", "Operator", "Admin", "goal", "Audit access"))
        .unwrap();

    let mut day = environments.get_by_name("Day").unwrap();
    day.name = "Dawn".into();
    environments.update_environment(&day, &ObjectRef::Name("Day".into())).unwrap();

    let asset = assets.get_by_name("ServerA").unwrap();
    assert!(asset.environment_properties_for("Day").is_none());
    assert_eq!(
        asset
            .environment_properties_for("Dawn")
            .and_then(|p| p.level(SecurityAttribute::Integrity)),
        Some(SecurityLevel::High)
    );

    let goal = goals.get_by_name("Audit access").unwrap();
    assert_eq!(goal.environment_properties[0].environment_name, "Dawn");
    assert!(goal.environment_properties_for("Dawn").is_some());

    assert_eq!(
        dependencies
            .get_dependency(&DependencyKey::new("Dawn", "all", "all", "all"))
            .unwrap()
            .len(),
        1
    );
    assert!(dependencies
        .get_dependency(&DependencyKey::new("Day", "all", "all", "all"))
        .unwrap()
        .is_empty());

    let shift = environments.get_by_name("Shift").unwrap();
    assert_eq!(shift.environments, vec!["Dawn"]);
    assert_eq!(shift.overriding_environment, "Dawn");
    assert_eq!(assets.get_asset_values("Dawn").unwrap().len(), 4);
}
