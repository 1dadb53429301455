//! Domain entities and their `*Parameters` bundles
//!
//! Entities are the in-memory ("rich") form of persisted rows. Parameters
//! carry the fields needed to create or update an entity and are built from
//! an entity; the id is only set for update/delete addressing.

pub mod security;
pub mod asset;
pub mod environment;
pub mod goal;
pub mod dependency;
pub mod value_type;

use std::collections::{BTreeMap, HashMap};

pub use asset::{Asset, AssetAssociation, AssetEnvironmentProperties, AssetInterface, AssetParameters};
pub use dependency::{Dependency, DependencyKey, DependencyParameters};
pub use environment::{Environment, EnvironmentParameters, Tension, TensionKey};
pub use goal::{Goal, GoalEnvironmentProperties, GoalParameters};
pub use security::{SecurityAttribute, SecurityLevel, ATTRIBUTE_COUNT};
pub use value_type::{ValueType, ValueTypeKind, ValueTypeParameters};

/// An entity addressable both by key and by numeric id
pub trait Keyed {
    fn id(&self) -> i64;

    /// Name, or composite key for entities without a single name
    fn key(&self) -> String;
}

/// Entities indexed by key, with an id index maintained alongside
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCollection<T> {
    by_key: BTreeMap<String, T>,
    ids: HashMap<i64, String>,
}

impl<T> Default for NamedCollection<T> {
    fn default() -> Self {
        Self {
            by_key: BTreeMap::new(),
            ids: HashMap::new(),
        }
    }
}

impl<T: Keyed> NamedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: T) {
        let key = item.key();
        if let Some(previous) = self.by_key.get(&key) {
            self.ids.remove(&previous.id());
        }
        self.ids.insert(item.id(), key.clone());
        self.by_key.insert(key, item);
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.by_key.get(key)
    }

    pub fn get_by_id(&self, id: i64) -> Option<&T> {
        self.ids.get(&id).and_then(|key| self.by_key.get(key))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.by_key.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.by_key.iter()
    }
}

impl<T: Keyed> FromIterator<T> for NamedCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for item in iter {
            collection.insert(item);
        }
        collection
    }
}

impl<T> IntoIterator for NamedCollection<T> {
    type Item = (String, T);
    type IntoIter = std::collections::btree_map::IntoIter<String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_key.into_iter()
    }
}

/// Position of each environment name within a list of environment properties
pub(crate) fn index_environments<'a, I>(names: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| (name.to_string(), idx))
        .collect()
}
