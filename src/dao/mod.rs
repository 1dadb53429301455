//! Data access layer
//!
//! DAOs sit between the HTTP handlers and the persistence handle:
//!
//! ```text
//! HTTP Handlers (http/)
//!     ↓  views
//! DAO Layer (dao/*.rs)      name checks, resolve-then-write, error translation
//!     ↓  *Parameters
//! DbProxy (db/*.rs)
//!     ↓
//! SQLite Database
//! ```
//!
//! Every DAO is built over one session's `SessionContext`. Any failure
//! after the connection was touched resets it before the error leaves the
//! DAO, and persistence errors are always translated into `CairisError`.

pub mod asset_dao;
pub mod environment_dao;
pub mod goal_dao;
pub mod dependency_dao;

pub use asset_dao::AssetDao;
pub use dependency_dao::DependencyDao;
pub use environment_dao::EnvironmentDao;
pub use goal_dao::GoalDao;

use std::collections::BTreeMap;

use tracing::debug;

use crate::db::{DbProxy, Dimension, ProxyError};
use crate::error::{CairisError, Result};
use crate::model::{Keyed, NamedCollection};
use crate::session::SessionContext;
use crate::views::Simplify;

/// How a caller addresses an existing entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Name(String),
    Id(i64),
}

impl ObjectRef {
    /// Prefer the name when both are given; neither is `MissingParameter`
    pub fn from_parts(name: Option<&str>, id: Option<i64>) -> Result<Self> {
        match (name, id) {
            (Some(name), _) => Ok(Self::Name(name.to_string())),
            (None, Some(id)) if id >= 0 => Ok(Self::Id(id)),
            _ => Err(CairisError::missing(["name", "id"])),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name {}", name),
            Self::Id(id) => write!(f, "ID {}", id),
        }
    }
}

/// Shared state and connection handling for all DAOs
#[derive(Debug, Clone)]
pub struct CairisDao {
    session: SessionContext,
}

impl CairisDao {
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }

    pub fn db(&self) -> &DbProxy {
        self.session.db()
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    /// Release the connection after a failure
    pub fn close(&self) {
        self.db().reset();
    }

    /// Reset the connection, then hand back `err` as a `CairisError`
    pub fn fail(&self, err: impl Into<CairisError>) -> CairisError {
        self.close();
        err.into()
    }

    /// Translate a persistence result, resetting the connection on failure
    pub fn proxy<T>(&self, result: std::result::Result<T, ProxyError>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    /// Conflict unless `name` is free within `dimension`
    pub fn name_check(&self, name: &str, dimension: Dimension) -> Result<()> {
        self.proxy(self.db().name_check(name, dimension))
    }

    /// `true` when `name` is already taken within `dimension`
    pub fn name_exists(&self, name: &str, dimension: Dimension) -> Result<bool> {
        match self.db().name_check(name, dimension) {
            Ok(()) => Ok(false),
            Err(ProxyError::AlreadyExists { .. }) => Ok(true),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn dimension_names(&self, dimension: Dimension) -> Result<Vec<String>> {
        self.proxy(self.db().get_dimension_names(dimension))
    }
}

/// Read side of the DAO contract, shared by every entity type
///
/// Implementors supply the collection fetch; lookups by key and id, the
/// resolve step before writes and simplified reads come from here.
pub trait EntityDao {
    type Entity: Keyed + Clone;

    /// Label used in not-found messages, e.g. "asset"
    const LABEL: &'static str;

    fn base(&self) -> &CairisDao;

    fn fetch(&self, constraint_id: Option<i64>) -> std::result::Result<NamedCollection<Self::Entity>, ProxyError>;

    fn get_all(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Self::Entity>> {
        self.base().proxy(self.fetch(constraint_id))
    }

    /// `get_all` passed through `Simplify`, ready for transport
    fn get_all_simplified(
        &self,
        constraint_id: Option<i64>,
    ) -> Result<BTreeMap<String, <Self::Entity as Simplify>::View>>
    where
        Self::Entity: Simplify,
    {
        Ok(crate::views::simplify_all(self.get_all(constraint_id)?))
    }

    fn get_by_name(&self, name: &str) -> Result<Self::Entity> {
        let all = self.get_all(None)?;
        match all.get(name) {
            Some(entity) => Ok(entity.clone()),
            None => {
                debug!(name, kind = Self::LABEL, "Lookup by name missed");
                Err(self.base().fail(CairisError::not_found(format!("The provided {} name", Self::LABEL))))
            }
        }
    }

    fn get_by_id(&self, id: i64) -> Result<Self::Entity> {
        let all = self.get_all(None)?;
        match all.get_by_id(id) {
            Some(entity) => Ok(entity.clone()),
            None => {
                debug!(id, kind = Self::LABEL, "Lookup by id missed");
                Err(self.base().fail(CairisError::not_found(format!("The provided {} ID", Self::LABEL))))
            }
        }
    }

    /// Re-read the addressed entity from the store
    fn resolve(&self, target: &ObjectRef) -> Result<Self::Entity> {
        match target {
            ObjectRef::Name(name) => self.get_by_name(name),
            ObjectRef::Id(id) => self.get_by_id(*id),
        }
    }
}
