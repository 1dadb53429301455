//! Session Management
//!
//! Each client session owns a persistence handle. The registry is owned by
//! the HTTP server and handed to request handlers; there is no process-wide
//! session state.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbProxy;
use crate::error::{CairisError, Result};

/// Where session databases live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    /// Every session opens its own connection to the same file
    File(PathBuf),
    /// Every session gets a private, empty database
    InMemory,
}

impl DbTarget {
    pub fn from_config(config: &Config) -> Self {
        if config.in_memory {
            Self::InMemory
        } else {
            Self::File(config.db_path())
        }
    }

    fn open(&self) -> Result<DbProxy> {
        let proxy = match self {
            Self::File(path) => DbProxy::open(path),
            Self::InMemory => DbProxy::open_in_memory(),
        };
        proxy.map_err(|e| CairisError::SessionUnavailable(e.to_string()))
    }
}

/// Persistence handle and bookkeeping for one session
#[derive(Clone)]
pub struct SessionContext {
    pub session_id: String,
    db: Arc<DbProxy>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, db: DbProxy) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            db: Arc::new(db),
            created_at: now,
            last_activity: now,
        }
    }

    /// Context over a fresh in-memory database, outside any registry
    pub fn in_memory() -> Result<Self> {
        let db = DbTarget::InMemory.open()?;
        Ok(Self::new(Uuid::new_v4().to_string(), db))
    }

    pub fn db(&self) -> &DbProxy {
        &self.db
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.session_id)
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .finish()
    }
}

/// Session summary for listings and health output
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Live sessions by id
pub struct SessionRegistry {
    sessions: DashMap<String, SessionContext>,
    target: DbTarget,
}

impl SessionRegistry {
    pub fn new(target: DbTarget) -> Self {
        Self {
            sessions: DashMap::new(),
            target,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(DbTarget::from_config(config))
    }

    /// Start a session with its own database connection
    pub fn open_session(&self) -> Result<String> {
        let session_id = Uuid::new_v4().to_string();
        let db = self.target.open()?;
        self.sessions
            .insert(session_id.clone(), SessionContext::new(session_id.clone(), db));

        info!(session_id = %session_id, sessions = self.sessions.len(), "Session opened");
        Ok(session_id)
    }

    /// Resolve a session, recording activity on it
    pub fn get(&self, session_id: &str) -> Result<SessionContext> {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                entry.touch();
                Ok(entry.clone())
            }
            None => {
                debug!(session_id = %session_id, "Unknown session");
                Err(CairisError::SessionUnavailable(
                    "The database connection could not be created.".into(),
                ))
            }
        }
    }

    pub fn close_session(&self, session_id: &str) -> Result<()> {
        match self.sessions.remove(session_id) {
            Some(_) => {
                info!(session_id = %session_id, "Session closed");
                Ok(())
            }
            None => {
                warn!(session_id = %session_id, "Close requested for unknown session");
                Err(CairisError::not_found(format!("session {}", session_id)))
            }
        }
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|entry| SessionInfo {
                session_id: entry.session_id.clone(),
                created_at: entry.created_at,
                last_activity: entry.last_activity,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
