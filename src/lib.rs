//! CAIRIS - security requirements and risk modelling store
//!
//! Serves assets, goals, dependencies, environments and the categorical
//! value types (asset types, asset values) of a CAIRIS model over a REST API.
//!
//! ## Architecture
//!
//! ```text
//! http        REST routes, session resolution, JSON envelopes
//!   ↓
//! views       wire shapes, simplify (rich → view) and convert (view → rich)
//!   ↓
//! dao         per-entity DAOs: name checks, resolve-then-write, error translation
//!   ↓
//! db          DbProxy over SQLite, one connection per session
//! ```
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/cairis/
//! ├── cairis.db              # SQLite database shared by file-backed sessions
//! └── config.toml            # Configuration
//! ```
//!
//! With `in_memory = true` every session gets a private in-memory database
//! instead.

pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod http;
pub mod model;
pub mod session;
pub mod views;

// Re-exports
pub use config::{Config, LogLevel};
pub use dao::{AssetDao, DependencyDao, EntityDao, EnvironmentDao, GoalDao, ObjectRef};
pub use db::{DbProxy, Dimension, ProxyError};
pub use error::{CairisError, Result};
pub use http::HttpServer;
pub use session::{DbTarget, SessionContext, SessionRegistry};
