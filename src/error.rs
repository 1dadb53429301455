//! Error types for cairis
//!
//! `ProxyError` (in `db`) is what the persistence handle raises.
//! `CairisError` is what the DAO and HTTP layers raise; every persistence
//! failure is translated into one of its kinds before leaving a DAO.

use thiserror::Error;

use crate::db::ProxyError;

#[derive(Error, Debug)]
pub enum CairisError {
    /// Lookup by name, id or composite key yielded no match
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness check failed or the store reported a rule violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Neither name nor id supplied, or required JSON keys absent
    #[error("Missing parameter(s): {}", .0.join(", "))]
    MissingParameter(Vec<String>),

    /// Transport payload failed structural validation
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Persistence layer connectivity/transport failure
    #[error("Database error: {0}")]
    Upstream(String),

    /// Request carried no session id
    #[error("Session error: {0}")]
    SessionMissing(String),

    /// Session id does not resolve to a live connection
    #[error("Session error: {0}")]
    SessionUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CairisError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn missing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingParameter(names.into_iter().map(Into::into).collect())
    }
}

impl From<ProxyError> for CairisError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::AlreadyExists { .. }
            | ProxyError::VersionMismatch { .. }
            | ProxyError::RuleViolation(_) => Self::Conflict(err.to_string()),
            ProxyError::Connection(_) | ProxyError::Corrupt(_) => Self::Upstream(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CairisError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

pub type Result<T, E = CairisError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Dimension;

    #[test]
    fn test_proxy_conflicts_map_to_conflict() {
        let err: CairisError = ProxyError::AlreadyExists {
            dimension: Dimension::Asset,
            name: "ServerA".into(),
        }
        .into();
        assert!(matches!(err, CairisError::Conflict(ref m) if m.contains("ServerA")));

        let err: CairisError = ProxyError::VersionMismatch { id: 3, expected: 1 }.into();
        assert!(matches!(err, CairisError::Conflict(_)));
    }

    #[test]
    fn test_proxy_transport_maps_to_upstream() {
        let err: CairisError = ProxyError::Connection("lock poisoned".into()).into();
        assert!(matches!(err, CairisError::Upstream(_)));
    }

    #[test]
    fn test_missing_parameter_message() {
        let err = CairisError::missing(["name", "id"]);
        assert_eq!(err.to_string(), "Missing parameter(s): name, id");
    }
}
