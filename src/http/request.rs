//! Request-side helpers: query strings, path segments and session lookup

use std::collections::HashMap;

use tracing::debug;

use crate::dao::ObjectRef;
use crate::error::{CairisError, Result};
use crate::session::{SessionContext, SessionRegistry};
use crate::views::body_session_id;

/// Decoded query string parameters
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: HashMap<String, String>,
}

impl Query {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let params = match raw {
            Some(raw) if !raw.is_empty() => serde_urlencoded::from_str(raw)
                .map_err(|e| CairisError::MalformedInput(format!("invalid query string: {}", e)))?,
            _ => HashMap::new(),
        };
        Ok(Self { params })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.get("session_id")
    }

    /// Environment scope for value type routes; empty means global
    pub fn environment(&self) -> &str {
        self.get("environment").unwrap_or("")
    }

    /// `constraint_id`, when given, restricts collection reads to one id
    pub fn constraint_id(&self) -> Result<Option<i64>> {
        self.get("constraint_id").map(parse_id).transpose()
    }
}

/// Percent-decode one path segment
pub fn decode_segment(segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| CairisError::MalformedInput(format!("invalid path segment {}: {}", segment, e)))
}

pub fn parse_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| CairisError::MalformedInput(format!("{} is not a valid ID", raw)))
}

/// `ObjectRef` for a `/name/{name}` route
pub fn name_ref(segment: &str) -> Result<ObjectRef> {
    let name = decode_segment(segment)?;
    ObjectRef::from_parts(Some(name.as_str()), None)
}

/// `ObjectRef` for an `/id/{id}` route
pub fn id_ref(segment: &str) -> Result<ObjectRef> {
    ObjectRef::from_parts(None, Some(parse_id(segment)?))
}

/// Session id from the query string, falling back to the JSON body
pub fn session_id(query: &Query, body: &[u8]) -> Option<String> {
    query
        .session_id()
        .map(str::to_string)
        .or_else(|| body_session_id(body))
}

/// Resolve the session a request runs in
pub fn resolve_session(registry: &SessionRegistry, query: &Query, body: &[u8]) -> Result<SessionContext> {
    let id = session_id(query, body).ok_or_else(|| {
        debug!("Request carries no session id");
        CairisError::SessionMissing(
            "The session is neither started or no session ID is provided with the request.".into(),
        )
    })?;
    registry.get(&id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DbTarget;

    #[test]
    fn test_query_parsing() {
        let query = Query::parse(Some("session_id=abc&environment=Day%20Shift")).unwrap();
        assert_eq!(query.session_id(), Some("abc"));
        assert_eq!(query.environment(), "Day Shift");
        assert_eq!(query.constraint_id().unwrap(), None);

        let empty = Query::parse(None).unwrap();
        assert_eq!(empty.environment(), "");
        assert!(Query::parse(Some("constraint_id=x")).unwrap().constraint_id().is_err());
    }

    #[test]
    fn test_segments() {
        assert_eq!(decode_segment("Server%20A").unwrap(), "Server A");
        assert_eq!(name_ref("Server%2FA").unwrap(), ObjectRef::Name("Server/A".into()));
        assert_eq!(id_ref("12").unwrap(), ObjectRef::Id(12));
        assert!(matches!(id_ref("-1"), Err(CairisError::MissingParameter(_))));
        assert!(matches!(id_ref("twelve"), Err(CairisError::MalformedInput(_))));
    }

    #[test]
    fn test_query_overrides_body_session() {
        let body = br#"{"object": {}, "session_id": "from-body"}"#;
        let query = Query::parse(Some("session_id=from-query")).unwrap();
        assert_eq!(session_id(&query, body).as_deref(), Some("from-query"));
        assert_eq!(session_id(&Query::default(), body).as_deref(), Some("from-body"));
    }

    #[test]
    fn test_resolve_session_errors() {
        let registry = SessionRegistry::new(DbTarget::InMemory);
        assert!(matches!(
            resolve_session(&registry, &Query::default(), b""),
            Err(CairisError::SessionMissing(_))
        ));

        let query = Query::parse(Some("session_id=nope")).unwrap();
        assert!(matches!(
            resolve_session(&registry, &query, b""),
            Err(CairisError::SessionUnavailable(_))
        ));

        let id = registry.open_session().unwrap();
        let query = Query::parse(Some(&format!("session_id={}", id))).unwrap();
        assert_eq!(resolve_session(&registry, &query, b"").unwrap().session_id, id);
    }
}
