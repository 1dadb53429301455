//! REST API over the DAO layer
//!
//! Every `/api/*` route runs inside a session, named by `session_id` in the
//! query string or the JSON body (the query wins). Request bodies use the
//! envelope `{"object": {...}, "session_id": "..."}`.
//!
//! ## Sessions
//! - `POST /api/session` - Open a session, answers `{session_id}`
//! - `GET /api/session` - List live sessions
//! - `DELETE /api/session` - Close a session
//!
//! ## Assets
//! - `GET|POST /api/assets`, `GET /api/assets/names`
//! - `GET|PUT|DELETE /api/assets/name/{name}` and `/api/assets/id/{id}`
//! - `GET|PUT /api/assets/name/{name}/properties`
//! - `GET|POST /api/assets/types`, `GET|PUT|DELETE /api/assets/types/name/{name}`
//! - `GET /api/assets/values`, `GET|PUT /api/assets/values/name/{name}`
//!
//! Value type routes take an optional `environment` query parameter.
//!
//! ## Environments and goals
//! - `GET|POST /api/environments`, `GET /api/environments/names`
//! - `GET|PUT|DELETE /api/environments/name/{name}` and `/id/{id}`
//! - `GET|POST /api/goals`, `GET /api/goals/names`, `GET /api/goals/outlines`
//! - `GET|PUT|DELETE /api/goals/name/{name}` and `/id/{id}`
//!
//! ## Dependencies
//! - `GET|POST /api/dependencies`
//! - `GET|PUT|DELETE /api/dependencies/environment/{e}/depender/{r}/dependee/{d}/dependency/{x}`
//!
//! Any dependency key segment may be `all` for GET and DELETE.
//!
//! ## Example Usage
//!
//! ```bash
//! # Open a session
//! curl -X POST http://localhost:7071/api/session
//!
//! # Add an asset
//! curl -X POST -H "Content-Type: application/json" \
//!      -d '{"session_id": "...", "object": {"name": "ServerA", "shortCode": "SA",
//!           "description": "", "type": "Hardware", "isCritical": false}}' \
//!      http://localhost:7071/api/assets
//!
//! # Every dependency in the Day environment
//! curl "http://localhost:7071/api/dependencies/environment/Day/depender/all/dependee/all/dependency/all?session_id=..."
//! ```

pub mod request;
pub mod response;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::dao::{AssetDao, DependencyDao, EntityDao, EnvironmentDao, GoalDao};
use crate::error::{CairisError, Result};
use crate::model::{Asset, Dependency, DependencyKey, Environment, Goal, ValueType};
use crate::session::SessionRegistry;
use crate::views::{
    decode_list, decode_object, parse_envelope, props_from_views, props_to_views, simplify_all,
    AssetEnvironmentPropertiesView, AssetView, DependencyView, EnvironmentView, GoalView, Simplify,
    WireObject,
};
use request::{decode_segment, id_ref, name_ref, resolve_session, Query};
use response::{created, from_result, message, method_not_allowed, ok, route_not_found, HandlerResult};

/// HTTP server state
pub struct HttpServer {
    registry: Arc<SessionRegistry>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(registry: Arc<SessionRegistry>, bind_addr: SocketAddr) -> Self {
        Self { registry, bind_addr }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Collect the body, then route on a blocking thread since DAOs hold SQLite locks
    async fn handle_request(&self, req: Request<Incoming>) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        debug!(method = %method, path = %path, "Incoming request");

        let body = req.into_body().collect().await?.to_bytes();
        let registry = self.registry.clone();

        let response = tokio::task::spawn_blocking(move || {
            route(&registry, &method, &path, query.as_deref(), &body)
        })
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Request handler failed");
            response::error_response(CairisError::Internal(e.to_string()))
        });

        Ok(response)
    }
}

/// Dispatch one request to its handler and render the outcome
pub fn route(
    registry: &SessionRegistry,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
) -> Response<Full<Bytes>> {
    from_result(dispatch(registry, method, path, query, body))
}

fn dispatch(registry: &SessionRegistry, method: &Method, path: &str, query: Option<&str>, body: &[u8]) -> HandlerResult {
    let query = Query::parse(query)?;

    match (method, path) {
        (&Method::GET, "/health") => return Ok(health(registry, &query)),
        (_, "/health") => return Ok(method_not_allowed()),
        (_, "/api/session") => return session_routes(registry, method, &query, body),
        _ => {}
    }

    let Some(rest) = path.strip_prefix("/api/") else {
        return Ok(route_not_found(path));
    };
    let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
    let Some((resource, tail)) = segments.split_first() else {
        return Ok(route_not_found(path));
    };

    match *resource {
        "assets" => {
            let dao = AssetDao::new(resolve_session(registry, &query, body)?);
            asset_routes(&dao, method, tail, &query, body)
        }
        "environments" => {
            let dao = EnvironmentDao::new(resolve_session(registry, &query, body)?);
            environment_routes(&dao, method, tail, &query, body)
        }
        "goals" => {
            let dao = GoalDao::new(resolve_session(registry, &query, body)?);
            goal_routes(&dao, method, tail, &query, body)
        }
        "dependencies" => {
            let dao = DependencyDao::new(resolve_session(registry, &query, body)?);
            dependency_routes(&dao, method, tail, &query, body)
        }
        _ => Ok(route_not_found(path)),
    }
}

/// Decode the envelope's object as a request view
fn decode_body<V: WireObject>(body: &[u8]) -> Result<V> {
    decode_object(parse_envelope(body)?.object)
}

fn no_route() -> CairisError {
    CairisError::not_found("The requested resource")
}

// ============================================================================
// Health and Sessions
// ============================================================================

fn health(registry: &SessionRegistry, query: &Query) -> Response<Full<Bytes>> {
    let mut body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": registry.len(),
    });

    if let Some(session) = query.session_id().and_then(|id| registry.get(id).ok()) {
        match session.db().stats() {
            Ok(stats) => body["stats"] = json!(stats),
            Err(e) => warn!(error = %e, "Could not read database stats"),
        }
    }

    ok(&body)
}

fn session_routes(registry: &SessionRegistry, method: &Method, query: &Query, body: &[u8]) -> HandlerResult {
    match *method {
        Method::POST => {
            let session_id = registry.open_session()?;
            Ok(ok(&json!({ "session_id": session_id, "message": "Session started" })))
        }
        Method::GET => Ok(ok(&registry.list())),
        Method::DELETE => {
            let session_id = request::session_id(query, body).ok_or_else(|| {
                CairisError::SessionMissing("No session ID is provided with the request.".into())
            })?;
            registry.close_session(&session_id)?;
            Ok(message("Session closed"))
        }
        _ => Ok(method_not_allowed()),
    }
}

// ============================================================================
// Assets
// ============================================================================

fn asset_routes(dao: &AssetDao, method: &Method, tail: &[&str], query: &Query, body: &[u8]) -> HandlerResult {
    match (method, tail) {
        (&Method::GET, []) => Ok(ok(&dao.get_all_simplified(query.constraint_id()?)?)),
        (&Method::POST, []) => {
            let asset = Asset::try_from(decode_body::<AssetView>(body)?)?;
            let asset_id = dao.add_asset(&asset)?;
            Ok(created("asset_id", asset_id, "Asset successfully added"))
        }
        (&Method::GET, ["names"]) => Ok(ok(&dao.get_asset_names()?)),

        (_, ["types", rest @ ..]) => asset_type_routes(dao, method, rest, query, body),
        (_, ["values", rest @ ..]) => asset_value_routes(dao, method, rest, query, body),

        (&Method::GET, ["name", name, "properties"]) => {
            let props = dao.get_asset_props(&decode_segment(name)?)?;
            Ok(ok(&props_to_views(props)))
        }
        (&Method::PUT, ["name", name, "properties"]) => {
            let views = decode_list::<AssetEnvironmentPropertiesView>(parse_envelope(body)?.object)?;
            dao.update_asset_properties(props_from_views(views)?, &decode_segment(name)?)?;
            Ok(message("The asset properties were successfully updated"))
        }

        (_, [kind @ ("name" | "id"), key]) => {
            let target = if *kind == "name" { name_ref(key)? } else { id_ref(key)? };
            match *method {
                Method::GET => Ok(ok(&dao.resolve(&target)?.simplify())),
                Method::PUT => {
                    let asset = Asset::try_from(decode_body::<AssetView>(body)?)?;
                    dao.update_asset(&asset, &target)?;
                    Ok(message("Asset successfully updated"))
                }
                Method::DELETE => {
                    dao.delete_asset(&target)?;
                    Ok(message("Asset successfully deleted"))
                }
                _ => Ok(method_not_allowed()),
            }
        }
        _ => Err(no_route()),
    }
}

fn asset_type_routes(dao: &AssetDao, method: &Method, tail: &[&str], query: &Query, body: &[u8]) -> HandlerResult {
    let environment = query.environment();

    match (method, tail) {
        (&Method::GET, []) => Ok(ok(&dao.get_asset_types(environment)?)),
        (&Method::POST, []) => {
            let asset_type = decode_body::<ValueType>(body)?;
            let type_id = dao.add_asset_type(&asset_type, environment)?;
            Ok(created("asset_type_id", type_id, "Asset type successfully added"))
        }
        (&Method::GET, ["name", name]) => {
            Ok(ok(&dao.get_asset_type_by_name(&decode_segment(name)?, environment)?))
        }
        (&Method::PUT, ["name", name]) => {
            let asset_type = decode_body::<ValueType>(body)?;
            dao.update_asset_type(&asset_type, &decode_segment(name)?, environment)?;
            Ok(message("Asset type successfully updated"))
        }
        (&Method::DELETE, ["name", name]) => {
            dao.delete_asset_type(&decode_segment(name)?, environment)?;
            Ok(message("Asset type successfully deleted"))
        }
        _ => Err(no_route()),
    }
}

fn asset_value_routes(dao: &AssetDao, method: &Method, tail: &[&str], query: &Query, body: &[u8]) -> HandlerResult {
    let environment = query.environment();

    match (method, tail) {
        (&Method::GET, []) => Ok(ok(&dao.get_asset_values(environment)?)),
        (&Method::GET, ["name", name]) => {
            Ok(ok(&dao.get_asset_value_by_name(&decode_segment(name)?, environment)?))
        }
        (&Method::PUT, ["name", name]) => {
            let asset_value = decode_body::<ValueType>(body)?;
            dao.update_asset_value(&asset_value, &decode_segment(name)?, environment)?;
            Ok(message("Asset value successfully updated"))
        }
        _ => Err(no_route()),
    }
}

// ============================================================================
// Environments
// ============================================================================

fn environment_routes(
    dao: &EnvironmentDao,
    method: &Method,
    tail: &[&str],
    query: &Query,
    body: &[u8],
) -> HandlerResult {
    match (method, tail) {
        (&Method::GET, []) => Ok(ok(&dao.get_all_simplified(query.constraint_id()?)?)),
        (&Method::POST, []) => {
            let environment = Environment::try_from(decode_body::<EnvironmentView>(body)?)?;
            let environment_id = dao.add_environment(&environment)?;
            Ok(created("environment_id", environment_id, "Environment successfully added"))
        }
        (&Method::GET, ["names"]) => Ok(ok(&dao.get_environment_names()?)),
        (_, [kind @ ("name" | "id"), key]) => {
            let target = if *kind == "name" { name_ref(key)? } else { id_ref(key)? };
            match *method {
                Method::GET => Ok(ok(&dao.resolve(&target)?.simplify())),
                Method::PUT => {
                    let environment = Environment::try_from(decode_body::<EnvironmentView>(body)?)?;
                    dao.update_environment(&environment, &target)?;
                    Ok(message("Environment successfully updated"))
                }
                Method::DELETE => {
                    dao.delete_environment(&target)?;
                    Ok(message("Environment successfully deleted"))
                }
                _ => Ok(method_not_allowed()),
            }
        }
        _ => Err(no_route()),
    }
}

// ============================================================================
// Goals
// ============================================================================

fn goal_routes(dao: &GoalDao, method: &Method, tail: &[&str], query: &Query, body: &[u8]) -> HandlerResult {
    match (method, tail) {
        (&Method::GET, []) => Ok(ok(&dao.get_all_simplified(query.constraint_id()?)?)),
        (&Method::POST, []) => {
            let goal = Goal::from(decode_body::<GoalView>(body)?);
            let goal_id = dao.add_goal(&goal)?;
            Ok(created("goal_id", goal_id, "Goal successfully added"))
        }
        (&Method::GET, ["names"]) => Ok(ok(&dao.get_goal_names()?)),
        (&Method::GET, ["outlines"]) => Ok(ok(&simplify_all(dao.get_goal_outlines()?))),
        (_, [kind @ ("name" | "id"), key]) => {
            let target = if *kind == "name" { name_ref(key)? } else { id_ref(key)? };
            match *method {
                Method::GET => Ok(ok(&dao.resolve(&target)?.simplify())),
                Method::PUT => {
                    let goal = Goal::from(decode_body::<GoalView>(body)?);
                    dao.update_goal(&goal, &target)?;
                    Ok(message("Goal successfully updated"))
                }
                Method::DELETE => {
                    dao.delete_goal(&target)?;
                    Ok(message("Goal successfully deleted"))
                }
                _ => Ok(method_not_allowed()),
            }
        }
        _ => Err(no_route()),
    }
}

// ============================================================================
// Dependencies
// ============================================================================

fn dependency_routes(
    dao: &DependencyDao,
    method: &Method,
    tail: &[&str],
    query: &Query,
    body: &[u8],
) -> HandlerResult {
    match (method, tail) {
        (&Method::GET, []) => Ok(ok(&dao.get_all_simplified(query.constraint_id()?)?)),
        (&Method::POST, []) => {
            let dependency: Dependency = decode_body::<DependencyView>(body)?.into();
            let dependency_id = dao.add_dependency(&dependency)?;
            Ok(created("dependency_id", dependency_id, "Dependency successfully added"))
        }
        (_, ["environment", environment, "depender", depender, "dependee", dependee, "dependency", dependency]) => {
            let key = DependencyKey::new(
                &decode_segment(environment)?,
                &decode_segment(depender)?,
                &decode_segment(dependee)?,
                &decode_segment(dependency)?,
            );
            match *method {
                Method::GET => {
                    let found: Vec<DependencyView> =
                        dao.get_dependency(&key)?.into_iter().map(Simplify::simplify).collect();
                    Ok(ok(&found))
                }
                Method::PUT => {
                    let dependency: Dependency = decode_body::<DependencyView>(body)?.into();
                    dao.update_dependency(&key, &dependency)?;
                    Ok(message("Dependency successfully updated"))
                }
                Method::DELETE => {
                    let deleted = dao.delete_dependencies(&key)?;
                    Ok(ok(&json!({
                        "deleted": deleted,
                        "message": format!("{} dependencies deleted", deleted),
                    })))
                }
                _ => Ok(method_not_allowed()),
            }
        }
        _ => Err(no_route()),
    }
}
