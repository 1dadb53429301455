//! REST API behaviour through the request router

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Response, StatusCode};
use serde_json::{json, Value};

use cairis::http::route;
use cairis::{DbTarget, SessionRegistry};

struct Client {
    registry: SessionRegistry,
    session_id: String,
}

async fn read(resp: Response<Full<Bytes>>) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

impl Client {
    async fn start() -> Self {
        let registry = SessionRegistry::new(DbTarget::InMemory);
        let (status, body) = read(route(&registry, &Method::POST, "/api/session", None, b"")).await;
        assert_eq!(status, StatusCode::OK);
        let session_id = body["session_id"].as_str().unwrap().to_string();
        Self { registry, session_id }
    }

    fn query(&self) -> String {
        format!("session_id={}", self.session_id)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        read(route(&self.registry, &Method::GET, path, Some(&self.query()), b"")).await
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        read(route(&self.registry, &Method::DELETE, path, Some(&self.query()), b"")).await
    }

    /// Send `object` in the request envelope, session id in the body
    async fn send(&self, method: Method, path: &str, object: Value) -> (StatusCode, Value) {
        let body = json!({ "session_id": self.session_id, "object": object }).to_string();
        read(route(&self.registry, &method, path, None, body.as_bytes())).await
    }
}

fn server_a() -> Value {
    json!({
        "name": "ServerA",
        "shortCode": "SA",
        "description": "Ledger host",
        "type": "Hardware",
        "isCritical": true
    })
}

#[tokio::test]
async fn test_session_lifecycle() {
    let client = Client::start().await;
    let (status, sessions) = client.get("/api/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sessions.as_array().unwrap().len(), 1);

    let (status, _) = client.delete("/api/session").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client.get("/api/assets").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_asset_crud() {
    let client = Client::start().await;

    let (status, created) = client.send(Method::POST, "/api/assets", server_a()).await;
    assert_eq!(status, StatusCode::OK);
    let asset_id = created["asset_id"].as_i64().unwrap();
    assert!(asset_id >= 0);
    assert_eq!(created["message"], "Asset successfully added");

    let (status, asset) = client.get("/api/assets/name/ServerA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["isCritical"], true);
    assert_eq!(asset["environmentProperties"], json!([]));
    assert!(asset.get("environmentIndex").is_none());

    let (_, by_id) = client.get(&format!("/api/assets/id/{}", asset_id)).await;
    assert_eq!(by_id, asset);

    let (status, names) = client.get("/api/assets/names").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names, json!(["ServerA"]));

    let mut renamed = server_a();
    renamed["name"] = json!("Server A");
    let (status, _) = client
        .send(Method::PUT, &format!("/api/assets/id/{}", asset_id), renamed)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, asset) = client.get("/api/assets/name/Server%20A").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["id"], asset_id);

    let (status, _) = client.delete("/api/assets/name/Server%20A").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client.get("/api/assets/name/Server%20A").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "Not Found");
}

#[tokio::test]
async fn test_asset_rejections() {
    let client = Client::start().await;
    client.send(Method::POST, "/api/assets", server_a()).await;

    let (status, body) = client.send(Method::POST, "/api/assets", server_a()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("ServerA"));

    let (status, body) = client
        .send(Method::POST, "/api/assets", json!({ "name": "ServerB" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("shortCode"));

    let (status, _) = client
        .send(Method::PUT, "/api/assets/name/ServerB", server_a())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let garbage = format!("not json session_id={}", client.session_id);
    let resp = route(&client.registry, &Method::POST, "/api/assets", Some(&client.query()), garbage.as_bytes());
    assert_eq!(read(resp).await.0, StatusCode::BAD_REQUEST);

    let (status, _) = client.delete("/api/assets/id/-3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_asset_properties() {
    let client = Client::start().await;
    client.send(Method::POST, "/api/assets", server_a()).await;

    let props = json!([{
        "environmentName": "Day",
        "properties": [
            { "name": "Confidentiality", "value": "High", "rationale": "Customer data" },
            { "name": "Availability", "value": "Medium", "rationale": "Business hours" }
        ]
    }]);
    let (status, _) = client
        .send(Method::PUT, "/api/assets/name/ServerA/properties", props)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, stored) = client.get("/api/assets/name/ServerA/properties").await;
    assert_eq!(status, StatusCode::OK);
    let day = &stored[0];
    assert_eq!(day["environmentName"], "Day");
    assert_eq!(day["properties"].as_array().unwrap().len(), 8);
    assert_eq!(day["properties"][0], json!({ "name": "Confidentiality", "value": "High", "rationale": "Customer data" }));
    assert_eq!(day["properties"][1]["value"], "None");
    assert_eq!(day["properties"][2]["value"], "Medium");

    let bad = json!([{
        "environmentName": "Day",
        "properties": [{ "name": "Secrecy", "value": "High", "rationale": "" }]
    }]);
    let (status, _) = client
        .send(Method::PUT, "/api/assets/name/ServerA/properties", bad)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_environment_tensions_over_the_wire() {
    let client = Client::start().await;
    let prod = json!({
        "name": "Prod",
        "shortCode": "PRD",
        "description": "Production",
        "tensions": [
            { "baseAttrId": 0, "attrId": 1, "value": "High", "rationale": "tradeoff" },
            { "baseAttrId": 2, "attrId": 0, "value": "Low", "rationale": "" }
        ]
    });
    let (status, created) = client.send(Method::POST, "/api/environments", prod).await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["environment_id"].as_i64().unwrap() >= 0);

    let (_, stored) = client.get("/api/environments/name/Prod").await;
    let tensions = stored["tensions"].as_array().unwrap();
    assert_eq!(tensions.len(), 2);
    assert!(tensions.contains(&json!({ "baseAttrId": 0, "attrId": 1, "value": "High", "rationale": "tradeoff" })));
    assert!(tensions.contains(&json!({ "baseAttrId": 2, "attrId": 0, "value": "Low", "rationale": "" })));

    let query = format!("{}&environment=Prod", client.query());
    let resp = route(&client.registry, &Method::GET, "/api/assets/values", Some(&query), b"");
    let (status, values) = read(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(values.as_array().unwrap().len(), 4);

    let bad = json!({
        "name": "Dev",
        "shortCode": "DEV",
        "description": "",
        "tensions": [{ "baseAttrId": 0, "attrId": 9, "value": "High", "rationale": "" }]
    });
    let (status, _) = client.send(Method::POST, "/api/environments", bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_goal_outlines() {
    let client = Client::start().await;
    let goal = json!({
        "name": "Backup data",
        "originator": "ops",
        "environmentProperties": [{ "environmentName": "Day", "definition": "Nightly backups" }]
    });
    let (status, created) = client.send(Method::POST, "/api/goals", goal).await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["goal_id"].is_i64());

    let (_, full) = client.get("/api/goals/name/Backup%20data").await;
    assert_eq!(full["environmentProperties"][0]["definition"], "Nightly backups");

    let (status, outlines) = client.get("/api/goals/outlines").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outlines["Backup data"]["environmentProperties"], json!([]));
    assert_eq!(outlines["Backup data"]["originator"], "ops");
}

#[tokio::test]
async fn test_dependency_wildcards() {
    let client = Client::start().await;
    for (env, depender, dependee, dependency) in [
        ("Day", "Operator", "Admin", "Backup"),
        ("Day", "Auditor", "Admin", "Logs"),
        ("Night", "Operator", "Admin", "Backup"),
    ] {
        let (status, _) = client
            .send(
                Method::POST,
                "/api/dependencies",
                json!({
                    "environmentName": env,
                    "depender": depender,
                    "dependee": dependee,
                    "dependencyType": "goal",
                    "dependency": dependency
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, all) = client
        .get("/api/dependencies/environment/all/depender/all/dependee/all/dependency/all")
        .await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, operators) = client
        .get("/api/dependencies/environment/all/depender/Operator/dependee/all/dependency/all")
        .await;
    assert_eq!(operators.as_array().unwrap().len(), 2);

    let (status, _) = client
        .get("/api/dependencies/environment/Day/depender/Operator/dependee/Admin/dependency/Logs")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, deleted) = client
        .delete("/api/dependencies/environment/all/depender/Operator/dependee/all/dependency/Backup")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], 2);

    let (_, remaining) = client.get("/api/dependencies").await;
    assert_eq!(remaining.as_object().unwrap().len(), 1);
    assert!(remaining.get("Day/Auditor/Admin/Logs").is_some());
}

#[tokio::test]
async fn test_stale_version_conflicts() {
    let client = Client::start().await;
    let (_, created) = client.send(Method::POST, "/api/assets", server_a()).await;
    let path = format!("/api/assets/id/{}", created["asset_id"]);

    let (_, current) = client.get(&path).await;
    assert_eq!(current["version"], 1);

    let mut first = current.clone();
    first["description"] = json!("first edit");
    assert_eq!(client.send(Method::PUT, &path, first).await.0, StatusCode::OK);

    let mut stale = current;
    stale["description"] = json!("stale edit");
    let (status, _) = client.send(Method::PUT, &path, stale).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, stored) = client.get(&path).await;
    assert_eq!(stored["description"], "first edit");
    assert_eq!(stored["version"], 2);
}

#[tokio::test]
async fn test_health_reports_stats() {
    let client = Client::start().await;
    client.send(Method::POST, "/api/assets", server_a()).await;

    let (status, health) = client.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["sessions"], 1);
    assert_eq!(health["stats"]["asset_count"], 1);
}
