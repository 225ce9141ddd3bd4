//! HTTP-level tests for the datapack and card endpoints

use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use slasherz_server::config::Config;
use slasherz_server::db;
use slasherz_server::routes::build_router;
use slasherz_server::state::AppState;
use slasherz_server::storage::ImageStore;

const ADMIN_IP: &str = "127.0.0.1";

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.datapack.dir = dir.path().join("data");
        config.datapack.hasher_command = None;
        config.storage.image_dir = dir.path().join("images");
        config.access.allowed_ips = vec![ADMIN_IP.to_string()];

        let pool = db::create_memory_pool().await.unwrap();
        let images = ImageStore::with_local_storage(config.storage.image_dir.clone());
        let state = AppState::new(&config, pool, images);

        Self {
            router: build_router(state),
            _dir: dir,
        }
    }

    async fn raw(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.raw(request).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body.to_string(), None)).await
    }

    async fn admin_post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body.to_string(), Some(ADMIN_IP)))
            .await
    }

    async fn create_card(&self, id: &str, name: &str) -> Value {
        let (status, card) = self
            .admin_post(
                "/api/cards",
                json!({
                    "id": id,
                    "code": format!("SLZ-{}", id),
                    "name": name,
                    "type": "survivant",
                    "dimension": "nature",
                    "level": 2,
                    "rarity": "rare"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", card);
        card
    }

    async fn publish(&self, kind: &str) -> (StatusCode, Value) {
        self.admin_post("/api/datapack/publish", json!({ "kind": kind }))
            .await
    }
}

fn json_request(method: &str, uri: &str, body: String, forwarded: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(ip) = forwarded {
        builder = builder.header("x-forwarded-for", ip);
    }
    builder.body(Body::from(body)).unwrap()
}

fn ids(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_sync_without_datapack_is_server_error() {
    let app = TestApp::new().await;

    let (status, body) = app.post_json("/api/datapack/sync", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "catalog_unavailable");

    let (status, _) = app
        .post_json("/api/datapack/hashcheck", json!({ "hash": "00" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_version_missing_then_published() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/datapack/version").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.create_card("c1", "Jason").await;
    let (status, published) = app.publish("minor").await;
    assert_eq!(status, StatusCode::OK, "{}", published);
    assert_eq!(published["version"], "0.1.0");
    assert_eq!(published["card_count"], 1);

    let (status, version) = app.get("/api/datapack/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["version"], "0.1.0");
    assert_eq!(version["last_update"], published["last_update"]);

    let (_, published) = app.publish("majeur").await;
    assert_eq!(published["version"], "1.0.0");
    let (_, published) = app.publish("patch").await;
    assert_eq!(published["version"], "1.0.1");
}

#[tokio::test]
async fn test_publish_rejections() {
    let app = TestApp::new().await;

    let (status, body) = app.publish("minor").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    app.create_card("c1", "Jason").await;
    let (status, body) = app.publish("huge").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_version");

    // Neither refusal consumed a version
    let (status, _) = app.get("/api/datapack/version").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_require_allowed_ip() {
    let app = TestApp::new().await;
    app.create_card("c1", "Jason").await;

    // No forwarded header and no peer address
    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/datapack/publish",
            json!({ "kind": "patch" }).to_string(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/datapack/publish",
            json!({ "kind": "patch" }).to_string(),
            Some("203.0.113.9"),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut request = json_request(
        "POST",
        "/api/datapack/publish",
        json!({ "kind": "patch" }).to_string(),
        None,
    );
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["version"], "0.0.1");

    // Reads stay public
    let (status, list) = app.get("/api/cards").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
}

#[tokio::test]
async fn test_full_sync() {
    let app = TestApp::new().await;
    app.create_card("b", "Freddy").await;
    app.create_card("a", "Jason").await;
    app.publish("minor").await;

    for body in ["", "  ", "null", "{}"] {
        let (status, sync) = app
            .send(json_request("POST", "/api/datapack/sync", body.to_string(), None))
            .await;
        assert_eq!(status, StatusCode::OK, "body {:?}: {}", body, sync);
        assert_eq!(sync["mode"], "full");
        assert_eq!(sync["version"], "0.1.0");
        assert_eq!(ids(&sync["to_update"]), vec!["a", "b"]);
        assert!(sync["to_delete"].as_array().unwrap().is_empty());
        assert_eq!(sync["datapack"]["cards"].as_array().unwrap().len(), 2);
        assert_eq!(sync["datapack"]["version"], "0.1.0");
    }
}

#[tokio::test]
async fn test_diff_sync() {
    let app = TestApp::new().await;
    app.create_card("a", "Jason").await;
    app.create_card("b", "Freddy").await;
    app.publish("minor").await;

    let (_, full) = app.post_json("/api/datapack/sync", Value::Null).await;
    let datapack = full["datapack"].clone();

    // Returning the server's own datapack changes nothing
    let (status, sync) = app.post_json("/api/datapack/sync", datapack.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sync["mode"], "diff");
    assert!(sync["to_update"].as_array().unwrap().is_empty());
    assert!(sync["to_delete"].as_array().unwrap().is_empty());

    let client = json!({
        "cards": [
            { "id": "a", "last_updated": "2000-01-01T00:00:00Z" },
            { "id": "gone", "last_updated": "2000-01-01T00:00:00Z" },
            { "id": "b", "last_updated": datapack["cards"][1]["last_updated"] }
        ]
    });
    let (status, sync) = app.post_json("/api/datapack/sync", client).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sync["mode"], "diff");
    assert_eq!(ids(&sync["to_update"]), vec!["a"]);
    assert_eq!(ids(&sync["to_delete"]), vec!["gone"]);
    // The full datapack is always attached
    assert_eq!(sync["datapack"], datapack);

    let (status, sync) = app.post_json("/api/datapack/sync", json!({ "cards": [] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sync["mode"], "diff");
    assert_eq!(ids(&sync["to_update"]), vec!["a", "b"]);
}

#[tokio::test]
async fn test_sync_rejects_malformed_client_data() {
    let app = TestApp::new().await;
    app.create_card("a", "Jason").await;
    app.publish("minor").await;

    for body in ["{not json", "[]", r#"{"cards": 3}"#, r#"{"cards": [{"name": "x"}]}"#] {
        let (status, error) = app
            .send(json_request("POST", "/api/datapack/sync", body.to_string(), None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(error["error"], "invalid_client_data");
    }
}

#[tokio::test]
async fn test_hashcheck() {
    let app = TestApp::new().await;
    app.create_card("a", "Jason").await;
    app.publish("minor").await;

    let (status, check) = app.post_json("/api/datapack/hashcheck", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["is_same"], false);
    let server_hash = check["server_hash"].as_str().unwrap().to_string();
    assert_eq!(server_hash.len(), 128);

    let (_, check) = app
        .post_json("/api/datapack/hashcheck", json!({ "hash": server_hash }))
        .await;
    assert_eq!(check["is_same"], true);

    let (_, check) = app
        .post_json(
            "/api/datapack/hashcheck",
            json!({ "hash": server_hash.to_uppercase() }),
        )
        .await;
    assert_eq!(check["is_same"], false);

    // Any catalog change moves the digest
    app.create_card("b", "Freddy").await;
    app.admin_post("/api/datapack/export", json!({})).await;
    let (_, check) = app
        .post_json("/api/datapack/hashcheck", json!({ "hash": server_hash }))
        .await;
    assert_eq!(check["is_same"], false);
}

#[tokio::test]
async fn test_export_keeps_version() {
    let app = TestApp::new().await;
    app.create_card("a", "Jason").await;
    app.publish("patch").await;
    app.create_card("b", "Freddy").await;

    let (status, exported) = app.admin_post("/api/datapack/export", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", exported);
    assert_eq!(exported["version"], "0.0.1");
    assert_eq!(exported["card_count"], 2);

    let (_, sync) = app.post_json("/api/datapack/sync", json!({})).await;
    assert_eq!(ids(&sync["to_update"]), vec!["a", "b"]);
}

#[tokio::test]
async fn test_card_crud() {
    let app = TestApp::new().await;
    let card = app.create_card("a", "Jason").await;
    assert_eq!(card["image_name"], "a.png");
    assert_eq!(card["type"], "survivant");

    let (status, _) = app.get("/api/cards/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .send(json_request(
            "PUT",
            "/api/cards/a",
            json!({
                "code": "SLZ-a",
                "name": "Jason Voorhees",
                "type": "victime",
                "dimension": "enfer"
            })
            .to_string(),
            Some(ADMIN_IP),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["name"], "Jason Voorhees");
    assert_eq!(updated["level"], Value::Null);

    app.publish("minor").await;
    let (_, sync) = app.post_json("/api/datapack/sync", json!({})).await;
    assert_eq!(sync["datapack"]["cards"][0]["level"], -1);
    assert_eq!(sync["datapack"]["cards"][0]["type"], "victime");

    let delete = Request::delete("/api/cards/a")
        .header("x-forwarded-for", ADMIN_IP)
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let delete = Request::delete("/api/cards/a")
        .header("x-forwarded-for", ADMIN_IP)
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(delete).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_image_upload_and_serve() {
    let app = TestApp::new().await;
    app.create_card("a", "Jason").await;

    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake image data";
    let boundary = "slasherzboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"jason.png\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(png);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let upload = Request::post("/api/cards/a/image")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header("x-forwarded-for", ADMIN_IP)
        .body(Body::from(body))
        .unwrap();
    let (status, card) = app.send(upload).await;
    assert_eq!(status, StatusCode::OK, "{}", card);
    assert_eq!(card["image_name"], "a.png");

    let (status, headers, data) = app
        .raw(Request::get("/images/a.png").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(&data[..], png);

    let (status, _) = app.get("/images/missing.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/images/a.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unversioned_datapack_hashes_as_served() {
    use slasherz_server::datapack::{digest, Blake2bHasher, CatalogSnapshot};

    let app = TestApp::new().await;
    app.create_card("b", "Freddy").await;
    app.create_card("a", "Jason").await;

    let (status, exported) = app.admin_post("/api/datapack/export", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", exported);
    assert_eq!(exported["version"], Value::Null);

    let (_, sync) = app.post_json("/api/datapack/sync", json!({})).await;
    assert_eq!(sync["version"], Value::Null);
    assert!(sync["datapack"].get("version").is_none());

    let served = serde_json::to_vec(&sync["datapack"]).unwrap();
    let client_hash = digest(&CatalogSnapshot::from_json(&served).unwrap(), &Blake2bHasher).unwrap();

    let (_, check) = app
        .post_json("/api/datapack/hashcheck", json!({ "hash": client_hash }))
        .await;
    assert_eq!(check["is_same"], true);
}
