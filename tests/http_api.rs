//! HTTP round trips through the full middleware stack.

use std::sync::Arc;

use serde_json::{json, Value};

use confgate::http::X_REQUEST_ID;
use confgate::storage::MemoryStore;

mod common;

struct Api {
    base: String,
    client: reqwest::Client,
    kv: Arc<confgate::kv::MemoryKv>,
    _shutdown: confgate::Shutdown,
}

impl Api {
    async fn start() -> Self {
        let config = common::test_config();
        let (service, kv) = common::service_with(Arc::new(MemoryStore::new()), config.clone());
        let (addr, shutdown) = common::spawn_server(service, &config).await;
        Self {
            base: format!("http://{}", addr),
            client: common::http_client(),
            kv,
            _shutdown: shutdown,
        }
    }

    async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut request = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let res = request.send().await.expect("server unreachable");
        let status = res.status().as_u16();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        self.call(reqwest::Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        self.call(reqwest::Method::PUT, path, Some(body)).await
    }
}

#[tokio::test]
async fn test_health_and_request_id() {
    let api = Api::start().await;

    let res = api
        .client
        .get(format!("{}/healthz", api.base))
        .header(X_REQUEST_ID, "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers().get(X_REQUEST_ID).unwrap(), "req-123");

    let res = api.client.get(format!("{}/healthz", api.base)).send().await.unwrap();
    let generated = res.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_full_lifecycle() {
    let api = Api::start().await;

    let (status, body) = api.post("/v1/namespaces", json!({ "name": "billing", "environment": "prod" })).await;
    assert_eq!(status, 201);
    assert_eq!(body["msg"], "created");
    let ns = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["outdated"], true);

    let (status, body) = api
        .post(
            "/v1/config-files",
            json!({ "namespace_id": ns, "filename": "app.conf", "config": "# port\nport=80\nbogus" }),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["full_name"], "billing/prod/app.conf");
    assert_eq!(body["data"]["items"], 1);
    assert_eq!(body["data"]["warnings"][0]["reason"], "missing_separator");
    let file = body["data"]["id"].as_i64().unwrap();

    let (status, body) = api.post(&format!("/v1/namespaces/{}/publish", ns), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["key"], "/confgate/billing/prod");
    assert_eq!(body["data"]["flag_cleared"], true);
    assert_eq!(
        api.kv.get("/confgate/billing/prod").as_deref(),
        Some("[app.conf]\n# port\nport=80\n")
    );

    let (_, body) = api.get(&format!("/v1/namespaces/{}", ns)).await;
    assert_eq!(body["data"]["outdated"], false);
    assert_eq!(body["data"]["config_files"][0]["id"], file);

    let (status, body) = api.put(&format!("/v1/config-files/{}", file), json!({ "config": "port=8080\nhost=a" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["updated"], 1);
    assert_eq!(body["data"]["inserted"], 1);
    assert_eq!(body["data"]["dirtied"], json!([ns]));

    let (_, body) = api.get(&format!("/v1/config-files/{}", file)).await;
    // the submitted line carried no comment, so the old one is replaced
    assert_eq!(body["data"]["config"], "port=8080\nhost=a");

    let (_, body) = api.get(&format!("/v1/namespaces/{}", ns)).await;
    assert_eq!(body["data"]["outdated"], true);

    let (status, body) = api.put(&format!("/v1/namespaces/{}", ns), json!({ "config_files": [] })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["to_remove"], json!([file]));

    let (_, body) = api.get(&format!("/v1/namespaces/{}/watch", ns)).await;
    assert_eq!(body["data"]["key"], "/confgate/billing/prod");
    assert_eq!(body["data"]["endpoints"], json!(["mem://default"]));

    let (_, body) = api.get("/v1/namespaces").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = api.get("/v1/config-files").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_error_statuses() {
    let api = Api::start().await;

    let (status, body) = api.get("/v1/namespaces/99").await;
    assert_eq!(status, 404);
    assert_eq!(body["data"], Value::Null);
    assert!(body["msg"].as_str().unwrap().contains("not found"));

    let (status, _) = api.post("/v1/namespaces", json!({ "name": "billing" })).await;
    assert_eq!(status, 201);
    let (status, _) = api.post("/v1/namespaces", json!({ "name": "billing" })).await;
    assert_eq!(status, 409);

    let (status, _) = api.post("/v1/namespaces", json!({ "name": "bad/name" })).await;
    assert_eq!(status, 422);

    let (status, _) = api.put("/v1/namespaces/1", json!({ "config_files": [12345] })).await;
    assert_eq!(status, 422);

    api.kv.set_failing(true);
    let (status, body) = api.post("/v1/namespaces/1/publish", json!({})).await;
    assert_eq!(status, 502);
    assert!(body["msg"].as_str().unwrap().contains("Publish failed"));
}

#[tokio::test]
async fn test_body_limit() {
    let mut config = common::test_config();
    config.listener.max_body_bytes = 64;
    let (service, _) = common::service_with(Arc::new(MemoryStore::new()), config.clone());
    let (addr, _shutdown) = common::spawn_server(service, &config).await;

    let res = common::http_client()
        .put(format!("http://{}/v1/config-files/1", addr))
        .json(&json!({ "config": "x".repeat(1024) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);
}
