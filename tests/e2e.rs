//! End-to-end tests against a gateway bound to a real listener.

use std::sync::Arc;

use serde_json::Value;

use hyperdag_gateway::auth::ApiKeyStore;
use hyperdag_gateway::grants::GrantCatalog;
use hyperdag_gateway::rate_limit::RateLimiter;
use hyperdag_gateway::state::AppState;
use hyperdag_gateway::router;

const DEFAULT_KEY: &str = "e2e-default-key";
const PREMIUM_KEY: &str = "e2e-premium-key";

async fn spawn_gateway() -> String {
    let keys = ApiKeyStore::new();
    keys.insert(DEFAULT_KEY, "e2e default", vec![]);
    keys.insert(PREMIUM_KEY, "e2e premium", vec!["premium".to_string()]);

    let state = Arc::new(AppState {
        keys,
        limiter: RateLimiter::new(true),
        grants: GrantCatalog::seed(),
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn health_and_metrics_over_the_wire() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    // generate one counted request, then scrape
    client
        .get(format!("{base}/api/v1/grants"))
        .header("x-api-key", PREMIUM_KEY)
        .send()
        .await
        .unwrap();

    let metrics = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("hyperdag_requests_total"));
    assert!(metrics.contains("hyperdag_quota_entries"));
}

#[tokio::test]
async fn default_tier_exhausts_after_ten_requests() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    for n in 1..=10 {
        let resp = client
            .get(format!("{base}/api/v1/grants"))
            .header("x-api-key", DEFAULT_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "request {n} should pass");
    }

    let resp = client
        .get(format!("{base}/api/v1/grants"))
        .header("x-api-key", DEFAULT_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);

    let retry_after: u64 = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert!(retry_after >= 1 && retry_after <= 60);
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "0");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn full_key_lifecycle() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    // no key -> 401
    let resp = client
        .get(format!("{base}/api/v1/usage"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // usage before any traffic shows a full window
    let resp = client
        .get(format!("{base}/api/v1/usage"))
        .header("x-api-key", PREMIUM_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tier"], "premium");
    assert_eq!(body["general"]["remaining"], 500);

    // match grants
    let resp = client
        .post(format!("{base}/api/v1/grants/match"))
        .header("x-api-key", PREMIUM_KEY)
        .json(&serde_json::json!({
            "description": "zero-knowledge proof circuits",
            "tags": ["zk"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["matches"][0]["grant"]["id"], "grant_zk_infra");

    // rotate, then only the new key works
    let resp = client
        .post(format!("{base}/api/v1/keys/rotate"))
        .header("x-api-key", PREMIUM_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let new_key = body["api_key"].as_str().unwrap().to_string();

    let resp = client
        .get(format!("{base}/api/v1/grants"))
        .header("x-api-key", PREMIUM_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/api/v1/grants"))
        .header("x-api-key", &new_key)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
