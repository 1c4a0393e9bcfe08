//! Common test utilities for in-process API testing.
//!
//! The fixture builds the real router over a temporary SQLite registry and
//! an in-memory counter store wrapped in a [`FlakyCounterStore`], so tests
//! can inject counter faults.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ticketgate_core::{
    testing::FlakyCounterStore, AdmissionConfig, AdmissionService, AuthConfig, AuthMethod,
    CacheConfig, Config, CounterStore, DatabaseConfig, MemoryCounterStore, QuotaLedger,
    ServerConfig, SqliteRegistry, TokenIssuer, TrustedHeaderAuthenticator, USER_ID_HEADER,
};
use ticketgate_server::{api::create_router, state::AppState};

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_publish() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post_as(1, "/api/v1/tickets", json!({
///         "title": "Meetup", "quota": 10, "mode": "public"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Counter store with fault injection
    pub counter_store: Arc<FlakyCounterStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            auth: AuthConfig {
                method: AuthMethod::TrustedHeader,
                api_key: None,
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            cache: CacheConfig::default(),
            admission: AdmissionConfig::default(),
        };

        let registry =
            Arc::new(SqliteRegistry::new(&db_path).expect("Failed to create registry"));
        let counter_store = Arc::new(FlakyCounterStore::new(MemoryCounterStore::new()));
        let store: Arc<dyn CounterStore> = counter_store.clone();

        let admission = AdmissionService::new(
            registry.clone(),
            registry,
            QuotaLedger::new(store.clone(), config.admission.quota_ttl()),
            TokenIssuer::new(store, config.admission.token_length),
            &config.admission,
        );

        let state = Arc::new(AppState::new(
            config,
            Arc::new(TrustedHeaderAuthenticator::new()),
            admission,
        ));

        Self {
            router: create_router(state),
            counter_store,
            temp_dir,
        }
    }

    /// Send an unauthenticated GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    pub async fn get_as(&self, user_id: u64, path: &str) -> TestResponse {
        self.request("GET", path, Some(user_id), None).await
    }

    pub async fn post_as(&self, user_id: u64, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(user_id), Some(body)).await
    }

    /// POST without a body, for query-driven endpoints.
    pub async fn post_empty_as(&self, user_id: u64, path: &str) -> TestResponse {
        self.request("POST", path, Some(user_id), None).await
    }

    pub async fn patch_as(&self, user_id: u64, path: &str, body: Option<Value>) -> TestResponse {
        self.request("PATCH", path, Some(user_id), body).await
    }

    pub async fn delete_as(&self, user_id: u64, path: &str) -> TestResponse {
        self.request("DELETE", path, Some(user_id), None).await
    }

    /// Publish a ticket owned by `owner` and return its id.
    pub async fn publish(&self, owner: u64, quota: u32, mode: &str) -> String {
        let response = self
            .post_as(
                owner,
                "/api/v1/tickets",
                serde_json::json!({ "title": "Meetup", "quota": quota, "mode": mode }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"]
            .as_str()
            .expect("ticket id in response")
            .to_string()
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        user_id: Option<u64>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(user_id) = user_id {
            request_builder = request_builder.header(USER_ID_HEADER, user_id.to_string());
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse { status, body }
    }
}
