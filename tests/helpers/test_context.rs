//! Test context for unified test setup
//!
//! Wires an in-memory store behind the real services and router, and mints
//! identity tokens the router accepts.

use std::sync::Arc;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use tower::ServiceExt;
use goloop::api::{build_router, AppState};
use goloop::config::Settings;
use goloop::database::{EventStore, MemoryStore};
use goloop::models::{Event, User, UserRole};
use goloop::services::identity::Claims;
use goloop::services::{RedisService, ServiceFactory};

use super::test_data::{test_user, ADMIN_ID};

pub const TEST_SECRET: &str = "goloop-test-secret";

/// Settings for tests: no rate limiting, no Redis relay
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.identity.jwt_secret = TEST_SECRET.to_string();
    settings.identity.bootstrap_admins = vec![ADMIN_ID.to_string()];
    settings.rate_limit.registrations_per_minute = 0;
    settings.features.live_updates = false;
    settings
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub services: ServiceFactory,
    pub router: Router,
    pub settings: Settings,
}

impl TestContext {
    /// Create a new test context with all components initialized
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    /// Create a new test context with custom configuration
    pub fn with_settings(settings: Settings) -> Self {
        Self::with_redis(settings, None)
    }

    /// Create a test context whose services talk to the given Redis
    pub fn with_redis(settings: Settings, redis: Option<Arc<RedisService>>) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn EventStore> = store.clone();
        let services = ServiceFactory::new(&settings, dyn_store, redis).expect("Failed to build services");
        let router = build_router(AppState::new(&settings, services.clone()));

        Self {
            store,
            services,
            router,
            settings,
        }
    }

    /// Store an event verbatim and return it
    pub async fn seed_event(&self, event: Event) -> Event {
        self.store.put_event(event.clone()).await;
        event
    }

    /// Store a user with the given role
    pub async fn seed_user(&self, uid: &str, role: UserRole) -> User {
        let user = test_user(uid, role);
        self.store.put_user(user.clone()).await;
        user
    }

    pub async fn event(&self, event: &Event) -> Event {
        self.store
            .get_event(event.id)
            .await
            .expect("Store read failed")
            .expect("Event disappeared")
    }

    pub async fn user(&self, uid: &str) -> User {
        self.store
            .get_user(uid)
            .await
            .expect("Store read failed")
            .expect("User missing")
    }

    /// Bearer token for `uid`, valid for an hour
    pub fn token(&self, uid: &str) -> String {
        let claims = Claims {
            sub: uid.to_string(),
            name: Some(format!("{} name", uid)),
            email: Some(format!("{}@goloop.test", uid)),
            picture: None,
            exp: (chrono::Utc::now().timestamp() + 3600) as u64,
            iss: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes()))
            .expect("Failed to sign token")
    }

    pub fn request(&self, method: Method, uri: &str, user: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(uid) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(uid)));
        }

        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("Failed to build request"),
            None => builder.body(Body::empty()).expect("Failed to build request"),
        }
    }

    /// Run one request through the router and decode the JSON answer
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.expect("Router failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, serde_json::Value) {
        self.send(self.request(Method::GET, uri, user, None)).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        self.send(self.request(Method::POST, uri, user, body)).await
    }

    pub async fn put(&self, uri: &str, user: Option<&str>, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(self.request(Method::PUT, uri, user, Some(body))).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
