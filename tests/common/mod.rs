#![allow(dead_code)]

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use tokengate::{
    ServerConfig,
    auth::TokenService,
    cleanup::CleanupSchedule,
    clock::ManualClock,
    create_app,
    db::{Database, UserRole},
    jwt::TokenConfig,
    password,
    rate_limit::LoginQuota,
};
use tower::ServiceExt;

pub const START: u64 = 1_700_006_400;
pub const ACCESS_TTL: u64 = 60;
pub const REFRESH_TTL: u64 = 7 * 24 * 60 * 60;
pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub service: TokenService,
}

pub async fn setup() -> TestApp {
    setup_with_quota(LoginQuota {
        per_second: NonZeroU32::new(1000).unwrap(),
        burst: NonZeroU32::new(1000).unwrap(),
    })
    .await
}

pub async fn setup_with_quota(login_quota: LoginQuota) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let clock = Arc::new(ManualClock::new(START));

    let config = ServerConfig {
        db: db.clone(),
        tokens: TokenConfig {
            secret: b"integration-test-secret-0123456789".to_vec(),
            access_ttl_secs: ACCESS_TTL,
            refresh_ttl_secs: REFRESH_TTL,
        },
        clock: clock.clone(),
        secure_cookies: false,
        trust_forwarded_for: false,
        login_quota,
        cleanup: CleanupSchedule::default(),
    };

    TestApp {
        app: create_app(&config),
        service: config.token_service(),
        db,
        clock,
    }
}

pub async fn add_user(db: &Database, username: &str, role: UserRole) {
    let hash = password::hash_password(PASSWORD).await.unwrap();
    db.users()
        .create_local(username, &hash, role, None, None, START)
        .await
        .unwrap();
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn clears_cookie(&self, name: &str) -> bool {
        self.set_cookies()
            .iter()
            .any(|c| c.starts_with(&format!("{}=;", name)) && c.contains("Max-Age=0"))
    }

    pub fn str_field(&self, field: &str) -> String {
        self.body[field]
            .as_str()
            .unwrap_or_else(|| panic!("missing {field} in {}", self.body))
            .to_string()
    }
}

/// Request builder shorthand.
pub struct Call<'a> {
    method: Method,
    uri: &'a str,
    body: Option<String>,
    bearer: Option<&'a str>,
    headers: Vec<(&'a str, String)>,
}

impl<'a> Call<'a> {
    pub fn new(method: Method, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            body: None,
            bearer: None,
            headers: Vec::new(),
        }
    }

    pub fn get(uri: &'a str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &'a str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn raw(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn bearer(mut self, token: &'a str) -> Self {
        self.bearer = Some(token);
        self
    }

    pub fn header(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub async fn send(self, app: &Router) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if self.body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = self.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(self.body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Log in and return (access_token, refresh_token).
pub async fn login(app: &Router, username: &str) -> (String, String) {
    let response = Call::post("/login")
        .json(serde_json::json!({ "username": username, "password": PASSWORD }))
        .send(app)
        .await;
    assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
    (
        response.str_field("accessToken"),
        response.str_field("refreshToken"),
    )
}

pub async fn rotate(app: &Router, refresh_token: &str) -> TestResponse {
    Call::post("/jwt/refresh")
        .json(serde_json::json!({ "refreshToken": refresh_token }))
        .send(app)
        .await
}
