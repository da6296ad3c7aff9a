#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
};
use foodshare_admin::{
    AdminConsole, AppConfig, MemoryStorage, MockUploader, RecordingNavigator, RecordingNotifier,
    StorageState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const API_PREFIX: &str = "/api/v1";
const JWT_SECRET: &[u8] = b"mock-backend-secret";
/// `/slow` checks the bearer token only after this long, so a renewal can finish meanwhile.
pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Serialize)]
struct Claims {
    sub: String,
    role: String,
    exp: usize,
    jti: usize,
}

/// Mints a signed access token the way the real backend does; every call yields a new one.
pub fn mint_token(subject: &str, role: &str, serial: usize) -> String {
    let claims = Claims { sub: subject.to_string(), role: role.to_string(), exp: 4_102_444_800, jti: serial };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET)).expect("token encoding")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Succeed,
    Fail,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn has_query(&self, key: &str, value: &str) -> bool {
        self.query_pairs().iter().any(|(k, v)| k == key && v == value)
    }
}

pub struct BackendState {
    valid_token: Mutex<String>,
    refresh_mode: Mutex<RefreshMode>,
    refresh_delay: Duration,
    refresh_calls: AtomicUsize,
    issued: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// MockBackend
///
/// In-process stand-in for the REST API. Only the token it issued last is accepted; any
/// other bearer token gets a 401.
pub struct MockBackend {
    pub address: String,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        Self::spawn_with_delay(Duration::from_millis(150)).await
    }

    pub async fn spawn_with_delay(refresh_delay: Duration) -> Self {
        let state = Arc::new(BackendState {
            valid_token: Mutex::new(mint_token("admin@foodshare.test", "ADMIN", 0)),
            refresh_mode: Mutex::new(RefreshMode::Succeed),
            refresh_delay,
            refresh_calls: AtomicUsize::new(0),
            issued: AtomicUsize::new(1),
            requests: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/refresh", post(refresh))
            .fallback(api_fallback)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { address, state }
    }

    pub fn base_url(&self) -> String {
        format!("{}{}", self.address, API_PREFIX)
    }

    pub fn config(&self) -> AppConfig {
        AppConfig { api_base_url: self.base_url(), ..AppConfig::default() }
    }

    pub fn valid_token(&self) -> String {
        self.state.valid_token.lock().unwrap().clone()
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.state.refresh_mode.lock().unwrap() = mode;
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        let full = format!("{API_PREFIX}{path}");
        self.requests().into_iter().filter(|r| r.path == full).collect()
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<LoginBody>) -> Response {
    if body.password == "wrong-password" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "status": 401, "message": "Invalid credentials" })))
            .into_response();
    }

    let role = if body.email.starts_with("user") { "USER" } else { "ADMIN" };
    let serial = state.issued.fetch_add(1, Ordering::SeqCst);
    let access_token = mint_token(&body.email, role, serial);
    *state.valid_token.lock().unwrap() = access_token.clone();

    Json(json!({
        "status": 200,
        "message": "Success",
        "data": {
            "id": 1,
            "username": "Admin",
            "email": body.email,
            "role": role,
            "gender": "male",
            "accessToken": access_token,
            "refreshToken": format!("refresh-{serial}"),
        }
    }))
    .into_response()
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.refresh_delay).await;

    let mode = *state.refresh_mode.lock().unwrap();
    let has_token = body.get("refreshToken").and_then(Value::as_str).is_some_and(|t| !t.is_empty());
    if mode == RefreshMode::Fail || !has_token {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Refresh token expired" }))).into_response();
    }

    let serial = state.issued.fetch_add(1, Ordering::SeqCst);
    let access_token = mint_token("admin@foodshare.test", "ADMIN", serial);
    *state.valid_token.lock().unwrap() = access_token.clone();

    // snake_case on purpose: the client accepts both spellings.
    Json(json!({
        "status": 200,
        "message": "Token refreshed",
        "data": { "access_token": access_token, "refresh_token": format!("refresh-{serial}") }
    }))
    .into_response()
}

async fn api_fallback(
    State(state): State<Arc<BackendState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let recorded = RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        request_id: header("x-request-id"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state.requests.lock().unwrap().push(recorded);

    let path = uri.path().strip_prefix(API_PREFIX).unwrap_or(uri.path()).to_string();
    match path.as_str() {
        "/always-401" => return StatusCode::UNAUTHORIZED.into_response(),
        "/boom" => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "kaboom" }))).into_response();
        }
        "/slow" => tokio::time::sleep(SLOW_RESPONSE_DELAY).await,
        _ => {}
    }

    let expected = format!("Bearer {}", state.valid_token.lock().unwrap());
    let open = path.starts_with("/auth/");
    if !open && header("authorization").as_deref() != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token expired" }))).into_response();
    }

    if path == "/forbidden" {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "Forbidden" }))).into_response();
    }
    if path == "/admin/posts/404" {
        return (StatusCode::NOT_FOUND, Json(json!({ "status": 404, "message": "Post not found" })))
            .into_response();
    }

    match fixture(&method, &path) {
        Some(data) => Json(json!({ "status": 200, "message": "Success", "data": data })).into_response(),
        None => Json(json!({ "status": 200, "message": "Done" })).into_response(),
    }
}

fn page(content: Value) -> Value {
    let len = content.as_array().map(Vec::len).unwrap_or_default();
    json!({ "content": content, "totalPages": 1, "totalElements": len, "number": 0, "size": 10 })
}

fn fixture(method: &Method, path: &str) -> Option<Value> {
    let data = match (method.as_str(), path) {
        ("GET", "/protected") | ("GET", "/slow") => json!("ok"),
        ("POST", "/auth/register") => json!({
            "id": 2, "username": "newadmin", "email": "new@foodshare.test", "role": "ADMIN"
        }),
        ("GET", "/users/me") => json!({
            "id": 1, "username": "Admin", "email": "admin@foodshare.test", "role": "ADMIN",
            "gender": "female", "dob": "1990-04-12"
        }),
        ("PUT", "/users/update") => json!({
            "id": 1, "username": "Renamed", "email": "admin@foodshare.test", "role": "ADMIN",
            "gender": null
        }),
        ("GET", "/users") => page(json!([{
            "id": 7, "username": "alice", "email": "alice@foodshare.test", "role": "USER",
            "provider": "GOOGLE", "gender": "Female", "createdAt": "2025-01-01T10:00:00"
        }])),
        ("GET", "/admin/posts") => page(json!([{
            "id": 11, "title": "Pho", "content": "Slow-cooked broth", "username": "alice",
            "email": "alice@foodshare.test", "difficulty": "MEDIUM", "prepTime": 30, "cookTime": 240,
            "recipeCategories": ["Soup"], "reactionCounts": { "LIKE": 5, "LOVE": 2 }, "totalShares": 3
        }])),
        ("GET", "/categories") | ("GET", "/recipes/my") | ("GET", "/admin/reports") => page(json!([])),
        ("PUT", p) if p.starts_with("/admin/reports/") => json!({
            "id": 9, "reporterId": 3, "targetType": "POST", "targetId": 11,
            "reason": "Spam", "status": "RESOLVED"
        }),
        ("GET", "/notifications") => page(json!([{
            "id": 1, "title": "Welcome", "body": "Hello", "type": "SYSTEM", "read": false
        }])),
        ("GET", "/notifications/unread-count") => json!(4),
        ("GET", "/admin/users/statistics") => json!({
            "totalUsers": 42, "topInfluencers": [], "recentRegistrations": [], "topPostCreators": []
        }),
        ("GET", "/admin/posts/statistics") => json!({
            "topLikedPosts": [], "totalViolatedPosts": 3, "recentViolatedPosts": []
        }),
        _ => return None,
    };
    Some(data)
}

pub struct ConsoleHarness {
    pub console: AdminConsole,
    pub notifier: RecordingNotifier,
    pub navigator: RecordingNavigator,
    pub durable: Arc<MemoryStorage>,
    pub ephemeral: Arc<MemoryStorage>,
}

pub fn console_for(config: AppConfig) -> ConsoleHarness {
    console_with_storage(config, Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
}

pub fn console_with_storage(
    config: AppConfig,
    durable: Arc<MemoryStorage>,
    ephemeral: Arc<MemoryStorage>,
) -> ConsoleHarness {
    let notifier = RecordingNotifier::new();
    let navigator = RecordingNavigator::new();
    let console = AdminConsole::new(
        config,
        durable.clone() as StorageState,
        ephemeral.clone() as StorageState,
        Arc::new(notifier.clone()),
        Arc::new(navigator.clone()),
        Arc::new(MockUploader::new()),
    )
    .expect("console assembly");

    ConsoleHarness { console, notifier, navigator, durable, ephemeral }
}

pub fn admin_user() -> foodshare_admin::models::User {
    foodshare_admin::models::User {
        id: 1,
        username: "Admin".into(),
        email: "admin@foodshare.test".into(),
        role: foodshare_admin::models::Role::Admin,
        ..Default::default()
    }
}
