use std::mem;
use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, oneshot};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{ApiResponse, RefreshTokenRequest, TokenPair};
use crate::notify::{
    Cooldown, FORBIDDEN_MESSAGE, NETWORK_ERROR_MESSAGE, NavigatorState, Notice, NotifierState,
    SERVER_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE,
};
use crate::routes::Route;
use crate::session::SessionState;
use crate::view_state::UiStateHandle;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const REFRESH_PATH: &str = "/auth/refresh";

// --- Request Description ---

/// ApiRequest
///
/// One logical call against the REST API, kept as plain data so it can be sent again after
/// a token renewal.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Public calls (login, registration, OTP) never trigger session recovery: a 401 or 403
    /// there is an ordinary rejection, not an expired session.
    pub public: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, public: false }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Flattens a serialisable parameter struct into query pairs. Null fields are skipped and
    /// arrays become repeated keys.
    pub fn query<Q: Serialize + ?Sized>(mut self, params: &Q) -> Result<Self, ApiError> {
        let value = serde_json::to_value(params).map_err(|e| ApiError::Encode(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(ApiError::Encode("query parameters must serialise to an object".into()));
        };
        for (key, value) in fields {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    self.query.extend(items.into_iter().filter_map(scalar).map(|v| (key.clone(), v)));
                }
                other => {
                    if let Some(v) = scalar(other) {
                        self.query.push((key, v));
                    }
                }
            }
        }
        Ok(self)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?);
        Ok(self)
    }
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

// --- Refresh Coordination ---

#[derive(Debug, Clone)]
enum RefreshOutcome {
    Renewed(String),
    Failed(String),
}

/// Single-flight state: whether a renewal is running and who is parked on it.
#[derive(Debug, Default)]
struct RefreshCoordinator {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

// --- Client ---

struct ClientInner {
    base_url: String,
    client: reqwest::Client,
    session: SessionState,
    ui: UiStateHandle,
    notifier: NotifierState,
    navigator: NavigatorState,
    network_toasts: Cooldown,
    server_toasts: Cooldown,
    refresh: Mutex<RefreshCoordinator>,
}

/// HttpClient
///
/// The authenticated REST client every feature call goes through.
///
/// Behaviour:
/// - attaches `Authorization: Bearer <token>` from the session and an `x-request-id`
///   that stays the same across a retry;
/// - on 401, renews the token through `/auth/refresh` and retries once. Concurrent 401s
///   share a single renewal: the first caller performs it, the rest wait for its outcome;
/// - a failed renewal or a 403 ends the session (storage cleared, UI reset, toast, and a
///   redirect to the login screen);
/// - transport failures and 5xx answers raise a toast, at most one per cooldown window each.
///
/// Cloning is cheap; clones share the session and the refresh coordinator.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl HttpClient {
    pub fn new(
        config: &AppConfig,
        session: SessionState,
        ui: UiStateHandle,
        notifier: NotifierState,
        navigator: NavigatorState,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url: config.api_base_url.trim_end_matches('/').to_string(),
                client,
                session,
                ui,
                notifier,
                navigator,
                network_toasts: Cooldown::new(config.toast_cooldown),
                server_toasts: Cooldown::new(config.toast_cooldown),
                refresh: Mutex::new(RefreshCoordinator::default()),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    pub fn ui(&self) -> &UiStateHandle {
        &self.inner.ui
    }

    pub fn notifier(&self) -> &NotifierState {
        &self.inner.notifier
    }

    pub fn navigator(&self) -> &NavigatorState {
        &self.inner.navigator
    }

    /// send
    ///
    /// Sends `request` with full session handling and returns the successful response.
    /// Every non-2xx outcome is mapped to an `ApiError`.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "api_request",
            method = %request.method,
            path = %request.path,
            req_id = %request_id,
        );
        self.send_with_recovery(&request, request_id).instrument(span).await
    }

    /// Sends and decodes the whole `{status, message, data}` envelope.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<ApiResponse<T>, ApiError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Sends and returns the envelope's `data`, which must be present.
    pub async fn fetch_data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.fetch::<T>(request)
            .await?
            .data
            .ok_or_else(|| ApiError::Decode("response envelope carried no data".into()))
    }

    /// For acknowledgement-only endpoints: returns the envelope message, or an empty
    /// string when the body is empty or not an envelope.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<String, ApiError> {
        let response = self.send(request).await?;
        let text = response.text().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(serde_json::from_str::<ApiResponse<Value>>(&text)
            .map(|envelope| envelope.message)
            .unwrap_or_default())
    }

    async fn send_with_recovery(&self, request: &ApiRequest, request_id: Uuid) -> Result<Response, ApiError> {
        let token = self.inner.session.access_token();
        let response = self.dispatch(request, token.as_deref(), request_id).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.public {
            return self.check_status(request, response).await;
        }

        tracing::debug!("401 received, recovering session");
        let renewed = self.recover_from_unauthorized(token.as_deref()).await?;

        let retry = self.dispatch(request, Some(&renewed), request_id).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("request rejected again after token renewal");
            return Err(ApiError::Unauthorized);
        }
        self.check_status(request, retry).await
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>, request_id: Uuid) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), &url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        match builder.send().await {
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "response received");
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, "transport failure");
                if self.inner.network_toasts.try_fire() {
                    self.inner.notifier.notify(Notice::error(NETWORK_ERROR_MESSAGE));
                }
                Err(ApiError::Network(e))
            }
        }
    }

    async fn check_status(&self, request: &ApiRequest, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::FORBIDDEN && !request.public {
            tracing::warn!("403 received, ending session");
            self.expire_session(FORBIDDEN_MESSAGE);
            return Err(ApiError::Forbidden);
        }

        let message = error_message(response).await;

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), %message, "server error");
            if self.inner.server_toasts.try_fire() {
                self.inner.notifier.notify(Notice::error(SERVER_ERROR_MESSAGE));
            }
            return Err(ApiError::Server { status, message });
        }

        if status == StatusCode::UNAUTHORIZED && !request.public {
            return Err(ApiError::Unauthorized);
        }

        tracing::debug!(status = status.as_u16(), %message, "request rejected");
        Err(ApiError::Http { status, message })
    }

    /// recover_from_unauthorized
    ///
    /// Produces an access token to retry with after a 401, starting at most one renewal
    /// no matter how many requests fail together.
    async fn recover_from_unauthorized(&self, sent_token: Option<&str>) -> Result<String, ApiError> {
        let mut coordinator = self.inner.refresh.lock().await;

        // A renewal that finished while this request was on the wire already settled things.
        if let Some(sent) = sent_token {
            match self.inner.session.access_token() {
                Some(current) if current != sent => {
                    tracing::debug!("token already renewed, retrying with current token");
                    return Ok(current);
                }
                None => return Err(ApiError::SessionExpired),
                Some(_) => {}
            }
        }

        if coordinator.in_flight {
            let (tx, rx) = oneshot::channel();
            coordinator.waiters.push(tx);
            drop(coordinator);
            tracing::debug!("renewal in flight, waiting for its outcome");

            return match rx.await {
                Ok(RefreshOutcome::Renewed(token)) => Ok(token),
                Ok(RefreshOutcome::Failed(reason)) => Err(ApiError::RefreshFailed(reason)),
                Err(_) => Err(ApiError::RefreshFailed("token renewal was abandoned".into())),
            };
        }

        coordinator.in_flight = true;
        drop(coordinator);

        // Detached so a caller that gives up mid-renewal cannot strand the coordinator.
        let client = self.clone();
        let renewal = tokio::spawn(async move { client.run_renewal().await }.in_current_span());
        match renewal.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "token renewal task died");
                // Dropping the senders wakes every waiter with an abandoned renewal.
                drop(self.release_refresh().await);
                Err(ApiError::RefreshFailed(e.to_string()))
            }
        }
    }

    /// run_renewal
    ///
    /// The leader's side of a renewal: calls the refresh endpoint, settles the session and
    /// hands the outcome to everyone parked on the coordinator.
    async fn run_renewal(&self) -> Result<String, ApiError> {
        let held = self.inner.session.refresh_token();
        let outcome = match held.as_deref() {
            Some(refresh_token) => self.renew_tokens(refresh_token).await,
            None => {
                tracing::warn!("no refresh token held, session cannot be renewed");
                Err(ApiError::SessionExpired)
            }
        };

        match outcome {
            Ok((access_token, refresh_token)) => {
                // A logout or a new login while the renewal ran owns the session now.
                let result = if self.inner.session.refresh_token() == held {
                    self.inner.session.update_access_token(access_token.clone());
                    if let Some(refresh_token) = refresh_token {
                        self.inner.session.update_refresh_token(refresh_token);
                    }
                    tracing::info!("access token renewed");
                    Ok(access_token)
                } else {
                    tracing::info!("session changed during renewal, discarding renewed tokens");
                    self.inner.session.access_token().ok_or(ApiError::SessionExpired)
                };

                let waiters = self.release_refresh().await;
                tracing::debug!(waiters = waiters.len(), "handing renewal outcome to waiters");
                let shared = match &result {
                    Ok(token) => RefreshOutcome::Renewed(token.clone()),
                    Err(error) => RefreshOutcome::Failed(error.to_string()),
                };
                for waiter in waiters {
                    let _ = waiter.send(shared.clone());
                }
                result
            }
            Err(error) => {
                let reason = error.to_string();
                let waiters = {
                    let mut coordinator = self.inner.refresh.lock().await;
                    // Expire before releasing the flag so nobody queued behind us starts over.
                    self.expire_session(SESSION_EXPIRED_MESSAGE);
                    coordinator.in_flight = false;
                    mem::take(&mut coordinator.waiters)
                };
                tracing::warn!(waiters = waiters.len(), %reason, "token renewal failed");
                for waiter in waiters {
                    let _ = waiter.send(RefreshOutcome::Failed(reason.clone()));
                }
                Err(error)
            }
        }
    }

    async fn release_refresh(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut coordinator = self.inner.refresh.lock().await;
        coordinator.in_flight = false;
        mem::take(&mut coordinator.waiters)
    }

    /// Calls the refresh endpoint directly, outside of `send`, so its own failure can never
    /// recurse into session recovery.
    async fn renew_tokens(&self, refresh_token: &str) -> Result<(String, Option<String>), ApiError> {
        let url = format!("{}{}", self.inner.base_url, REFRESH_PATH);
        let response = self
            .inner
            .client
            .post(&url)
            .json(&RefreshTokenRequest { refresh_token: refresh_token.to_string() })
            .send()
            .await
            .map_err(|e| ApiError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RefreshFailed(format!("refresh rejected with status {status}")));
        }

        let envelope: ApiResponse<TokenPair> = response
            .json()
            .await
            .map_err(|e| ApiError::RefreshFailed(e.to_string()))?;
        let pair = envelope.data.unwrap_or_default();
        let access_token = pair
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::RefreshFailed("No access token in refresh response".into()))?;

        Ok((access_token, pair.refresh_token.filter(|t| !t.is_empty())))
    }

    /// expire_session
    ///
    /// Forced logout: clears the session in memory and in both stores, forgets the active
    /// tab, tells the user why, and sends them to the login screen.
    pub fn expire_session(&self, message: &str) {
        self.inner.session.clear();
        self.inner.ui.reset();
        self.inner.notifier.notify(Notice::error(message));
        self.inner.navigator.navigate(Route::Login);
    }
}

/// Best-effort extraction of the backend's error message.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiResponse<Value>>(&text)
        .ok()
        .map(|envelope| envelope.message)
        .filter(|m| !m.is_empty())
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}
