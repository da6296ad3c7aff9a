mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{MockBackend, RefreshMode, admin_user, console_for, console_with_storage};
use foodshare_admin::{
    ApiError, ApiRequest, AppConfig, KeyValueStore, MemoryStorage, Route,
    notify::{Cooldown, FORBIDDEN_MESSAGE, NETWORK_ERROR_MESSAGE, SERVER_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE},
    routes::admin::admin_guard,
    storage::keys,
};
use reqwest::StatusCode;
use tokio::task::JoinSet;

const CONCURRENT_REQUESTS: usize = 8;

#[tokio::test]
async fn test_valid_token_passes_straight_through() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), backend.valid_token(), "refresh-0".into(), false);

    let body: String = harness.console.client.fetch_data(ApiRequest::get("/protected")).await.unwrap();

    assert_eq!(body, "ok");
    assert_eq!(backend.refresh_calls(), 0);
    let hits = backend.requests_to("/protected");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].authorization.as_deref(), Some(format!("Bearer {}", backend.valid_token()).as_str()));
    assert!(hits[0].request_id.is_some());
}

#[tokio::test]
async fn test_concurrent_401s_share_a_single_refresh() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), "expired-token".into(), "refresh-0".into(), false);

    let mut tasks = JoinSet::new();
    for _ in 0..CONCURRENT_REQUESTS {
        let client = harness.console.client.clone();
        tasks.spawn(async move { client.fetch_data::<String>(ApiRequest::get("/protected")).await });
    }
    while let Some(joined) = tasks.join_next().await {
        assert_eq!(joined.unwrap().unwrap(), "ok");
    }

    assert_eq!(backend.refresh_calls(), 1, "exactly one refresh for the whole burst");

    let renewed = backend.valid_token();
    assert_eq!(harness.console.session.access_token().as_deref(), Some(renewed.as_str()));

    let hits = backend.requests_to("/protected");
    let retried: Vec<_> = hits
        .iter()
        .filter(|h| h.authorization.as_deref() == Some(format!("Bearer {renewed}").as_str()))
        .collect();
    assert_eq!(retried.len(), CONCURRENT_REQUESTS, "every request retried with the same new token");

    // Each logical request keeps its id across the retry.
    let mut per_id: HashMap<String, usize> = HashMap::new();
    for hit in &hits {
        *per_id.entry(hit.request_id.clone().unwrap()).or_default() += 1;
    }
    assert_eq!(per_id.len(), CONCURRENT_REQUESTS);
    assert!(per_id.values().all(|count| *count == 2));

    // The renewed refresh token stayed in the ephemeral store.
    assert!(harness.ephemeral.get(keys::REFRESH_TOKEN).unwrap().starts_with("refresh-"));
    assert_ne!(harness.ephemeral.get(keys::REFRESH_TOKEN).as_deref(), Some("refresh-0"));
    assert!(harness.durable.get(keys::REFRESH_TOKEN).is_none());
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_failed_refresh_rejects_everyone_and_redirects_once() {
    let backend = MockBackend::spawn().await;
    backend.set_refresh_mode(RefreshMode::Fail);
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), "expired-token".into(), "refresh-0".into(), true);
    harness.console.set_active_tab(foodshare_admin::view_state::ActiveTab::Posts);

    let mut tasks = JoinSet::new();
    for _ in 0..CONCURRENT_REQUESTS {
        let client = harness.console.client.clone();
        tasks.spawn(async move { client.send(ApiRequest::get("/protected")).await });
    }
    let mut failures = 0;
    while let Some(joined) = tasks.join_next().await {
        let error = joined.unwrap().unwrap_err();
        assert!(error.is_session_failure(), "unexpected error: {error:?}");
        failures += 1;
    }

    assert_eq!(failures, CONCURRENT_REQUESTS);
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(harness.navigator.routes(), vec![Route::Login]);
    assert_eq!(harness.notifier.count(SESSION_EXPIRED_MESSAGE), 1);

    assert!(!harness.console.session.is_authenticated());
    for store in [&harness.durable, &harness.ephemeral] {
        assert!(store.get(keys::ACCESS_TOKEN).is_none());
        assert!(store.get(keys::REFRESH_TOKEN).is_none());
        assert!(store.get(keys::USER).is_none());
    }
    assert!(harness.durable.get(keys::ACTIVE_TAB).is_none());
    assert_eq!(harness.console.ui.active_tab(), foodshare_admin::view_state::ActiveTab::Dashboard);
}

#[tokio::test]
async fn test_retried_request_is_not_retried_again() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), "expired-token".into(), "refresh-0".into(), false);

    let result = harness.console.client.send(ApiRequest::get("/always-401")).await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.requests_to("/always-401").len(), 2);
    // The renewal itself succeeded, so the session survives.
    assert!(harness.console.session.is_authenticated());
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_missing_refresh_token_expires_session_and_recovers_after_login() {
    let backend = MockBackend::spawn().await;
    let durable = Arc::new(MemoryStorage::new());
    durable.set(keys::ACCESS_TOKEN, "expired-token").unwrap();
    let harness = console_with_storage(backend.config(), durable, Arc::new(MemoryStorage::new()));
    assert!(harness.console.session.is_authenticated());

    let result = harness.console.client.send(ApiRequest::get("/protected")).await;

    assert!(matches!(result, Err(ApiError::SessionExpired)));
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(harness.navigator.routes(), vec![Route::Login]);
    assert!(!harness.console.session.is_authenticated());

    // The coordinator is free again: a fresh login works end to end.
    harness.console.login("admin@foodshare.test", "correct-horse", false).await.unwrap();
    let body: String = harness.console.client.fetch_data(ApiRequest::get("/protected")).await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_late_401_retries_with_the_already_renewed_token() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), "expired-token".into(), "refresh-0".into(), false);

    // Leaves with the old token and is only judged after the renewal below has finished.
    let late = {
        let client = harness.console.client.clone();
        tokio::spawn(async move { client.fetch_data::<String>(ApiRequest::get("/slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let body: String = harness.console.client.fetch_data(ApiRequest::get("/protected")).await.unwrap();
    assert_eq!(body, "ok");
    assert_eq!(backend.refresh_calls(), 1);

    assert_eq!(late.await.unwrap().unwrap(), "ok");
    assert_eq!(backend.refresh_calls(), 1, "a stale 401 must not start a second renewal");

    let hits = backend.requests_to("/slow");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].authorization.as_deref(), Some("Bearer expired-token"));
    assert_eq!(hits[1].authorization, Some(format!("Bearer {}", backend.valid_token())));
    assert_eq!(hits[0].request_id, hits[1].request_id);
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_late_401_after_failed_refresh_does_not_redirect_again() {
    let backend = MockBackend::spawn().await;
    backend.set_refresh_mode(RefreshMode::Fail);
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), "expired-token".into(), "refresh-0".into(), false);

    let late = {
        let client = harness.console.client.clone();
        tokio::spawn(async move { client.send(ApiRequest::get("/slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let first = harness.console.client.send(ApiRequest::get("/protected")).await;
    assert!(first.unwrap_err().is_session_failure());

    let result = late.await.unwrap();
    assert!(matches!(result, Err(ApiError::SessionExpired)), "unexpected result: {result:?}");
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.requests_to("/slow").len(), 1);
    assert_eq!(harness.navigator.routes(), vec![Route::Login]);
    assert_eq!(harness.notifier.count(SESSION_EXPIRED_MESSAGE), 1);
}

#[tokio::test]
async fn test_aborted_leader_does_not_block_later_requests() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), "expired-token".into(), "refresh-0".into(), false);

    let leader = {
        let client = harness.console.client.clone();
        tokio::spawn(async move { client.send(ApiRequest::get("/protected")).await })
    };
    // The mock refresh takes 150 ms; give up halfway through it.
    tokio::time::sleep(Duration::from_millis(60)).await;
    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    let follow_up = tokio::time::timeout(
        Duration::from_secs(3),
        harness.console.client.fetch_data::<String>(ApiRequest::get("/protected")),
    )
    .await
    .expect("follow-up request hung on an abandoned renewal");

    assert_eq!(follow_up.unwrap(), "ok");
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(harness.console.session.access_token(), Some(backend.valid_token()));
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_logout_during_renewal_keeps_the_session_closed() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), "expired-token".into(), "refresh-0".into(), false);

    let pending = {
        let client = harness.console.client.clone();
        tokio::spawn(async move { client.send(ApiRequest::get("/protected")).await })
    };
    tokio::time::sleep(Duration::from_millis(60)).await;
    harness.console.session.clear();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(ApiError::SessionExpired)), "unexpected result: {result:?}");
    assert_eq!(backend.refresh_calls(), 1);

    let session = harness.console.session.snapshot();
    assert!(!session.is_authenticated);
    assert!(session.access_token.is_none());
    assert!(harness.ephemeral.get(keys::ACCESS_TOKEN).is_none());
    assert_eq!(admin_guard(&session, Route::Dashboard), Route::Login);
}

#[tokio::test]
async fn test_forbidden_ends_session_without_refresh() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), backend.valid_token(), "refresh-0".into(), true);

    let result = harness.console.client.send(ApiRequest::get("/forbidden")).await;

    assert!(matches!(result, Err(ApiError::Forbidden)));
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(harness.notifier.count(FORBIDDEN_MESSAGE), 1);
    assert_eq!(harness.navigator.last(), Some(Route::Login));
    assert!(!harness.console.session.is_authenticated());
}

#[tokio::test]
async fn test_client_errors_keep_the_session() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());
    harness
        .console
        .session
        .set_credentials(admin_user(), backend.valid_token(), "refresh-0".into(), false);

    let result = harness.console.client.send(ApiRequest::get("/admin/posts/404")).await;

    match result {
        Err(ApiError::Http { status, message }) => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(message, "Post not found");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert!(harness.console.session.is_authenticated());
    assert!(harness.notifier.notices().is_empty());
}

#[tokio::test]
async fn test_server_error_toast_is_rate_limited() {
    let backend = MockBackend::spawn().await;
    let harness = console_for(backend.config());

    for _ in 0..5 {
        let result = harness.console.client.send(ApiRequest::get("/boom")).await;
        match result {
            Err(ApiError::Server { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "kaboom");
            }
            other => panic!("expected Server error, got {other:?}"),
        }
    }

    assert_eq!(harness.notifier.count(SERVER_ERROR_MESSAGE), 1);
    assert_eq!(backend.requests_to("/boom").len(), 5, "server errors are never retried");
}

#[tokio::test]
async fn test_server_error_toast_fires_again_after_cooldown() {
    let backend = MockBackend::spawn().await;
    let config = AppConfig { toast_cooldown: Duration::from_millis(50), ..backend.config() };
    let harness = console_for(config);

    let _ = harness.console.client.send(ApiRequest::get("/boom")).await;
    let _ = harness.console.client.send(ApiRequest::get("/boom")).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    let _ = harness.console.client.send(ApiRequest::get("/boom")).await;

    assert_eq!(harness.notifier.count(SERVER_ERROR_MESSAGE), 2);
}

#[tokio::test]
async fn test_network_error_toast_is_rate_limited() {
    // Bind and release a port so nothing is listening on it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = AppConfig { api_base_url: format!("http://127.0.0.1:{port}/api/v1"), ..AppConfig::default() };
    let harness = console_for(config);

    for _ in 0..3 {
        let result = harness.console.client.send(ApiRequest::get("/protected")).await;
        assert!(matches!(result, Err(ApiError::Network(_))));
    }

    assert_eq!(harness.notifier.count(NETWORK_ERROR_MESSAGE), 1);
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_truncated_acknowledgement_is_a_decode_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises a longer body than it sends, then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"message\"")
            .await;
        let _ = socket.shutdown().await;
    });

    let config = AppConfig { api_base_url: format!("http://127.0.0.1:{port}/api/v1"), ..AppConfig::default() };
    let harness = console_for(config);

    let result = harness.console.client.send_empty(ApiRequest::delete("/admin/posts/3")).await;

    assert!(matches!(result, Err(ApiError::Decode(_))), "unexpected result: {result:?}");
    assert!(harness.notifier.notices().is_empty());
}

#[test]
fn test_cooldown_window() {
    let cooldown = Cooldown::new(Duration::from_secs(5));
    let start = Instant::now();

    assert!(cooldown.try_fire_at(start), "first event always fires");
    assert!(!cooldown.try_fire_at(start + Duration::from_secs(1)));
    assert!(!cooldown.try_fire_at(start + Duration::from_secs(5)), "window is exclusive");
    assert!(cooldown.try_fire_at(start + Duration::from_millis(5_001)));
    assert!(!cooldown.try_fire_at(start + Duration::from_secs(6)));
}
