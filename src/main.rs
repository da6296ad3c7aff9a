use std::env;
use std::sync::Arc;

use foodshare_admin::{
    AdminConsole, AppConfig, Env, NavigatorState, NotifierState, TracingNavigator, TracingNotifier,
    api, models::DashboardQuery, push::FirebaseConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Headless entry point: loads configuration, initialises logging, restores the stored
/// session, optionally signs in from the environment, and logs the dashboard summary.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and info for the HTTP stack.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "foodshare_admin=debug,reqwest=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Admin console starting in {:?} mode", config.env);
    tracing::info!(api = %config.api_base_url, "REST backend configured");

    // 4. Push configuration is optional for a headless run.
    match FirebaseConfig::load(&config.firebase_config_path).await {
        Ok(firebase) => tracing::info!(project = %firebase.project_id, "push notifications configured"),
        Err(e) => tracing::warn!(error = %e, "push notifications disabled"),
    }

    // 5. Unified State Assembly
    let notifier: NotifierState = Arc::new(TracingNotifier);
    let navigator: NavigatorState = Arc::new(TracingNavigator);
    let console = AdminConsole::from_config(config, notifier, navigator)
        .expect("FATAL: Failed to initialise the admin console. Check SESSION_DIR.");

    tracing::info!(
        authenticated = console.session.is_authenticated(),
        landing = %console.landing(),
        "session restored"
    );

    // 6. Optional sign-in from the environment
    if let (Ok(email), Ok(password)) = (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
        if let Err(e) = console.login(&email, &password, true).await {
            tracing::error!(error = %e, "sign-in failed");
            return;
        }
    }

    if !console.session.is_authenticated() {
        tracing::info!("No session. Set ADMIN_EMAIL and ADMIN_PASSWORD to sign in.");
        return;
    }

    // 7. Dashboard Summary
    let query = DashboardQuery::default();
    match api::dashboard::user_statistics(&console.client, &query).await {
        Ok(stats) => tracing::info!(
            total_users = stats.total_users,
            top_influencers = stats.top_influencers.len(),
            recent_registrations = stats.recent_registrations.len(),
            "user statistics"
        ),
        Err(e) => tracing::error!(error = %e, "failed to load user statistics"),
    }
    match api::dashboard::post_statistics(&console.client, &query).await {
        Ok(stats) => tracing::info!(
            top_liked_posts = stats.top_liked_posts.len(),
            total_violated_posts = stats.total_violated_posts,
            "post statistics"
        ),
        Err(e) => tracing::error!(error = %e, "failed to load post statistics"),
    }
}
