use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8222/api/v1";
pub const DEFAULT_TOAST_COOLDOWN_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// AppConfig
///
/// Holds the console's entire configuration. Immutable once loaded; the console bundles it
/// with the HTTP client and session so every feature call sees the same settings.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Root of the REST API, without a trailing slash.
    pub api_base_url: String,
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Minimum gap between two network (or two server) error toasts.
    pub toast_cooldown: Duration,
    // Per-request timeout applied by the HTTP client.
    pub request_timeout: Duration,
    // Directory holding the durable session file.
    pub session_dir: PathBuf,
    // Firebase web-push configuration, read at runtime.
    pub firebase_config_path: PathBuf,
    // Cloudinary account used for media uploads.
    pub cloudinary_cloud_name: String,
    // Unsigned upload preset configured on that account.
    pub cloudinary_upload_preset: String,
}

/// Env
///
/// The runtime context: human-readable logs and lenient defaults locally, JSON logs and
/// mandatory settings in production.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// A non-panicking configuration for tests: local env, default base URL, temp-dir session.
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            env: Env::Local,
            toast_cooldown: Duration::from_millis(DEFAULT_TOAST_COOLDOWN_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_dir: env::temp_dir().join("foodshare-admin"),
            firebase_config_path: PathBuf::from("firebase-config.json"),
            cloudinary_cloud_name: "demo".to_string(),
            cloudinary_upload_preset: "unsigned-test".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (call `dotenv` first).
    ///
    /// # Panics
    /// Panics in production when `API_BASE_URL`, `CLOUDINARY_CLOUD_NAME` or
    /// `CLOUDINARY_UPLOAD_PRESET` is unset, and in any environment when a numeric
    /// setting does not parse.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let toast_cooldown = env::var("TOAST_COOLDOWN_MS")
            .map(|raw| {
                Duration::from_millis(
                    raw.parse().expect("FATAL: TOAST_COOLDOWN_MS must be a whole number of milliseconds"),
                )
            })
            .unwrap_or(defaults.toast_cooldown);
        let request_timeout = env::var("REQUEST_TIMEOUT_SECS")
            .map(|raw| {
                Duration::from_secs(
                    raw.parse().expect("FATAL: REQUEST_TIMEOUT_SECS must be a whole number of seconds"),
                )
            })
            .unwrap_or(defaults.request_timeout);
        let session_dir = env::var("SESSION_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".foodshare-admin"));
        let firebase_config_path = env::var("FIREBASE_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.firebase_config_path);

        match env {
            Env::Local => Self {
                env: Env::Local,
                api_base_url: trim_base(
                    env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
                ),
                toast_cooldown,
                request_timeout,
                session_dir,
                firebase_config_path,
                cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                    .unwrap_or(defaults.cloudinary_cloud_name),
                cloudinary_upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET")
                    .unwrap_or(defaults.cloudinary_upload_preset),
            },
            Env::Production => Self {
                env: Env::Production,
                api_base_url: trim_base(
                    env::var("API_BASE_URL").expect("FATAL: API_BASE_URL required in prod"),
                ),
                toast_cooldown,
                request_timeout,
                session_dir,
                firebase_config_path,
                cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                    .expect("FATAL: CLOUDINARY_CLOUD_NAME required in prod"),
                cloudinary_upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET")
                    .expect("FATAL: CLOUDINARY_UPLOAD_PRESET required in prod"),
            },
        }
    }

    pub fn session_file(&self) -> PathBuf {
        self.session_dir.join("session.json")
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
