use foodshare_admin::{
    AppConfig,
    config::{DEFAULT_API_BASE_URL, Env},
};
use serial_test::serial;
use std::{env, panic, path::PathBuf, time::Duration};

const CONFIG_VARS: [&str; 8] = [
    "APP_ENV",
    "API_BASE_URL",
    "TOAST_COOLDOWN_MS",
    "REQUEST_TIMEOUT_SECS",
    "SESSION_DIR",
    "FIREBASE_CONFIG_PATH",
    "CLOUDINARY_CLOUD_NAME",
    "CLOUDINARY_UPLOAD_PRESET",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with exactly `vars` set (every other config variable cleared) and restores
/// the original environment afterwards, even when the test panics.
fn run_with_env<T, R>(vars: &[(&'static str, &'static str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> =
        CONFIG_VARS.iter().map(|&var| (var, env::var(var).ok())).collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(key, val);
            } else {
                env::remove_var(key);
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    // The Cloudinary settings are missing.
    let result = run_with_env(
        &[("APP_ENV", "production"), ("API_BASE_URL", "https://api.foodshare.test/api/v1")],
        || panic::catch_unwind(AppConfig::load),
    );

    assert!(result.is_err(), "Production config loading should panic on missing settings");
}

#[test]
#[serial]
fn test_app_config_production_complete() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("API_BASE_URL", "https://api.foodshare.test/api/v1/"),
            ("CLOUDINARY_CLOUD_NAME", "foodshare"),
            ("CLOUDINARY_UPLOAD_PRESET", "admin-unsigned"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.api_base_url, "https://api.foodshare.test/api/v1");
    assert_eq!(config.cloudinary_cloud_name, "foodshare");
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(&[("APP_ENV", "local")], AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(config.toast_cooldown, Duration::from_secs(5));
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.session_file(), PathBuf::from(".foodshare-admin").join("session.json"));
}

#[test]
#[serial]
fn test_app_config_numeric_overrides() {
    let config = run_with_env(
        &[("TOAST_COOLDOWN_MS", "250"), ("REQUEST_TIMEOUT_SECS", "3"), ("SESSION_DIR", "/tmp/fs-admin")],
        AppConfig::load,
    );

    // APP_ENV unset means local.
    assert_eq!(config.env, Env::Local);
    assert_eq!(config.toast_cooldown, Duration::from_millis(250));
    assert_eq!(config.request_timeout, Duration::from_secs(3));
    assert_eq!(config.session_dir, PathBuf::from("/tmp/fs-admin"));
}

#[test]
#[serial]
fn test_app_config_rejects_malformed_numbers() {
    let result = run_with_env(&[("TOAST_COOLDOWN_MS", "soon")], || panic::catch_unwind(AppConfig::load));
    assert!(result.is_err());
}
