use std::fmt;

use serde::{Deserialize, Serialize};

/// Screens reachable without a session (sign-in and account recovery).
pub mod public;

/// Screens restricted to authenticated administrators, and the guard that enforces it.
pub mod admin;

/// Route
///
/// Every screen of the console. `path` is the browser path the web front-end mounts the
/// screen on; `from_path` is its inverse and is what push-notification clicks resolve with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Login,
    Register,
    VerifyOtp,
    ForgotPassword,
    ResetPassword,
    Profile,
    Dashboard,
    Users,
    Posts,
    Recipes,
    Reports,
    Notifications,
    Error,
}

impl Route {
    pub const ALL: [Route; 13] = [
        Route::Login,
        Route::Register,
        Route::VerifyOtp,
        Route::ForgotPassword,
        Route::ResetPassword,
        Route::Profile,
        Route::Dashboard,
        Route::Users,
        Route::Posts,
        Route::Recipes,
        Route::Reports,
        Route::Notifications,
        Route::Error,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::VerifyOtp => "/verify-otp",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetPassword => "/reset-password",
            Route::Profile => "/profile",
            Route::Dashboard => "/dashboard",
            Route::Users => "/users",
            Route::Posts => "/posts",
            // The reports screen has always been mounted under its old name.
            Route::Reports => "/comments",
            Route::Recipes => "/recipes",
            Route::Notifications => "/notifications",
            Route::Error => "/error",
        }
    }

    /// Resolves a browser path (query string and trailing slash ignored). The error pages
    /// `/403` and `/500` map to `Error`; anything unknown yields `None`.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match path {
            "/403" | "/500" => Some(Route::Error),
            _ => Route::ALL.into_iter().find(|route| route.path() == path),
        }
    }

    /// Protected screens need an authenticated administrator; the rest are open.
    pub fn is_protected(self) -> bool {
        admin::PROTECTED.contains(&self)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
