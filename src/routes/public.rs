use crate::routes::Route;
use crate::session::Session;

/// Screens that never require a session. `Profile` is reachable here too, the way the
/// web console mounts it outside the admin layout.
pub const PUBLIC: [Route; 7] = [
    Route::Login,
    Route::Register,
    Route::VerifyOtp,
    Route::ForgotPassword,
    Route::ResetPassword,
    Route::Profile,
    Route::Error,
];

/// landing
///
/// Where `/` sends the user: the dashboard with a live session, the login screen otherwise.
pub fn landing(session: &Session) -> Route {
    if session.is_authenticated {
        Route::Dashboard
    } else {
        Route::Login
    }
}
