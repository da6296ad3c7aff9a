use crate::routes::Route;
use crate::session::Session;

/// Screens rendered inside the admin layout.
pub const PROTECTED: [Route; 6] = [
    Route::Dashboard,
    Route::Users,
    Route::Posts,
    Route::Recipes,
    Route::Reports,
    Route::Notifications,
];

/// admin_guard
///
/// Decides where a navigation to `target` actually lands.
///
/// Access Control:
/// - public targets pass through untouched;
/// - no session sends the user to `Login`;
/// - a session whose user is not an ADMIN lands on `Error`.
pub fn admin_guard(session: &Session, target: Route) -> Route {
    if !target.is_protected() {
        return target;
    }

    if !session.is_authenticated {
        tracing::debug!(target = target.path(), "guard: no session, redirecting to login");
        return Route::Login;
    }

    let is_admin = session.user.as_ref().is_some_and(|user| user.role.is_admin());
    if !is_admin {
        tracing::warn!(target = target.path(), "guard: non-admin session blocked");
        return Route::Error;
    }

    target
}
