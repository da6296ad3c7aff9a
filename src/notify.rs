use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::routes::Route;

// --- User-facing messages ---

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to access this.";
pub const ADMIN_ONLY_MESSAGE: &str = "You do not have permission to access this resource.";
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network Error: Unable to connect to the server. Please check your internet connection.";
pub const SERVER_ERROR_MESSAGE: &str =
    "Server Error: Something went wrong on our end. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Notice
///
/// A transient, user-visible message (the console's toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Notifier
///
/// Where toasts go. The HTTP client and the login flow only ever talk to this trait,
/// so a front-end can render them and tests can record them.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Navigator
///
/// Receives hard navigations (forced logout to the login screen, post-login dashboard).
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

pub type NotifierState = Arc<dyn Notifier>;
pub type NavigatorState = Arc<dyn Navigator>;

/// TracingNotifier
///
/// Headless notifier: every toast becomes a log line.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => {
                tracing::info!(message = %notice.message, "notice")
            }
            NoticeLevel::Error => tracing::warn!(message = %notice.message, "notice"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(path = route.path(), "navigate");
    }
}

/// RecordingNotifier
///
/// Keeps every notice in memory. Used by tests and by embedders that poll for toasts.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded notices whose message equals `message`.
    pub fn count(&self, message: &str) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.message == message)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).push(notice);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).push(route);
    }
}

/// Cooldown
///
/// Lets an event through at most once per window. The first event always fires.
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self { window, last_fired: Mutex::new(None) }
    }

    pub fn try_fire(&self) -> bool {
        self.try_fire_at(Instant::now())
    }

    /// Returns true and records `now` when more than one window has passed since the
    /// last accepted event.
    pub fn try_fire_at(&self, now: Instant) -> bool {
        let mut last = self.last_fired.lock().unwrap_or_else(PoisonError::into_inner);
        let open = match *last {
            None => true,
            Some(previous) => now.saturating_duration_since(previous) > self.window,
        };
        if open {
            *last = Some(now);
        }
        open
    }
}
