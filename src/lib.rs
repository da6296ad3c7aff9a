// --- Module Structure ---

// Configuration and the shared failure type.
pub mod config;
pub mod error;

// Wire types shared with the REST backend.
pub mod models;

// Session persistence: the key-value contract and the session built on it.
pub mod session;
pub mod storage;

// Toasts, navigation sinks and the authenticated client that drives them.
pub mod http;
pub mod notify;

// One module per backend feature area.
pub mod api;

// Client-side state and rules used by the screens.
pub mod validation;
pub mod view_state;

// Screen routing (Public, Admin) and the guard between them.
pub mod routes;

// Integrations outside the REST API.
pub mod push;
pub mod upload;

pub mod analytics;

// The unified console state and its cross-cutting flows.
pub mod console;

// --- Public Re-exports ---

// Makes the core types reachable from the binary entry point (main.rs) and from tests.
pub use config::{AppConfig, Env};
pub use console::AdminConsole;
pub use error::ApiError;
pub use http::{ApiRequest, HttpClient};
pub use notify::{
    Navigator, NavigatorState, Notice, NoticeLevel, Notifier, NotifierState, RecordingNavigator,
    RecordingNotifier, TracingNavigator, TracingNotifier,
};
pub use routes::Route;
pub use session::{Session, SessionState, SessionStore};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageState};
pub use upload::{CloudinaryUploader, MediaUploader, MockUploader, UploaderState};
