use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::Route;

pub const NOTIFICATION_ICON: &str = "/logo.png";
pub const DEFAULT_TITLE: &str = "New notification";

/// FirebaseConfig
///
/// Web-push client configuration, served as a static JSON file next to the console and
/// read at runtime rather than compiled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    #[serde(default)]
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: String,
    pub app_id: String,
    #[serde(default)]
    pub measurement_id: Option<String>,
}

impl FirebaseConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ApiError::Storage(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ApiError::Decode(format!("invalid firebase config {}: {}", path.display(), e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotificationBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// PushPayload
///
/// A Firebase Cloud Messaging message as delivered to the background handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub notification: Option<PushNotificationBody>,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// DisplayNotification
///
/// What the OS-level notification shows, and where a click on it leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNotification {
    pub title: String,
    pub body: String,
    pub icon: &'static str,
    pub image: Option<String>,
    pub click_path: Option<String>,
}

impl DisplayNotification {
    /// The console screen a click should open, when the payload names one.
    pub fn click_route(&self) -> Option<Route> {
        self.click_path.as_deref().and_then(Route::from_path)
    }
}

impl From<PushPayload> for DisplayNotification {
    fn from(payload: PushPayload) -> Self {
        let notification = payload.notification.unwrap_or_default();
        let mut data = payload.data;

        let title = notification
            .title
            .or_else(|| data.remove("title"))
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let body = notification.body.or_else(|| data.remove("body")).unwrap_or_default();

        Self {
            title,
            body,
            icon: NOTIFICATION_ICON,
            image: notification.image,
            click_path: data.remove("path").filter(|p| !p.is_empty()),
        }
    }
}
