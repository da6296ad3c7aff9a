use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient};
use crate::models::{Notification, NotificationQuery, NotificationRequest, Page};

pub async fn list(client: &HttpClient, query: NotificationQuery) -> Result<Page<Notification>, ApiError> {
    client.fetch_data(ApiRequest::get("/notifications").query(&query)?).await
}

pub async fn unread_count(client: &HttpClient) -> Result<u64, ApiError> {
    client.fetch_data(ApiRequest::get("/notifications/unread-count")).await
}

pub async fn mark_read(client: &HttpClient, id: i64) -> Result<String, ApiError> {
    client.send_empty(ApiRequest::put(format!("/notifications/{id}/read"))).await
}

pub async fn mark_all_read(client: &HttpClient) -> Result<String, ApiError> {
    client.send_empty(ApiRequest::put("/notifications/read-all")).await
}

pub async fn delete(client: &HttpClient, id: i64) -> Result<String, ApiError> {
    client.send_empty(ApiRequest::delete(format!("/notifications/{id}"))).await
}

pub async fn delete_all(client: &HttpClient) -> Result<String, ApiError> {
    client.send_empty(ApiRequest::delete("/notifications/delete-all")).await
}

/// POST /notifications
///
/// Broadcasts to every user when `request.user_id` is `None`.
pub async fn send(client: &HttpClient, request: &NotificationRequest) -> Result<String, ApiError> {
    client.send_empty(ApiRequest::post("/notifications").json(request)?).await
}
