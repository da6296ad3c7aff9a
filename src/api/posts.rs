use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient};
use crate::models::{Page, PostItem, PostQuery, UpdatePostRequest};

pub async fn list_posts(client: &HttpClient, query: &PostQuery) -> Result<Page<PostItem>, ApiError> {
    client.fetch_data(ApiRequest::get("/admin/posts").query(query)?).await
}

/// PUT /admin/posts/{id}
///
/// Returns the backend's acknowledgement message.
pub async fn update_post(client: &HttpClient, id: i64, request: &UpdatePostRequest) -> Result<String, ApiError> {
    client
        .send_empty(ApiRequest::put(format!("/admin/posts/{id}")).json(request)?)
        .await
}

pub async fn delete_post(client: &HttpClient, id: i64) -> Result<String, ApiError> {
    client.send_empty(ApiRequest::delete(format!("/admin/posts/{id}"))).await
}
