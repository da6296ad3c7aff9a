use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient};
use crate::models::{Page, UserQuery, UserResponse};

/// GET /users?page&size&search&role&provider&sortBy&direction
pub async fn list_users(client: &HttpClient, query: &UserQuery) -> Result<Page<UserResponse>, ApiError> {
    client.fetch_data(ApiRequest::get("/users").query(query)?).await
}
