use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient};
use crate::models::{Category, CategoryQuery, Page, Recipe, RecipeQuery};

pub async fn list_categories(client: &HttpClient, query: &CategoryQuery) -> Result<Page<Category>, ApiError> {
    client.fetch_data(ApiRequest::get("/categories").query(query)?).await
}

/// GET /recipes/my
pub async fn list_recipes(client: &HttpClient, query: &RecipeQuery) -> Result<Page<Recipe>, ApiError> {
    client.fetch_data(ApiRequest::get("/recipes/my").query(query)?).await
}
