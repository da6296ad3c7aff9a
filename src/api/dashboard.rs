use serde::Serialize;

use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient};
use crate::models::{DashboardQuery, PostStatistics, UserStatistics};

pub const DEFAULT_TOP_INFLUENCERS: u32 = 3;
pub const DEFAULT_RECENT_REGISTRATIONS: u32 = 5;
pub const DEFAULT_TOP_POST_CREATORS: u32 = 5;
pub const DEFAULT_TOP_POSTS: u32 = 10;
pub const DEFAULT_RECENT_VIOLATED_POSTS: u32 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserStatisticsParams {
    top_influencers_limit: u32,
    recent_registrations_limit: u32,
    top_post_creators_limit: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostStatisticsParams {
    top_posts_limit: u32,
    recent_violated_posts_limit: u32,
}

/// Unset or zero limits fall back to the dashboard default.
fn limit(value: Option<u32>, default: u32) -> u32 {
    value.filter(|v| *v > 0).unwrap_or(default)
}

/// GET /admin/users/statistics
pub async fn user_statistics(client: &HttpClient, query: &DashboardQuery) -> Result<UserStatistics, ApiError> {
    let params = UserStatisticsParams {
        top_influencers_limit: limit(query.top_influencers_limit, DEFAULT_TOP_INFLUENCERS),
        recent_registrations_limit: limit(query.recent_registrations_limit, DEFAULT_RECENT_REGISTRATIONS),
        top_post_creators_limit: limit(query.top_post_creators_limit, DEFAULT_TOP_POST_CREATORS),
    };
    client
        .fetch_data(ApiRequest::get("/admin/users/statistics").query(&params)?)
        .await
}

/// GET /admin/posts/statistics
pub async fn post_statistics(client: &HttpClient, query: &DashboardQuery) -> Result<PostStatistics, ApiError> {
    let params = PostStatisticsParams {
        top_posts_limit: limit(query.top_posts_limit, DEFAULT_TOP_POSTS),
        recent_violated_posts_limit: limit(query.recent_violated_posts_limit, DEFAULT_RECENT_VIOLATED_POSTS),
    };
    client
        .fetch_data(ApiRequest::get("/admin/posts/statistics").query(&params)?)
        .await
}
