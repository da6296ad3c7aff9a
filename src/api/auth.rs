use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient, REFRESH_PATH};
use crate::models::{
    ApiResponse, ForgotPasswordRequest, LoginData, LoginRequest, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest, TokenPair, UpdateProfileRequest, User,
    VerifyOtpRequest,
};

/// POST /auth/login
///
/// Returns the profile with both tokens. Does not touch the session; the console decides
/// whether the account may sign in at all.
pub async fn login(client: &HttpClient, request: &LoginRequest) -> Result<LoginData, ApiError> {
    client
        .fetch_data(ApiRequest::post("/auth/login").public().json(request)?)
        .await
}

/// POST /auth/register
pub async fn register(client: &HttpClient, request: &RegisterRequest) -> Result<ApiResponse<User>, ApiError> {
    client
        .fetch(ApiRequest::post("/auth/register").public().json(request)?)
        .await
}

/// POST /auth/verify-otp
pub async fn verify_otp(client: &HttpClient, request: &VerifyOtpRequest) -> Result<String, ApiError> {
    client
        .send_empty(ApiRequest::post("/auth/verify-otp").public().json(request)?)
        .await
}

/// POST /auth/forgot-password/request
pub async fn request_password_reset(
    client: &HttpClient,
    request: &ForgotPasswordRequest,
) -> Result<String, ApiError> {
    client
        .send_empty(ApiRequest::post("/auth/forgot-password/request").public().json(request)?)
        .await
}

/// POST /auth/forgot-password/reset
pub async fn reset_password(client: &HttpClient, request: &ResetPasswordRequest) -> Result<String, ApiError> {
    client
        .send_empty(ApiRequest::post("/auth/forgot-password/reset").public().json(request)?)
        .await
}

pub async fn get_profile(client: &HttpClient) -> Result<User, ApiError> {
    client.fetch_data(ApiRequest::get("/users/me")).await
}

pub async fn update_profile(client: &HttpClient, request: &UpdateProfileRequest) -> Result<User, ApiError> {
    client.fetch_data(ApiRequest::put("/users/update").json(request)?).await
}

/// POST /auth/refresh, called explicitly. The client renews tokens on its own after a 401;
/// this is for callers that want to renew ahead of time.
pub async fn refresh_token(client: &HttpClient, refresh_token: &str) -> Result<TokenPair, ApiError> {
    let request = RefreshTokenRequest { refresh_token: refresh_token.to_string() };
    client
        .fetch_data(ApiRequest::post(REFRESH_PATH).public().json(&request)?)
        .await
}
