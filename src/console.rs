use std::sync::Arc;

use chrono::NaiveDate;

use crate::api;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, NotificationRequest, OtpType, RegisterRequest,
    ResetPasswordRequest, Role, UpdateProfileRequest, User, VerifyOtpRequest,
};
use crate::notify::{ADMIN_ONLY_MESSAGE, NavigatorState, Notice, NotifierState};
use crate::routes::{Route, admin, public};
use crate::session::{SessionState, SessionStore};
use crate::storage::{FileStorage, MemoryStorage, StorageState};
use crate::upload::{CloudinaryUploader, MediaKind, UploaderState};
use crate::validation::{self, ProfileForm};
use crate::view_state::{ActiveTab, NotificationFeed, PostFilterState, UiState, UiStateHandle};

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your credentials.";
pub const LOGOUT_MESSAGE: &str = "Logged out successfully!";
pub const FORM_ERRORS_MESSAGE: &str = "Please fix the errors in the form.";

/// AdminConsole
///
/// Implements the **Unified State Pattern** for the client side: one cloneable container
/// holding the configuration, the session, the authenticated HTTP client and the view-state
/// slices every screen reads. Screens call into it; it owns the flows that span several of
/// those pieces (login, logout, forced navigation).
#[derive(Clone)]
pub struct AdminConsole {
    pub config: AppConfig,
    pub session: SessionState,
    pub ui: UiStateHandle,
    pub client: HttpClient,
    pub posts: Arc<PostFilterState>,
    pub notifications: Arc<NotificationFeed>,
    pub uploader: UploaderState,
}

impl AdminConsole {
    /// new
    ///
    /// Assembles the console over explicit storages and sinks. The session is restored from
    /// the storages immediately.
    pub fn new(
        config: AppConfig,
        durable: StorageState,
        ephemeral: StorageState,
        notifier: NotifierState,
        navigator: NavigatorState,
        uploader: UploaderState,
    ) -> Result<Self, ApiError> {
        let session: SessionState = Arc::new(SessionStore::new(durable.clone(), ephemeral));
        let ui: UiStateHandle = Arc::new(UiState::new(durable));
        let client = HttpClient::new(&config, session.clone(), ui.clone(), notifier, navigator)?;

        Ok(Self {
            config,
            session,
            ui,
            client,
            posts: Arc::new(PostFilterState::new()),
            notifications: Arc::new(NotificationFeed::new()),
            uploader,
        })
    }

    /// from_config
    ///
    /// Production wiring: the durable store is the session file under `SESSION_DIR`, the
    /// ephemeral store lives in memory, uploads go to Cloudinary.
    pub fn from_config(
        config: AppConfig,
        notifier: NotifierState,
        navigator: NavigatorState,
    ) -> Result<Self, ApiError> {
        let durable: StorageState = Arc::new(FileStorage::open(config.session_file()).map_err(ApiError::Storage)?);
        let ephemeral: StorageState = Arc::new(MemoryStorage::new());
        let uploader: UploaderState = Arc::new(CloudinaryUploader::from_config(&config));
        Self::new(config, durable, ephemeral, notifier, navigator, uploader)
    }

    fn notify(&self, notice: Notice) {
        self.client.notifier().notify(notice);
    }

    fn navigate(&self, route: Route) {
        self.client.navigator().navigate(route);
    }

    // --- Sign-in & Sign-out ---

    /// login
    ///
    /// Signs an administrator in.
    ///
    /// Flow:
    /// 1. the form is validated locally; invalid input never reaches the network;
    /// 2. `/auth/login` is called;
    /// 3. an ADMIN account gets a session (persisted per `remember_me`), a welcome toast and
    ///    the dashboard;
    /// 4. any other role is refused with `PermissionDenied` and no session is created.
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<User, ApiError> {
        validation::validate_login(email, password).map_err(ApiError::Validation)?;

        let request = LoginRequest { email: email.to_string(), password: password.to_string() };
        let data = match api::auth::login(&self.client, &request).await {
            Ok(data) => data,
            Err(error) => {
                // Transport and 5xx failures were already toasted by the client.
                if let ApiError::Http { message, .. } = &error {
                    let message = if message.is_empty() { LOGIN_FAILED_MESSAGE } else { message.as_str() };
                    self.notify(Notice::error(message));
                }
                tracing::warn!(error = %error, "login failed");
                return Err(error);
            }
        };

        if data.user.role != Role::Admin {
            tracing::warn!(user_id = data.user.id, role = %data.user.role, "non-admin login refused");
            self.notify(Notice::error(ADMIN_ONLY_MESSAGE));
            return Err(ApiError::PermissionDenied(data.user.role.to_string()));
        }

        let user = data.user;
        self.session
            .set_credentials(user.clone(), data.access_token, data.refresh_token, remember_me);
        self.notify(Notice::success(format!("Welcome back, {}!", user.username)));
        self.navigate(Route::Dashboard);
        Ok(user)
    }

    /// Ends the session on request: credentials removed from both stores, UI back to
    /// defaults, and the login screen shown.
    pub fn logout(&self) {
        self.session.clear();
        self.ui.reset();
        self.posts.reset_filters();
        self.notifications.clear();
        self.notify(Notice::success(LOGOUT_MESSAGE));
        self.navigate(Route::Login);
    }

    // --- Account Recovery & Registration ---

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, ApiError> {
        validation::validate_register(email, username, password, confirm_password).map_err(|errors| {
            self.notify(Notice::error(FORM_ERRORS_MESSAGE));
            ApiError::Validation(errors)
        })?;

        let request = RegisterRequest {
            email: email.to_string(),
            username: username.trim().to_string(),
            password: password.to_string(),
            role: Role::Admin,
        };
        let response = api::auth::register(&self.client, &request).await?;
        let user = response
            .data
            .ok_or_else(|| ApiError::Decode("registration response carried no user".into()))?;

        self.session.set_otp_data(Some(email.to_string()), None, Some(OtpType::Register));
        self.notify(Notice::success("Registration successful! Please verify your OTP."));
        self.navigate(Route::VerifyOtp);
        Ok(user)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<String, ApiError> {
        validation::validate_forgot_password(email).map_err(ApiError::Validation)?;

        let message = api::auth::request_password_reset(
            &self.client,
            &ForgotPasswordRequest { email: email.to_string() },
        )
        .await?;
        self.session.set_otp_data(Some(email.to_string()), None, Some(OtpType::ForgotPassword));
        self.navigate(Route::VerifyOtp);
        Ok(message)
    }

    /// Verifies the code for the flow recorded by `register` or `request_password_reset`,
    /// then moves on: the login screen after registration, the reset screen otherwise.
    pub async fn verify_otp(&self, code: &str) -> Result<String, ApiError> {
        validation::validate_otp(code).map_err(ApiError::Validation)?;

        let otp = self.session.otp();
        let email = otp.email.ok_or_else(|| missing_otp_context("email"))?;
        let otp_type = otp.otp_type.unwrap_or(OtpType::Register);

        let request = VerifyOtpRequest { email, otp_code: code.to_string(), otp_type };
        let message = api::auth::verify_otp(&self.client, &request).await?;

        match otp_type {
            OtpType::Register => {
                self.session.clear_otp_data();
                self.notify(Notice::success("Verification successful! Please log in."));
                self.navigate(Route::Login);
            }
            OtpType::ForgotPassword => {
                self.session.set_otp_data(None, Some(code.to_string()), None);
                self.navigate(Route::ResetPassword);
            }
        }
        Ok(message)
    }

    pub async fn reset_password(&self, password: &str, confirm_password: &str) -> Result<String, ApiError> {
        validation::validate_reset_password(password, confirm_password).map_err(ApiError::Validation)?;

        let otp = self.session.otp();
        let email = otp.email.ok_or_else(|| missing_otp_context("email"))?;
        let code = otp.otp_code.ok_or_else(|| missing_otp_context("otp"))?;

        let request = ResetPasswordRequest { email, otp: code, new_password: password.to_string() };
        let message = api::auth::reset_password(&self.client, &request).await?;
        self.session.clear_otp_data();
        self.navigate(Route::Login);
        Ok(message)
    }

    // --- Profile ---

    /// Fetches the profile and stores it (gender-normalised) in the session.
    pub async fn refresh_profile(&self) -> Result<User, ApiError> {
        let user = api::auth::get_profile(&self.client).await?;
        self.session.set_user(user.clone());
        Ok(self.session.user().unwrap_or(user))
    }

    pub async fn update_profile(&self, changes: UpdateProfileRequest, today: NaiveDate) -> Result<User, ApiError> {
        let current = self.session.user().unwrap_or_default();
        let form = ProfileForm {
            username: changes.username.as_deref().unwrap_or(&current.username),
            email: changes.email.as_deref().unwrap_or(&current.email),
            gender: changes.gender.or(current.gender),
            dob: changes.dob.as_deref().or(current.dob.as_deref()),
        };
        validation::validate_profile(&form, today).map_err(ApiError::Validation)?;

        let user = api::auth::update_profile(&self.client, &changes).await?;
        self.session.set_user(user.clone());
        self.notify(Notice::success("Profile updated successfully!"));
        Ok(user)
    }

    /// Uploads a new avatar and saves its URL on the profile.
    pub async fn change_avatar(&self, bytes: Vec<u8>, filename: &str, today: NaiveDate) -> Result<User, ApiError> {
        let url = self.uploader.upload(bytes, filename, MediaKind::Image).await?;
        let changes = UpdateProfileRequest { avatar_url: Some(url), ..UpdateProfileRequest::default() };
        self.update_profile(changes, today).await
    }

    // --- Broadcast ---

    pub async fn broadcast(&self, mut request: NotificationRequest, send_to_all: bool) -> Result<String, ApiError> {
        validation::validate_broadcast(&request, send_to_all).map_err(ApiError::Validation)?;
        if send_to_all {
            request.user_id = None;
        }
        let message = api::notifications::send(&self.client, &request).await?;
        tracing::info!(target_user = ?request.user_id, "notification sent");
        Ok(message)
    }

    // --- Navigation ---

    /// Runs `target` through the admin guard and navigates to wherever it lands.
    pub fn open(&self, target: Route) -> Route {
        let destination = admin::admin_guard(&self.session.snapshot(), target);
        self.navigate(destination);
        destination
    }

    /// Where `/` should go right now.
    pub fn landing(&self) -> Route {
        public::landing(&self.session.snapshot())
    }

    pub fn set_active_tab(&self, tab: ActiveTab) {
        self.ui.set_active_tab(tab);
    }
}

fn missing_otp_context(field: &'static str) -> ApiError {
    let mut errors = validation::ValidationErrors::new();
    errors.insert(field, "Email or OTP code is missing. Please try again.");
    ApiError::Validation(errors)
}
