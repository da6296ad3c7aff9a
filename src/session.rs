use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{Gender, OtpType, User};
use crate::storage::{StorageState, keys};

/// OtpState
///
/// Hand-off between the OTP screens: which address the code went to, which flow it belongs
/// to, and the code once the user typed it (the reset-password step needs it again).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpState {
    pub email: Option<String>,
    pub otp_type: Option<OtpType>,
    pub otp_code: Option<String>,
}

/// Session
///
/// Snapshot of the signed-in state. `is_authenticated` is raised by a login or by a restore
/// that found an access token, and dropped by `clear`; token renewal leaves it alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
    pub otp: OtpState,
}

/// SessionStore
///
/// Owns the session and mirrors it into two stores: `durable` for "remember me" logins and
/// `ephemeral` for everything else. The in-memory copy is authoritative; a failed storage
/// write is logged and the session carries on, so a broken disk never logs anyone out.
pub struct SessionStore {
    durable: StorageState,
    ephemeral: StorageState,
    state: RwLock<Session>,
}

pub type SessionState = Arc<SessionStore>;

impl SessionStore {
    /// Builds the store and immediately restores whatever the storages hold.
    pub fn new(durable: StorageState, ephemeral: StorageState) -> Self {
        let store = Self { durable, ephemeral, state: RwLock::new(Session::default()) };
        store.restore();
        store
    }

    pub fn durable(&self) -> &StorageState {
        &self.durable
    }

    pub fn ephemeral(&self) -> &StorageState {
        &self.ephemeral
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Value for `key`, durable storage first.
    fn lookup(&self, key: &str) -> Option<String> {
        self.durable.get(key).or_else(|| self.ephemeral.get(key))
    }

    /// The store that already holds `key` (durable preferred), else the ephemeral one.
    fn holder_of(&self, key: &str) -> &StorageState {
        if self.durable.contains(key) { &self.durable } else { &self.ephemeral }
    }

    /// restore
    ///
    /// Rebuilds the session from storage so a restart needs no network round-trip.
    /// An unreadable stored user is dropped; the tokens still restore.
    pub fn restore(&self) -> Session {
        let user = self.lookup(keys::USER).and_then(|raw| match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable stored user");
                None
            }
        });
        let access_token = self.lookup(keys::ACCESS_TOKEN);
        let refresh_token = self.lookup(keys::REFRESH_TOKEN);

        let mut state = self.write();
        state.is_authenticated = access_token.is_some();
        state.user = user;
        state.access_token = access_token;
        state.refresh_token = refresh_token;

        tracing::debug!(authenticated = state.is_authenticated, "session restored from storage");
        state.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn remember_me(&self) -> bool {
        self.durable.get(keys::REMEMBER_ME).is_some_and(|v| v == "true")
    }

    /// set_credentials
    ///
    /// Starts a session. With `remember_me` the credentials go to durable storage and any
    /// ephemeral copy is removed; without it, the reverse.
    pub fn set_credentials(&self, user: User, access_token: String, refresh_token: String, remember_me: bool) {
        let (target, other) = if remember_me {
            (&self.durable, &self.ephemeral)
        } else {
            (&self.ephemeral, &self.durable)
        };

        persist(&self.durable, keys::REMEMBER_ME, &remember_me.to_string());
        persist(target, keys::ACCESS_TOKEN, &access_token);
        persist(target, keys::REFRESH_TOKEN, &refresh_token);
        match serde_json::to_string(&user) {
            Ok(raw) => persist(target, keys::USER, &raw),
            Err(e) => tracing::warn!(error = %e, "failed to encode user for storage"),
        }
        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::USER] {
            erase(other, key);
        }

        tracing::info!(user_id = user.id, remember_me, "session established");

        let mut state = self.write();
        state.user = Some(user);
        state.access_token = Some(access_token);
        state.refresh_token = Some(refresh_token);
        state.is_authenticated = true;
    }

    /// Replaces the profile. A missing gender is recorded as OTHER.
    pub fn set_user(&self, mut user: User) {
        user.gender = Some(user.gender.unwrap_or(Gender::Other));

        match serde_json::to_string(&user) {
            Ok(raw) => persist(self.holder_of(keys::USER), keys::USER, &raw),
            Err(e) => tracing::warn!(error = %e, "failed to encode user for storage"),
        }
        self.write().user = Some(user);
    }

    pub fn update_access_token(&self, token: String) {
        persist(self.holder_of(keys::ACCESS_TOKEN), keys::ACCESS_TOKEN, &token);
        self.write().access_token = Some(token);
    }

    pub fn update_refresh_token(&self, token: String) {
        persist(self.holder_of(keys::REFRESH_TOKEN), keys::REFRESH_TOKEN, &token);
        self.write().refresh_token = Some(token);
    }

    /// clear
    ///
    /// Logout: drops the in-memory session and the credentials in both stores. OTP hand-off
    /// state survives so a half-finished recovery flow is not lost.
    pub fn clear(&self) {
        for store in [&self.durable, &self.ephemeral] {
            for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::USER] {
                erase(store, key);
            }
        }

        let mut state = self.write();
        state.user = None;
        state.access_token = None;
        state.refresh_token = None;
        state.is_authenticated = false;
        tracing::info!("session cleared");
    }

    pub fn otp(&self) -> OtpState {
        self.read().otp.clone()
    }

    /// Partial update: `None` leaves a field as it is.
    pub fn set_otp_data(&self, email: Option<String>, otp_code: Option<String>, otp_type: Option<OtpType>) {
        let mut state = self.write();
        if email.is_some() {
            state.otp.email = email;
        }
        if otp_code.is_some() {
            state.otp.otp_code = otp_code;
        }
        if otp_type.is_some() {
            state.otp.otp_type = otp_type;
        }
    }

    pub fn clear_otp_data(&self) {
        self.write().otp = OtpState::default();
    }
}

fn persist(store: &StorageState, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        tracing::warn!(key, error = %e, "session storage write failed");
    }
}

fn erase(store: &StorageState, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!(key, error = %e, "session storage remove failed");
    }
}
