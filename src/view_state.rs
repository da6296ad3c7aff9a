use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Notification, PostItem, PostQuery};
use crate::storage::{StorageState, keys};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// --- Sidebar & Tabs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Dashboard,
    Users,
    Posts,
    Recipes,
    Comments,
    Notifications,
}

impl ActiveTab {
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveTab::Dashboard => "dashboard",
            ActiveTab::Users => "users",
            ActiveTab::Posts => "posts",
            ActiveTab::Recipes => "recipes",
            ActiveTab::Comments => "comments",
            ActiveTab::Notifications => "notifications",
        }
    }
}

impl FromStr for ActiveTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(ActiveTab::Dashboard),
            "users" => Ok(ActiveTab::Users),
            "posts" => Ok(ActiveTab::Posts),
            "recipes" => Ok(ActiveTab::Recipes),
            "comments" => Ok(ActiveTab::Comments),
            "notifications" => Ok(ActiveTab::Notifications),
            other => Err(format!("unknown tab '{other}'")),
        }
    }
}

impl fmt::Display for ActiveTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiSnapshot {
    pub active_tab: ActiveTab,
    pub is_sidebar_open: bool,
}

impl Default for UiSnapshot {
    fn default() -> Self {
        Self { active_tab: ActiveTab::default(), is_sidebar_open: true }
    }
}

/// UiState
///
/// Layout state shared by every screen. The active tab is remembered across restarts in
/// durable storage under `activeTab`.
pub struct UiState {
    durable: StorageState,
    inner: Mutex<UiSnapshot>,
}

pub type UiStateHandle = Arc<UiState>;

impl UiState {
    pub fn new(durable: StorageState) -> Self {
        let active_tab = durable
            .get(keys::ACTIVE_TAB)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        Self { durable, inner: Mutex::new(UiSnapshot { active_tab, is_sidebar_open: true }) }
    }

    pub fn snapshot(&self) -> UiSnapshot {
        *lock(&self.inner)
    }

    pub fn active_tab(&self) -> ActiveTab {
        lock(&self.inner).active_tab
    }

    pub fn set_active_tab(&self, tab: ActiveTab) {
        lock(&self.inner).active_tab = tab;
        if let Err(e) = self.durable.set(keys::ACTIVE_TAB, tab.as_str()) {
            tracing::warn!(error = %e, "failed to persist active tab");
        }
    }

    pub fn is_sidebar_open(&self) -> bool {
        lock(&self.inner).is_sidebar_open
    }

    pub fn toggle_sidebar(&self) -> bool {
        let mut inner = lock(&self.inner);
        inner.is_sidebar_open = !inner.is_sidebar_open;
        inner.is_sidebar_open
    }

    pub fn set_sidebar_open(&self, open: bool) {
        lock(&self.inner).is_sidebar_open = open;
    }

    /// Back to defaults, forgetting the persisted tab. Run on every logout.
    pub fn reset(&self) {
        *lock(&self.inner) = UiSnapshot::default();
        if let Err(e) = self.durable.remove(keys::ACTIVE_TAB) {
            tracing::warn!(error = %e, "failed to remove persisted active tab");
        }
    }
}

// --- Post Moderation Filters ---

pub const DEFAULT_POST_PAGE: u32 = 1;
pub const DEFAULT_POST_PAGE_SIZE: u32 = 5;

pub fn default_post_filters() -> PostQuery {
    PostQuery { page: Some(DEFAULT_POST_PAGE), size: Some(DEFAULT_POST_PAGE_SIZE), ..PostQuery::default() }
}

/// PostFilterState
///
/// Filters of the moderation table, plus the post opened in the edit dialog.
#[derive(Debug)]
pub struct PostFilterState {
    filters: Mutex<PostQuery>,
    current_post: Mutex<Option<PostItem>>,
}

impl Default for PostFilterState {
    fn default() -> Self {
        Self { filters: Mutex::new(default_post_filters()), current_post: Mutex::new(None) }
    }
}

impl PostFilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> PostQuery {
        lock(&self.filters).clone()
    }

    pub fn set_filters(&self, filters: PostQuery) {
        *lock(&self.filters) = filters;
    }

    pub fn update_filters(&self, patch: PostQuery) {
        lock(&self.filters).merge(patch);
    }

    pub fn reset_filters(&self) {
        *lock(&self.filters) = default_post_filters();
    }

    pub fn current_post(&self) -> Option<PostItem> {
        lock(&self.current_post).clone()
    }

    pub fn set_current_post(&self, post: Option<PostItem>) {
        *lock(&self.current_post) = post;
    }
}

// --- Notification Feed ---

#[derive(Debug, Default)]
struct FeedInner {
    unread_count: u64,
    notifications: Vec<Notification>,
    is_open: bool,
}

/// NotificationFeed
///
/// The bell panel: newest first, with an unread counter that never drops below zero.
#[derive(Debug, Default)]
pub struct NotificationFeed {
    inner: Mutex<FeedInner>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unread_count(&self) -> u64 {
        lock(&self.inner).unread_count
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.inner).notifications.clone()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner).is_open
    }

    pub fn set_unread_count(&self, count: u64) {
        lock(&self.inner).unread_count = count;
    }

    pub fn increment_unread(&self) {
        lock(&self.inner).unread_count += 1;
    }

    pub fn decrement_unread(&self) {
        let mut inner = lock(&self.inner);
        inner.unread_count = inner.unread_count.saturating_sub(1);
    }

    pub fn reset_unread(&self) {
        lock(&self.inner).unread_count = 0;
    }

    /// Replaces the list. Entries without a creation time are stamped with the current time.
    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        let stamped = notifications
            .into_iter()
            .map(|mut n| {
                if n.created_at.is_none() {
                    n.created_at = Some(now_iso());
                }
                n
            })
            .collect();
        lock(&self.inner).notifications = stamped;
    }

    /// Prepends a live notification.
    pub fn add(&self, notification: Notification) {
        let mut inner = lock(&self.inner);
        if !notification.read {
            inner.unread_count += 1;
        }
        inner.notifications.insert(0, notification);
    }

    pub fn mark_read(&self, id: i64) {
        let mut inner = lock(&self.inner);
        let Some(notification) = inner.notifications.iter_mut().find(|n| n.id == id) else {
            return;
        };
        if notification.read {
            return;
        }
        notification.read = true;
        notification.read_at = Some(now_iso());
        inner.unread_count = inner.unread_count.saturating_sub(1);
    }

    pub fn mark_all_read(&self) {
        let stamp = now_iso();
        let mut inner = lock(&self.inner);
        for notification in inner.notifications.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            notification.read_at = Some(stamp.clone());
        }
        inner.unread_count = 0;
    }

    pub fn remove(&self, id: i64) {
        let mut inner = lock(&self.inner);
        if let Some(index) = inner.notifications.iter().position(|n| n.id == id) {
            let removed = inner.notifications.remove(index);
            if !removed.read {
                inner.unread_count = inner.unread_count.saturating_sub(1);
            }
        }
    }

    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        inner.notifications.clear();
        inner.unread_count = 0;
    }

    pub fn toggle_panel(&self) -> bool {
        let mut inner = lock(&self.inner);
        inner.is_open = !inner.is_open;
        inner.is_open
    }

    pub fn set_panel_open(&self, open: bool) {
        lock(&self.inner).is_open = open;
    }
}
