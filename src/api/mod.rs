//! Typed calls for every backend endpoint the console uses, grouped by screen.
//!
//! Each function takes the shared `HttpClient`, so token handling, request ids and error
//! toasts apply uniformly. None of them mutate the session directly.

/// Sign-in, registration, OTP and password recovery, and the signed-in profile.
pub mod auth;

/// Account listing for the user-management table.
pub mod users;

/// Post moderation.
pub mod posts;

/// Categories and recipes (read-only).
pub mod recipes;

/// Report triage.
pub mod reports;

/// The signed-in admin's notification inbox and broadcast.
pub mod notifications;

/// Aggregated statistics for the dashboard cards and charts.
pub mod dashboard;
