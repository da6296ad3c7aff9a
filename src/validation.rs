use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::models::{Gender, NotificationRequest};

pub const MIN_USERNAME_CHARS: usize = 2;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const OTP_LENGTH: usize = 6;
pub const MIN_AGE_YEARS: i32 = 18;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));

/// ValidationErrors
///
/// Field name to message, in field order. An empty set means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Loose email shape check: something, `@`, something, `.`, something, no whitespace.
pub fn is_email_shaped(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

fn check_email(errors: &mut ValidationErrors, email: &str, missing: &str, malformed: &str) {
    if email.is_empty() {
        errors.insert("email", missing);
    } else if !is_email_shaped(email) {
        errors.insert("email", malformed);
    }
}

fn check_new_password(errors: &mut ValidationErrors, password: &str, confirm: &str) {
    if password.is_empty() {
        errors.insert("password", "Please enter a password");
    } else if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.insert("password", "Password must be at least 8 characters");
    }

    if confirm.is_empty() {
        errors.insert("confirmPassword", "Please confirm your password");
    } else if confirm != password {
        errors.insert("confirmPassword", "Passwords do not match");
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email, "Please enter email", "Invalid email format");
    if password.is_empty() {
        errors.insert("password", "Please enter password");
    }
    errors.into_result()
}

pub fn validate_forgot_password(email: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(
        &mut errors,
        email,
        "Please enter your email address",
        "Please enter a valid email address",
    );
    errors.into_result()
}

pub fn validate_register(
    email: &str,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(
        &mut errors,
        email,
        "Please enter your email address",
        "Please enter a valid email address",
    );

    let username = username.trim();
    if username.is_empty() {
        errors.insert("username", "Please enter your full name");
    } else if username.chars().count() < MIN_USERNAME_CHARS {
        errors.insert("username", "Full name must be at least 2 characters");
    }

    check_new_password(&mut errors, password, confirm_password);
    errors.into_result()
}

pub fn validate_reset_password(password: &str, confirm_password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_new_password(&mut errors, password, confirm_password);
    errors.into_result()
}

pub fn validate_otp(code: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        errors.insert("otp", "Please enter the 6-digit OTP code");
    }
    errors.into_result()
}

/// Whole years between `dob` and `today`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// ProfileForm
///
/// The editable subset of the profile screen, as the user typed it.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub gender: Option<Gender>,
    /// ISO date (`YYYY-MM-DD`), optionally followed by a time part.
    pub dob: Option<&'a str>,
}

pub fn validate_profile(form: &ProfileForm<'_>, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if form.username.is_empty() {
        errors.insert("username", "Please enter your full name");
    } else if form.username.chars().count() < MIN_USERNAME_CHARS {
        errors.insert("username", "Full name must be at least 2 characters");
    }

    if form.email.trim().is_empty() {
        errors.insert("email", "Please enter your email");
    }

    if form.gender.is_none() {
        errors.insert("gender", "Please select your gender");
    }

    match form.dob.map(str::trim).filter(|s| !s.is_empty()) {
        None => errors.insert("dob", "Please select your date of birth"),
        Some(raw) => {
            let date_part = raw.get(..10).unwrap_or(raw);
            match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                Ok(dob) if age_on(dob, today) >= MIN_AGE_YEARS => {}
                Ok(_) => errors.insert("dob", "You must be at least 18 years old"),
                Err(_) => errors.insert("dob", "Please select a valid date of birth"),
            }
        }
    }

    errors.into_result()
}

/// Broadcast form check. `send_to_all` ignores whatever user id was typed.
pub fn validate_broadcast(request: &NotificationRequest, send_to_all: bool) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if request.title.trim().is_empty() {
        errors.insert("title", "Title is required");
    }
    if request.body.trim().is_empty() {
        errors.insert("body", "Message is required");
    }
    if !send_to_all && request.user_id.is_none_or(|id| id <= 0) {
        errors.insert("userId", "Valid User ID is required");
    }
    errors.into_result()
}

/// PasswordStrength
///
/// The live checklist shown under new-password fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordStrength {
    pub min_length: bool,
    pub mixed_case: bool,
    pub digit: bool,
    pub symbol: bool,
}

impl PasswordStrength {
    pub fn score(&self) -> u8 {
        [self.min_length, self.mixed_case, self.digit, self.symbol]
            .iter()
            .filter(|passed| **passed)
            .count() as u8
    }

    pub fn is_strong(&self) -> bool {
        self.score() == 4
    }
}

pub fn password_strength(password: &str) -> PasswordStrength {
    PasswordStrength {
        min_length: password.chars().count() >= MIN_PASSWORD_CHARS,
        mixed_case: password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_lowercase()),
        digit: password.chars().any(|c| c.is_ascii_digit()),
        symbol: password.chars().any(|c| !c.is_ascii_alphanumeric()),
    }
}
