//! Form validation rules shared by registration, profile editing, listings
//! and comments.
//!
//! Every check pushes its messages into a [`ValidationError`] instead of
//! returning early, so a form reports all of its problems at once.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{
    MAX_LOCATION_LEN, MAX_NAME_LEN, MAX_PHONE_LEN, MAX_TITLE_LEN, MAX_USERNAME_LEN,
    MIN_PASSWORD_LEN, MIN_USERNAME_LEN,
};
use crate::error::ValidationError;

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d\s\-+()]+$").expect("phone pattern is valid"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

pub fn check_username(username: &str, errors: &mut ValidationError) {
    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        errors.add(
            "username",
            format!("Username must be at least {MIN_USERNAME_LEN} characters"),
        );
    } else if len > MAX_USERNAME_LEN {
        errors.add(
            "username",
            format!("Username must be at most {MAX_USERNAME_LEN} characters"),
        );
    }
    if username.chars().any(char::is_whitespace) {
        errors.add("username", "Username must not contain spaces");
    }
}

/// Length, letter+digit mix, and confirmation match.
pub fn check_password(password: &str, confirmation: &str, errors: &mut ValidationError) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password1",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        errors.add("password1", "Password must contain both letters and digits");
    }
    if password != confirmation {
        errors.add("password2", "Passwords do not match");
    }
}

pub fn check_email(email: &str, errors: &mut ValidationError) {
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !email_regex().is_match(email) {
        errors.add("email", "Enter a valid email address");
    }
}

/// Required person name (first or last), at most [`MAX_NAME_LEN`] chars.
pub fn check_name(field: &str, value: &str, errors: &mut ValidationError) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required");
    } else if value.chars().count() > MAX_NAME_LEN {
        errors.add(field, format!("At most {MAX_NAME_LEN} characters"));
    }
}

/// Empty phone is allowed.
pub fn check_phone(phone: &str, errors: &mut ValidationError) {
    if phone.is_empty() {
        return;
    }
    if phone.chars().count() > MAX_PHONE_LEN {
        errors.add("phone", format!("At most {MAX_PHONE_LEN} characters"));
    } else if !phone_regex().is_match(phone) {
        errors.add("phone", "Enter a valid phone number");
    }
}

/// Trim `value` and require it to be non-empty and within `max` chars.
pub fn required_text(
    field: &str,
    value: &str,
    max: Option<usize>,
    errors: &mut ValidationError,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field is required");
    } else if let Some(max) = max {
        if trimmed.chars().count() > max {
            errors.add(field, format!("At most {max} characters"));
        }
    }
    trimmed.to_string()
}

pub fn check_title(title: &str, errors: &mut ValidationError) -> String {
    required_text("title", title, Some(MAX_TITLE_LEN), errors)
}

pub fn check_location(location: &str, errors: &mut ValidationError) -> String {
    required_text("location", location, Some(MAX_LOCATION_LEN), errors)
}
