// ============================
// crates/session-lib/src/validation.rs
// ============================
//! Form validation for the login and registration screens.
//!
//! These checks run before a request is sent so obvious typos never reach
//! the server. The credential service itself does not call them; server
//! side rejections are propagated as they are.

use helpdesk_common::{LoginRequest, RegisterRequest};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
});

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    InvalidEmail(String),

    #[error("{0}")]
    InvalidPassword(String),

    #[error("{field}: {reason}")]
    InvalidName { field: &'static str, reason: String },
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(email)
}

/// Validate a password
pub fn validate_password(password: &str) -> ValidationResult<&str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(password)
}

fn validate_name<'a>(field: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::InvalidName {
            field,
            reason: "is required".to_string(),
        });
    }
    if len > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName {
            field,
            reason: "is too long".to_string(),
        });
    }
    Ok(value)
}

pub fn validate_login(req: &LoginRequest) -> ValidationResult<()> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    Ok(())
}

pub fn validate_registration(req: &RegisterRequest) -> ValidationResult<()> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    validate_name("First name", &req.first_name)?;
    validate_name("Last name", &req.last_name)?;
    Ok(())
}
