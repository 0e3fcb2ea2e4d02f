//! Client-side checks run before a request is sent.
//!
//! The rules match what the server enforces, so a form that passes here is
//! only rejected for reasons the client cannot know (a taken username, say).
//! A failed check never reaches the network.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{
    constants::{MAX_COMMENT_CHARS, MAX_UPLOAD_BYTES},
    models::Registration,
};

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{3,19}$").expect("valid username pattern"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid email pattern"));

const MIN_PASSWORD_CHARS: usize = 6;

/// A value that failed a pre-submission check.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error(
        "Username must start with a letter and contain 4-20 Latin letters or digits"
    )]
    InvalidUsername,

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Password {reason}")]
    WeakPassword { reason: &'static str },

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Comment is {actual} characters, the limit is {max}")]
    CommentTooLong { max: usize, actual: usize },

    #[error("Invalid file name '{name}'")]
    InvalidFileName { name: String },

    #[error("File is {size} bytes, the limit is {max}")]
    FileTooLarge { size: u64, max: u64 },
}

impl ValidationError {
    /// Name of the offending form field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field } => field,
            ValidationError::InvalidUsername => "username",
            ValidationError::InvalidEmail => "email",
            ValidationError::WeakPassword { .. } => "password",
            ValidationError::PasswordMismatch => "password_confirm",
            ValidationError::CommentTooLong { .. } => "comment",
            ValidationError::InvalidFileName { .. } => "name",
            ValidationError::FileTooLarge { .. } => "file",
        }
    }
}

impl From<ValidationError> for crate::Error {
    fn from(err: ValidationError) -> Self {
        crate::Error::Validation(err)
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Required { field: "username" });
    }
    if !USERNAME.is_match(username) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::Required { field: "email" });
    }
    if !EMAIL.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// At least six characters with an uppercase letter, a digit and a symbol.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required { field: "password" });
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::WeakPassword {
            reason: "must be at least 6 characters",
        });
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::WeakPassword {
            reason: "must contain an uppercase letter",
        });
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::WeakPassword {
            reason: "must contain a digit",
        });
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::WeakPassword {
            reason: "must contain a special character",
        });
    }
    Ok(())
}

/// Check every field of a sign-up form, reporting the first failure.
pub fn validate_registration(form: &Registration) -> Result<(), ValidationError> {
    validate_username(&form.username)?;
    if form.full_name.trim().is_empty() {
        return Err(ValidationError::Required { field: "full_name" });
    }
    validate_email(&form.email)?;
    validate_password(&form.password)?;
    if form.password != form.password_confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn validate_comment(comment: &str) -> Result<(), ValidationError> {
    let actual = comment.chars().count();
    if actual > MAX_COMMENT_CHARS {
        return Err(ValidationError::CommentTooLong {
            max: MAX_COMMENT_CHARS,
            actual,
        });
    }
    Ok(())
}

/// Non-empty and free of path separators.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ValidationError::InvalidFileName {
            name: name.to_string(),
        });
    }
    Ok(())
}

pub fn validate_upload_size(size: u64) -> Result<(), ValidationError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}
