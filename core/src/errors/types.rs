//! Domain-specific error types for authentication and input validation
//!
//! User-facing wording is left to the presentation layer; these messages are
//! meant for logs and for tests.

use thiserror::Error;

/// Authentication and session errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("No active session")]
    NotLoggedIn,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Password hashing failed")]
    HashingFailed,
}

/// Validation errors for individual fields
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field required: {field}")]
    RequiredField { field: String },

    #[error("Value out of range for field: {field} (min: {min}, max: {max})")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid date range: check-out must be after check-in")]
    InvalidDateRange,

    #[error("Duplicate value for field: {field}")]
    DuplicateValue { field: String },
}
