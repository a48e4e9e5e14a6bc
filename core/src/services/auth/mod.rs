//! Authentication and session module
//!
//! Accounts live in the remote `users` collection; the current session is a
//! single user id persisted in the local key-value store.

mod password;
mod service;

#[cfg(test)]
mod tests;

pub use password::{hash_password, verify_password};
pub use service::{AuthService, SUPER_ADMIN_ID};
