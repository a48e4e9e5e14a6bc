//! Authentication and session configuration

use serde::{Deserialize, Serialize};

const DEFAULT_ADMIN_PASSWORD: &str = "change-me-super-admin";

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// bcrypt work factor used when hashing passwords (4..=31)
    pub bcrypt_cost: u32,

    /// Key under which the current session's user id is persisted
    pub session_key: String,

    /// Email of the super-admin account bootstrapped on first start
    pub super_admin_email: String,

    /// Display name of the bootstrapped super-admin
    pub super_admin_name: String,

    /// Initial password of the bootstrapped super-admin
    pub super_admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: 10,
            session_key: String::from("staynest:session_user_id"),
            super_admin_email: String::from("admin@staynest.dev"),
            super_admin_name: String::from("StayNest Admin"),
            super_admin_password: String::from(DEFAULT_ADMIN_PASSWORD),
        }
    }
}

impl AuthConfig {
    /// Configuration with the cheapest bcrypt cost, for tests
    pub fn for_tests() -> Self {
        Self {
            bcrypt_cost: 4,
            ..Default::default()
        }
    }

    /// Check if the super-admin still uses the shipped password (security warning)
    pub fn is_using_default_admin_password(&self) -> bool {
        self.super_admin_password == DEFAULT_ADMIN_PASSWORD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_password_detection() {
        assert!(AuthConfig::default().is_using_default_admin_password());

        let config = AuthConfig {
            super_admin_password: "s3cure-and-long".to_string(),
            ..Default::default()
        };
        assert!(!config.is_using_default_admin_password());
    }
}
