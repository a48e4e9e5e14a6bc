//! User entity representing a registered account in the StayNest system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Role a user acts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Searches, books and sends inquiries
    #[default]
    Guest,
    /// Lists properties and answers bookings and inquiries
    Host,
    /// Moderates listings and identity verification
    Admin,
    /// The single administrator that can never be deleted or disabled
    SuperAdmin,
}

impl UserRole {
    /// Admin capabilities (admin or super-admin)
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

/// Identity verification lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Pending,
    Verified,
    Rejected,
}

/// User entity as stored in the `users` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Document id
    #[serde(default)]
    pub id: String,

    pub name: String,

    /// Always stored lower-cased
    pub email: String,

    /// bcrypt hash, never the plaintext
    pub password_hash: String,

    pub role: UserRole,

    pub avatar_url: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub bio: Option<String>,

    #[serde(default)]
    pub verification_status: VerificationStatus,

    /// Reference to the uploaded identity document
    #[serde(default)]
    pub id_document: Option<String>,

    /// Property ids, each at most once
    #[serde(default)]
    pub wishlist: Vec<String>,

    #[serde(default)]
    pub is_disabled: bool,

    /// Stamped by the document store
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the property is on the wishlist
    pub fn has_wishlisted(&self, property_id: &str) -> bool {
        self.wishlist.iter().any(|id| id == property_id)
    }

    /// Add or remove a property from the wishlist. Returns the new membership.
    pub fn toggle_wishlist(&mut self, property_id: &str) -> bool {
        if self.has_wishlisted(property_id) {
            self.wishlist.retain(|id| id != property_id);
            false
        } else {
            self.wishlist.push(property_id.to_string());
            true
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    pub fn is_host(&self) -> bool {
        self.role == UserRole::Host
    }
}

/// Placeholder avatar derived from the user's name
pub fn placeholder_avatar(name: &str) -> String {
    let seed: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    format!("https://api.dicebear.com/7.x/initials/svg?seed={}", seed)
}

/// Input for account creation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 2, max = 80))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,

    /// Guest or host; admin roles cannot be self-assigned
    #[serde(default)]
    pub role: UserRole,
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 2, max = 80))]
    pub name: Option<String>,

    pub avatar_url: Option<String>,

    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,
}
