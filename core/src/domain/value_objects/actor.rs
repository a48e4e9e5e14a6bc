//! The identity on whose behalf a service operation runs.
//!
//! Only this crate can mint an [`Actor`]: callers obtain one from
//! `AuthService::actor()`. Services still re-read the user before acting, so
//! an actor taken before its account was disabled or its role changed is
//! refused.

use crate::domain::entities::user::{User, UserRole};
use crate::errors::{DomainError, DomainResult};

/// Caller identity used for capability checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    user_id: String,
    role: UserRole,
}

impl Actor {
    pub(crate) fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub(crate) fn from_user(user: &User) -> Self {
        Self::new(user.id.clone(), user.role)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Role held when the actor was issued
    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether the actor is the given user
    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Owner of the resource or an admin
    pub fn owns_or_admin(&self, owner_id: &str) -> bool {
        self.is(owner_id) || self.is_admin()
    }

    pub fn require_admin(&self) -> DomainResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Unauthorized)
        }
    }

    pub fn require(&self, allowed: bool) -> DomainResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(DomainError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let host = Actor::new("h1", UserRole::Host);
        assert!(host.owns_or_admin("h1"));
        assert!(!host.owns_or_admin("h2"));
        assert!(host.require_admin().is_err());

        let admin = Actor::new("a1", UserRole::Admin);
        assert!(admin.owns_or_admin("h2"));
        assert!(admin.require_admin().is_ok());
        assert!(matches!(admin.require(false), Err(DomainError::Unauthorized)));
        assert_eq!(admin.user_id(), "a1");
        assert_eq!(admin.role(), UserRole::Admin);
    }
}
