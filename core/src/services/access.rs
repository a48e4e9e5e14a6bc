//! Re-check of a caller against the users collection

use tracing::warn;

use crate::domain::entities::user::User;
use crate::domain::value_objects::Actor;
use crate::errors::{DomainError, DomainResult};
use crate::repositories::document::{Collection, DocumentStore};

/// Resolve the actor's stored account
///
/// # Returns
/// * `Ok(User)` - The account exists, is enabled and still holds the actor's role
/// * `Err(DomainError::Unauthorized)` - Otherwise
pub(crate) async fn authorize(store: &dyn DocumentStore, actor: &Actor) -> DomainResult<User> {
    let user: User = match store.get(Collection::Users, actor.user_id()).await? {
        Some(document) => document.decode()?,
        None => {
            warn!(user_id = actor.user_id(), "Actor has no account");
            return Err(DomainError::Unauthorized);
        }
    };
    if user.is_disabled {
        warn!(user_id = actor.user_id(), "Actor account is disabled");
        return Err(DomainError::Unauthorized);
    }
    if user.role != actor.role() {
        warn!(
            user_id = actor.user_id(),
            issued = ?actor.role(),
            current = ?user.role,
            "Actor role is stale"
        );
        return Err(DomainError::Unauthorized);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::entities::user::UserRole;
    use crate::repositories::document::{InMemoryDocumentStore, WriteBatch};

    async fn store_with(role: &str, disabled: bool) -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        let fields = json!({
            "name": "Hal Host",
            "email": "hal@example.com",
            "password_hash": "x",
            "role": role,
            "avatar_url": "https://example.com/a.png",
            "is_disabled": disabled,
        });
        store
            .commit(WriteBatch::new().set(
                Collection::Users,
                "u1",
                fields.as_object().cloned().unwrap(),
            ))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_current_account_is_authorized() {
        let store = store_with("host", false).await;
        let user = authorize(&store, &Actor::new("u1", UserRole::Host)).await.unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_unknown_disabled_and_stale_actors_are_refused() {
        let store = store_with("host", false).await;
        for actor in [
            Actor::new("ghost", UserRole::Admin),
            Actor::new("u1", UserRole::Admin),
        ] {
            let err = authorize(&store, &actor).await.unwrap_err();
            assert!(matches!(err, DomainError::Unauthorized));
        }

        let store = store_with("host", true).await;
        let err = authorize(&store, &Actor::new("u1", UserRole::Host))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized));
    }
}
