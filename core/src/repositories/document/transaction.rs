//! Optimistic read-modify-write transactions over a DocumentStore.

use std::future::Future;

use tracing::{debug, warn};

use crate::errors::{DomainError, DomainResult};

use super::trait_::{DocumentStore, WriteBatch};

/// Run `body` and commit the batch it produces, retrying on conflict.
///
/// The body must re-read everything it depends on each time it runs and pin
/// those reads with `merge_at_version`. Any error other than a conflict is
/// returned immediately; a conflict on the last attempt is returned as is.
pub async fn run_transaction<S, F, Fut, T>(
    store: &S,
    max_attempts: u32,
    mut body: F,
) -> DomainResult<T>
where
    S: DocumentStore + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = DomainResult<(WriteBatch, T)>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let (batch, output) = body().await?;
        match store.commit(batch).await {
            Ok(()) => {
                debug!(attempt, "Transaction committed");
                return Ok(output);
            }
            Err(err @ DomainError::Conflict { .. }) if attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %err, "Transaction conflict, retrying");
                attempt += 1;
                tokio::task::yield_now().await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::repositories::document::{Collection, InMemoryDocumentStore};

    #[tokio::test]
    async fn test_retries_until_versions_match() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let doc = store
            .insert(
                Collection::Properties,
                json!({ "count": 0 }).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();
        let attempts = AtomicU32::new(0);

        let result = run_transaction(store.as_ref(), 3, || {
            let store = store.clone();
            let id = doc.id.clone();
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                let current = store.get(Collection::Properties, &id).await?.unwrap();
                if attempt == 0 {
                    // Someone else writes between our read and our commit
                    store
                        .merge(
                            Collection::Properties,
                            &id,
                            json!({ "count": 10 }).as_object().cloned().unwrap(),
                        )
                        .await?;
                }
                let count = current.fields["count"].as_i64().unwrap() + 1;
                let batch = WriteBatch::new().merge_at_version(
                    Collection::Properties,
                    &id,
                    current.version,
                    json!({ "count": count }).as_object().cloned().unwrap(),
                );
                Ok((batch, count))
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 11);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = InMemoryDocumentStore::new();
        let attempts = AtomicU32::new(0);
        let err = run_transaction(&store, 2, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                let batch = WriteBatch::new().merge_at_version(
                    Collection::Bookings,
                    "missing",
                    1,
                    serde_json::Map::new(),
                );
                Ok((batch, ()))
            }
        })
        .await
        .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_body_errors_are_not_retried() {
        let store = InMemoryDocumentStore::new();
        let attempts = AtomicU32::new(0);
        let err = run_transaction(&store, 5, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(WriteBatch, ()), _>(DomainError::rule("already reviewed")) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::BusinessRule { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
