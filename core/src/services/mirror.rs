//! Realtime mirror of one remote collection
//!
//! A mirror owns the decoded snapshot of a collection. A background task
//! consumes the collection's change stream and replaces the whole snapshot
//! on every notification, then republishes it to local observers.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::repositories::document::{ChangeStream, Collection, Document};

/// Decode every document, skipping the ones that do not match `T`
pub fn decode_all<T: DeserializeOwned>(collection: Collection, documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|document| match document.decode::<T>() {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(
                    collection = %collection,
                    id = %document.id,
                    error = %err,
                    "Skipping undecodable document"
                );
                None
            }
        })
        .collect()
}

/// In-memory copy of a collection kept current by push notifications
pub struct RealtimeMirror<T> {
    collection: Collection,
    snapshot: watch::Receiver<Arc<Vec<T>>>,
    listener: JoinHandle<()>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> RealtimeMirror<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Start mirroring from an initial listing.
    ///
    /// `stream` must have been obtained before `initial` was read so that no
    /// change committed in between is lost.
    pub fn attach(collection: Collection, mut stream: ChangeStream, initial: &[Document]) -> Self {
        let (tx, rx) = watch::channel(Arc::new(decode_all::<T>(collection, initial)));

        let listener = tokio::spawn(async move {
            loop {
                match stream.recv().await {
                    Ok(documents) => {
                        let entities = decode_all::<T>(collection, &documents);
                        debug!(
                            collection = %collection,
                            documents = entities.len(),
                            "Mirror snapshot replaced"
                        );
                        tx.send_replace(Arc::new(entities));
                    }
                    // Every snapshot is complete, so the next one catches us up
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(collection = %collection, skipped, "Mirror lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(collection = %collection, "Change stream closed");
                        break;
                    }
                }
            }
        });

        Self {
            collection,
            snapshot: rx,
            listener,
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// The latest snapshot
    pub fn current(&self) -> Arc<Vec<T>> {
        self.snapshot.borrow().clone()
    }

    /// Observe every snapshot replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<T>>> {
        self.snapshot.clone()
    }

    /// Stop listening; the last snapshot stays readable
    pub fn detach(&self) {
        if !self.listener.is_finished() {
            debug!(collection = %self.collection, "Detaching mirror");
            self.listener.abort();
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.listener.is_finished()
    }
}

impl<T> Drop for RealtimeMirror<T> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::repositories::document::{DocumentStore, InMemoryDocumentStore};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Note {
        id: String,
        text: String,
    }

    fn fields(value: serde_json::Value) -> crate::repositories::document::Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_mirror_replaces_snapshot_on_change() {
        let store = InMemoryDocumentStore::new();
        let stream = store.subscribe(Collection::Inquiries);
        store
            .insert(Collection::Inquiries, fields(json!({ "text": "first" })))
            .await
            .unwrap();
        let initial = store.list(Collection::Inquiries).await.unwrap();

        let mirror = RealtimeMirror::<Note>::attach(Collection::Inquiries, stream, &initial);
        assert_eq!(mirror.current().len(), 1);

        let mut rx = mirror.subscribe();
        store
            .insert(Collection::Inquiries, fields(json!({ "text": "second" })))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|notes| notes.len() == 2))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_documents_are_skipped() {
        let store = InMemoryDocumentStore::new();
        let stream = store.subscribe(Collection::Inquiries);
        store
            .insert(Collection::Inquiries, fields(json!({ "text": "ok" })))
            .await
            .unwrap();
        store
            .insert(Collection::Inquiries, fields(json!({ "text": 42 })))
            .await
            .unwrap();
        let initial = store.list(Collection::Inquiries).await.unwrap();

        let mirror = RealtimeMirror::<Note>::attach(Collection::Inquiries, stream, &initial);
        let notes = mirror.current();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "ok");
    }

    #[tokio::test]
    async fn test_detached_mirror_stops_updating() {
        let store = InMemoryDocumentStore::new();
        let stream = store.subscribe(Collection::Users);
        let mirror = RealtimeMirror::<Note>::attach(Collection::Users, stream, &[]);
        mirror.detach();
        tokio::task::yield_now().await;

        store
            .insert(Collection::Users, fields(json!({ "text": "late" })))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(mirror.current().is_empty());
        assert!(!mirror.is_attached());
    }
}
