//! In-process implementation of DocumentStore
//!
//! Used by tests and by single-process deployments. All collections live
//! behind one lock, so a batch is validated and applied without interleaving
//! with other writers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

use super::trait_::{
    order_documents, server_timestamp, ChangeStream, Collection, Document, DocumentStore, Fields,
    Snapshot, WriteBatch, WriteKind, ABSENT_VERSION, CREATED_AT, UPDATED_AT,
};

type CollectionMap = HashMap<String, Document>;

/// Default capacity of each collection's snapshot channel
pub const DEFAULT_CHANGE_BUFFER: usize = 64;

/// In-memory document store with realtime snapshots
pub struct InMemoryDocumentStore {
    collections: RwLock<[CollectionMap; Collection::COUNT]>,
    channels: [broadcast::Sender<Snapshot>; Collection::COUNT],
    fail_writes: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_change_buffer(DEFAULT_CHANGE_BUFFER)
    }

    /// Create an empty store with a custom snapshot channel capacity
    pub fn with_change_buffer(capacity: usize) -> Self {
        Self {
            collections: RwLock::new(Default::default()),
            channels: std::array::from_fn(|_| broadcast::channel(capacity.max(1)).0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail, to exercise error paths
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(DomainError::internal("document store rejected the write"))
        } else {
            Ok(())
        }
    }

    fn snapshot(map: &CollectionMap) -> Snapshot {
        let mut documents: Vec<Document> = map.values().cloned().collect();
        order_documents(&mut documents);
        Arc::new(documents)
    }

    fn publish(&self, collections: &[CollectionMap; Collection::COUNT], touched: &[Collection]) {
        for collection in touched {
            let snapshot = Self::snapshot(&collections[collection.index()]);
            debug!(
                collection = %collection,
                documents = snapshot.len(),
                "Publishing collection snapshot"
            );
            // No receivers is fine
            let _ = self.channels[collection.index()].send(snapshot);
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn stamp_created(fields: &mut Fields) {
    let now = server_timestamp(Utc::now());
    fields
        .entry(CREATED_AT.to_string())
        .or_insert_with(|| now.clone());
    fields.insert(UPDATED_AT.to_string(), now);
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> DomainResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections[collection.index()].get(id).cloned())
    }

    async fn list(&self, collection: Collection) -> DomainResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(Self::snapshot(&collections[collection.index()])
            .as_ref()
            .clone())
    }

    async fn insert(&self, collection: Collection, mut fields: Fields) -> DomainResult<Document> {
        self.check_writable()?;
        stamp_created(&mut fields);
        let document = Document {
            id: Uuid::new_v4().simple().to_string(),
            version: 1,
            fields,
        };

        let mut collections = self.collections.write().await;
        collections[collection.index()].insert(document.id.clone(), document.clone());
        self.publish(&collections, &[collection]);
        Ok(document)
    }

    async fn commit(&self, batch: WriteBatch) -> DomainResult<()> {
        self.check_writable()?;
        if batch.is_empty() {
            return Ok(());
        }
        let touched = batch.collections();
        let mut collections = self.collections.write().await;

        // Validate every precondition before touching anything
        for op in batch.ops() {
            let current = collections[op.collection.index()].get(&op.id);
            if let Some(expected) = op.expected_version {
                let actual = current.map_or(ABSENT_VERSION, |d| d.version);
                if actual != expected {
                    return Err(DomainError::Conflict {
                        message: format!(
                            "{}/{} expected version {} but found {}",
                            op.collection, op.id, expected, actual
                        ),
                    });
                }
            }
            if matches!(op.kind, WriteKind::Merge(_)) && current.is_none() {
                return Err(DomainError::not_found(format!("{}/{}", op.collection, op.id)));
            }
        }

        let now = server_timestamp(Utc::now());
        for op in batch.into_ops() {
            let map = &mut collections[op.collection.index()];
            match op.kind {
                WriteKind::Set(mut fields) => {
                    let previous = map.get(&op.id);
                    let version = previous.map_or(1, |d| d.version + 1);
                    let created = previous
                        .and_then(|d| d.fields.get(CREATED_AT).cloned())
                        .unwrap_or_else(|| now.clone());
                    fields.insert(CREATED_AT.to_string(), created);
                    fields.insert(UPDATED_AT.to_string(), now.clone());
                    map.insert(
                        op.id.clone(),
                        Document {
                            id: op.id,
                            version,
                            fields,
                        },
                    );
                }
                WriteKind::Merge(fields) => {
                    if let Some(document) = map.get_mut(&op.id) {
                        document.fields.extend(fields);
                        document.fields.insert(UPDATED_AT.to_string(), now.clone());
                        document.version += 1;
                    }
                }
                WriteKind::Delete => {
                    map.remove(&op.id);
                }
            }
        }

        self.publish(&collections, &touched);
        Ok(())
    }

    fn subscribe(&self, collection: Collection) -> ChangeStream {
        self.channels[collection.index()].subscribe()
    }
}
