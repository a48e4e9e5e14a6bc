//! MySQL implementation of DocumentStore
//!
//! Every collection shares one `documents` table keyed by
//! `(collection, id)`. The body is stored as JSON; the version and the
//! creation time are also kept in their own columns so that commits can
//! check preconditions under a row lock and listings can be ordered in SQL.
//!
//! Change notifications are published in-process after each successful
//! commit, so observers only see writes made through this store instance.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::types::Json;
use sqlx::{MySql, Row, Transaction};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;

use nest_core::errors::{DomainError, DomainResult};
use nest_core::repositories::document::{
    order_documents, server_timestamp, ChangeStream, Collection, Document, DocumentStore, Fields,
    Snapshot, WriteBatch, WriteKind, ABSENT_VERSION, CREATED_AT, UPDATED_AT,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection VARCHAR(32) NOT NULL,
    id VARCHAR(255) NOT NULL,
    version BIGINT UNSIGNED NOT NULL,
    body JSON NOT NULL,
    created_at VARCHAR(40) NOT NULL,
    PRIMARY KEY (collection, id),
    KEY idx_documents_created (collection, created_at)
)
"#;

/// MySQL SQLSTATE for deadlocks and serialization failures
const SERIALIZATION_FAILURE: &str = "40001";

/// MySQL implementation of DocumentStore
pub struct MySqlDocumentStore {
    pool: MySqlPool,
    channels: [broadcast::Sender<Snapshot>; Collection::COUNT],
    // Keeps snapshot publication in commit order
    publish_lock: Mutex<()>,
}

impl MySqlDocumentStore {
    /// Create a new MySQL document store
    pub fn new(pool: MySqlPool, change_buffer: usize) -> Self {
        Self {
            pool,
            channels: std::array::from_fn(|_| broadcast::channel(change_buffer.max(1)).0),
            publish_lock: Mutex::new(()),
        }
    }

    /// Create the `documents` table if it does not exist
    pub async fn ensure_schema(&self) -> DomainResult<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        info!("Document schema ready");
        Ok(())
    }

    /// Convert database row to Document
    fn row_to_document(row: &MySqlRow) -> DomainResult<Document> {
        let id: String = row.try_get("id").map_err(database_error)?;
        let version: u64 = row.try_get("version").map_err(database_error)?;
        let Json(fields): Json<Fields> = row.try_get("body").map_err(database_error)?;
        Ok(Document {
            id,
            version,
            fields,
        })
    }

    async fn lock_row(
        tx: &mut Transaction<'_, MySql>,
        collection: Collection,
        id: &str,
    ) -> DomainResult<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, version, body FROM documents WHERE collection = ? AND id = ? FOR UPDATE",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(database_error)?;
        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn write_row(
        tx: &mut Transaction<'_, MySql>,
        collection: Collection,
        document: &Document,
        exists: bool,
    ) -> DomainResult<()> {
        let created_at = document
            .fields
            .get(CREATED_AT)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let query = if exists {
            sqlx::query(
                "UPDATE documents SET version = ?, body = ?, created_at = ? \
                 WHERE collection = ? AND id = ?",
            )
            .bind(document.version)
            .bind(Json(&document.fields))
            .bind(created_at)
            .bind(collection.name())
            .bind(&document.id)
        } else {
            sqlx::query(
                "INSERT INTO documents (version, body, created_at, collection, id) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(document.version)
            .bind(Json(&document.fields))
            .bind(created_at)
            .bind(collection.name())
            .bind(&document.id)
        };
        query.execute(&mut **tx).await.map_err(database_error)?;
        Ok(())
    }

    async fn publish(&self, touched: &[Collection]) {
        let _guard = self.publish_lock.lock().await;
        for collection in touched {
            match self.list(*collection).await {
                Ok(documents) => {
                    debug!(
                        collection = %collection,
                        documents = documents.len(),
                        "Publishing collection snapshot"
                    );
                    let _ = self.channels[collection.index()].send(Arc::new(documents));
                }
                Err(err) => {
                    error!(collection = %collection, error = %err, "Failed to read snapshot");
                }
            }
        }
    }
}

fn database_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        // Two creates of one id race past the row lock; the loser hits the key
        if db.code().as_deref() == Some(SERIALIZATION_FAILURE) || db.is_unique_violation() {
            return DomainError::Conflict {
                message: db.message().to_string(),
            };
        }
    }
    DomainError::internal(format!("Database error: {}", err))
}

#[async_trait]
impl DocumentStore for MySqlDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> DomainResult<Option<Document>> {
        let row = sqlx::query("SELECT id, version, body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;
        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn list(&self, collection: Collection) -> DomainResult<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, version, body FROM documents WHERE collection = ? \
             ORDER BY created_at DESC, id ASC",
        )
        .bind(collection.name())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let mut documents = rows
            .iter()
            .map(Self::row_to_document)
            .collect::<DomainResult<Vec<_>>>()?;
        // Rows without a parseable timestamp sort last
        order_documents(&mut documents);
        Ok(documents)
    }

    async fn insert(&self, collection: Collection, mut fields: Fields) -> DomainResult<Document> {
        let now = server_timestamp(Utc::now());
        fields
            .entry(CREATED_AT.to_string())
            .or_insert_with(|| now.clone());
        fields.insert(UPDATED_AT.to_string(), now);
        let document = Document {
            id: Uuid::new_v4().simple().to_string(),
            version: 1,
            fields,
        };

        let mut tx = self.pool.begin().await.map_err(database_error)?;
        Self::write_row(&mut tx, collection, &document, false).await?;
        tx.commit().await.map_err(database_error)?;
        debug!(collection = %collection, id = %document.id, "Document inserted");

        self.publish(&[collection]).await;
        Ok(document)
    }

    async fn commit(&self, batch: WriteBatch) -> DomainResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let touched = batch.collections();
        let now = server_timestamp(Utc::now());
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // Dropping the transaction on an early return rolls it back
        for op in batch.into_ops() {
            let current = Self::lock_row(&mut tx, op.collection, &op.id).await?;
            if let Some(expected) = op.expected_version {
                let actual = current.as_ref().map_or(ABSENT_VERSION, |d| d.version);
                if actual != expected {
                    return Err(DomainError::Conflict {
                        message: format!(
                            "{}/{} expected version {} but found {}",
                            op.collection, op.id, expected, actual
                        ),
                    });
                }
            }

            match op.kind {
                WriteKind::Set(mut fields) => {
                    let created = current
                        .as_ref()
                        .and_then(|d| d.fields.get(CREATED_AT).cloned())
                        .unwrap_or_else(|| now.clone());
                    fields.insert(CREATED_AT.to_string(), created);
                    fields.insert(UPDATED_AT.to_string(), now.clone());
                    let document = Document {
                        id: op.id,
                        version: current.as_ref().map_or(1, |d| d.version + 1),
                        fields,
                    };
                    Self::write_row(&mut tx, op.collection, &document, current.is_some()).await?;
                }
                WriteKind::Merge(fields) => {
                    let mut document = current.ok_or_else(|| {
                        DomainError::not_found(format!("{}/{}", op.collection, op.id))
                    })?;
                    document.fields.extend(fields);
                    document.fields.insert(UPDATED_AT.to_string(), now.clone());
                    document.version += 1;
                    Self::write_row(&mut tx, op.collection, &document, true).await?;
                }
                WriteKind::Delete => {
                    sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                        .bind(op.collection.name())
                        .bind(&op.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(database_error)?;
                }
            }
        }

        tx.commit().await.map_err(database_error)?;
        self.publish(&touched).await;
        Ok(())
    }

    fn subscribe(&self, collection: Collection) -> ChangeStream {
        self.channels[collection.index()].subscribe()
    }
}
