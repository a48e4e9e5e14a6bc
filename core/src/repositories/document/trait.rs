//! Document store trait defining the contract of the realtime document database.
//!
//! Collections map generated string ids to flat JSON documents. Every write
//! bumps the document's version, which is what optimistic transactions check
//! against. Subscribers receive the full ordered snapshot of a collection
//! after every committed change to it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::errors::{DomainError, DomainResult};

/// Field map of a stored document
pub type Fields = Map<String, Value>;

/// Full ordered contents of one collection
pub type Snapshot = Arc<Vec<Document>>;

/// Receiver of collection snapshots
pub type ChangeStream = broadcast::Receiver<Snapshot>;

/// Field stamped by the store when a document is created
pub const CREATED_AT: &str = "created_at";

/// Field stamped by the store on every write
pub const UPDATED_AT: &str = "updated_at";

/// The remote collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Properties,
    Bookings,
    Inquiries,
    /// Normalized email to user id; keeps emails unique across signups
    UserEmails,
}

impl Collection {
    pub const COUNT: usize = 5;

    pub const ALL: [Collection; Collection::COUNT] = [
        Collection::Users,
        Collection::Properties,
        Collection::Bookings,
        Collection::Inquiries,
        Collection::UserEmails,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Properties => "properties",
            Collection::Bookings => "bookings",
            Collection::Inquiries => "inquiries",
            Collection::UserEmails => "user_emails",
        }
    }

    /// Stable position in [`Collection::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Collection::Users => 0,
            Collection::Properties => 1,
            Collection::Bookings => 2,
            Collection::Inquiries => 3,
            Collection::UserEmails => 4,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("Unknown collection: {}", s))
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    /// Starts at 1 and increases by one on every write
    pub version: u64,
    pub fields: Fields,
}

impl Document {
    /// Decode into an entity; the document id is injected as `id`
    pub fn decode<T: DeserializeOwned>(&self) -> DomainResult<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Server-stamped creation time, if present and well formed
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.fields
            .get(CREATED_AT)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Encode an entity or draft into document fields. The id and the
/// store-managed timestamps are dropped.
pub fn encode<T: Serialize>(value: &T) -> DomainResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            map.remove(CREATED_AT);
            map.remove(UPDATED_AT);
            Ok(map)
        }
        other => Err(DomainError::internal(format!(
            "Documents must encode as objects, got {}",
            other
        ))),
    }
}

/// Timestamp value in the format the stores write
pub fn server_timestamp(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Order used by every listing and snapshot: newest first, then by id
pub fn order_documents(documents: &mut [Document]) {
    documents.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Version precondition that only holds while the document does not exist
pub const ABSENT_VERSION: u64 = 0;

/// What a single write does
#[derive(Debug, Clone, PartialEq)]
pub enum WriteKind {
    /// Create or fully replace
    Set(Fields),
    /// Update the given fields of an existing document
    Merge(Fields),
    /// Remove the document (no-op when absent)
    Delete,
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub collection: Collection,
    pub id: String,
    pub kind: WriteKind,
    /// Fail the whole batch unless the stored version equals this; an
    /// absent document counts as [`ABSENT_VERSION`]
    pub expected_version: Option<u64>,
}

/// Writes committed atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, collection: Collection, id: &str, kind: WriteKind, expected_version: Option<u64>) -> Self {
        self.ops.push(WriteOp {
            collection,
            id: id.to_string(),
            kind,
            expected_version,
        });
        self
    }

    pub fn set(self, collection: Collection, id: &str, fields: Fields) -> Self {
        self.push(collection, id, WriteKind::Set(fields), None)
    }

    /// Set that fails with a conflict if the document already exists
    pub fn create(self, collection: Collection, id: &str, fields: Fields) -> Self {
        self.push(collection, id, WriteKind::Set(fields), Some(ABSENT_VERSION))
    }

    pub fn merge(self, collection: Collection, id: &str, fields: Fields) -> Self {
        self.push(collection, id, WriteKind::Merge(fields), None)
    }

    /// Merge that only applies if nobody wrote the document since `version` was read
    pub fn merge_at_version(
        self,
        collection: Collection,
        id: &str,
        version: u64,
        fields: Fields,
    ) -> Self {
        self.push(collection, id, WriteKind::Merge(fields), Some(version))
    }

    pub fn delete(self, collection: Collection, id: &str) -> Self {
        self.push(collection, id, WriteKind::Delete, None)
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Collections touched by this batch, without duplicates
    pub fn collections(&self) -> Vec<Collection> {
        let mut touched: Vec<Collection> = Vec::new();
        for op in &self.ops {
            if !touched.contains(&op.collection) {
                touched.push(op.collection);
            }
        }
        touched
    }
}

/// Repository trait for the remote document database
///
/// Implementations must make `commit` all-or-nothing and must publish a new
/// snapshot to every subscriber of each collection a successful write touched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read
    async fn get(&self, collection: Collection, id: &str) -> DomainResult<Option<Document>>;

    /// All documents of a collection, ordered newest first
    async fn list(&self, collection: Collection) -> DomainResult<Vec<Document>>;

    /// Create a document under a generated id, stamping `created_at`
    async fn insert(&self, collection: Collection, fields: Fields) -> DomainResult<Document>;

    /// Apply every write or none
    ///
    /// # Returns
    /// * `Err(DomainError::Conflict)` - a version precondition failed, or a
    ///   create targeted an existing document
    /// * `Err(DomainError::NotFound)` - a merge targeted a missing document
    async fn commit(&self, batch: WriteBatch) -> DomainResult<()>;

    /// Subscribe to full snapshots of a collection
    fn subscribe(&self, collection: Collection) -> ChangeStream;

    /// Update fields of one document
    async fn merge(&self, collection: Collection, id: &str, fields: Fields) -> DomainResult<()> {
        self.commit(WriteBatch::new().merge(collection, id, fields)).await
    }

    /// Remove one document
    async fn delete(&self, collection: Collection, id: &str) -> DomainResult<()> {
        self.commit(WriteBatch::new().delete(collection, id)).await
    }
}
