pub mod r#trait {
    pub use super::trait_::*;
}
#[path = "trait.rs"]
mod trait_;
pub mod memory;
pub mod transaction;

pub use memory::InMemoryDocumentStore;
pub use r#trait::{
    encode, order_documents, server_timestamp, ChangeStream, Collection, Document, DocumentStore,
    Fields, Snapshot, WriteBatch, WriteKind, WriteOp, ABSENT_VERSION, CREATED_AT, UPDATED_AT,
};
pub use transaction::run_transaction;
