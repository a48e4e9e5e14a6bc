pub mod document;
pub mod kv;

pub use document::{
    run_transaction, ChangeStream, Collection, Document, DocumentStore, InMemoryDocumentStore,
    WriteBatch,
};
pub use kv::{InMemoryKeyValueStore, KeyValueStore};
