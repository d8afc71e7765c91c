//! Versioned document storage for the order-fulfillment engine.
//!
//! Every document carries a [`Version`] that increases by one on each write.
//! Writes are grouped into a [`WriteBatch`] and committed atomically; each write
//! states what version it expects to find, so a batch either applies completely
//! or fails with [`StoreError::ConcurrencyConflict`] and leaves no trace.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::{Document, DocumentKey, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::DocumentQuery;
pub use store::{DocumentStore, DocumentStoreExt, Expectation, Write, WriteBatch};
