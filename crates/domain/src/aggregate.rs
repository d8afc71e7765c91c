//! Mapping of aggregates onto document-store collections.

use document_store::DocumentKey;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for aggregates persisted as versioned documents.
///
/// An aggregate is a cluster of domain objects that is read and written as a
/// single unit. Each aggregate type lives in its own collection and is stored
/// as one JSON document; the store's version on that document is what
/// optimistic concurrency is checked against.
pub trait Aggregate: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// Returns the collection this aggregate type is stored in.
    fn collection() -> &'static str;

    /// Returns the id of this aggregate within its collection.
    fn document_id(&self) -> String;

    /// Returns the store key for an aggregate with the given id.
    fn key_for(id: impl std::fmt::Display) -> DocumentKey {
        DocumentKey::new(Self::collection(), id.to_string())
    }

    /// Returns the store key of this aggregate.
    fn key(&self) -> DocumentKey {
        DocumentKey::new(Self::collection(), self.document_id())
    }
}
