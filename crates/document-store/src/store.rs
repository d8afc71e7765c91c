use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Document, DocumentKey, DocumentQuery, Result, StoreError, Version};

/// What a write expects to find before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// The document must not exist yet.
    New,

    /// The document must currently be at exactly this version.
    Version(Version),
}

impl Expectation {
    /// Expectation matching a document last read at `version`.
    ///
    /// `Version::initial()` means the document was never written, which is
    /// the same as expecting a new document.
    pub fn from_read(version: Version) -> Self {
        if version == Version::initial() {
            Expectation::New
        } else {
            Expectation::Version(version)
        }
    }

    /// Returns the version the document will have after the write.
    pub fn next_version(&self) -> Version {
        match self {
            Expectation::New => Version::first(),
            Expectation::Version(v) => v.next(),
        }
    }

    /// Returns true if a document currently at `actual` satisfies the expectation.
    pub fn is_met_by(&self, actual: Option<Version>) -> bool {
        match (self, actual) {
            (Expectation::New, None) => true,
            (Expectation::Version(expected), Some(actual)) => *expected == actual,
            _ => false,
        }
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::New => write!(f, "new document"),
            Expectation::Version(v) => write!(f, "version {v}"),
        }
    }
}

/// A single conditional write.
#[derive(Debug, Clone)]
pub struct Write {
    /// Document being written.
    pub key: DocumentKey,

    /// Condition that must hold for the batch to commit.
    pub expectation: Expectation,

    /// Full replacement body.
    pub body: serde_json::Value,
}

impl Write {
    /// Creates a write from an already-serialized body.
    pub fn new(key: DocumentKey, expectation: Expectation, body: serde_json::Value) -> Self {
        Self {
            key,
            expectation,
            body,
        }
    }

    /// Serializes `value` as the document body.
    pub fn serialize<T: Serialize>(
        key: DocumentKey,
        expectation: Expectation,
        value: &T,
    ) -> Result<Self> {
        Ok(Self::new(key, expectation, serde_json::to_value(value)?))
    }
}

/// A set of writes applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a write to the batch.
    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    /// Adds a write, builder style.
    pub fn with(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    /// Returns the writes in insertion order.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Consumes the batch, returning its writes.
    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    /// Returns the number of writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Returns true if the batch has no writes.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Retrieves a document by key.
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>>;

    /// Retrieves several documents. Missing keys are skipped.
    async fn get_many(&self, keys: &[DocumentKey]) -> Result<Vec<Document>>;

    /// Retrieves documents matching a query, ordered by id.
    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Applies every write in the batch, or none of them.
    ///
    /// Fails with `ConcurrencyConflict` if any write's expectation does not hold.
    /// Returns the new version of each document, in batch order.
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Version>>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Returns the current version of a document, or None if it does not exist.
    async fn version_of(&self, key: &DocumentKey) -> Result<Option<Version>> {
        Ok(self.get(key).await?.map(|doc| doc.version))
    }

    /// Checks if a document exists.
    async fn exists(&self, key: &DocumentKey) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Loads and decodes a document together with its version.
    async fn load<T>(&self, key: &DocumentKey) -> Result<Option<(T, Version)>>
    where
        T: DeserializeOwned,
    {
        match self.get(key).await? {
            Some(doc) => Ok(Some((doc.decode()?, doc.version))),
            None => Ok(None),
        }
    }

    /// Commits a single write.
    async fn put(&self, write: Write) -> Result<Version> {
        let versions = self.commit(WriteBatch::new().with(write)).await?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidBatch("commit returned no versions".to_string()))
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// Validates a batch before any storage is touched.
pub fn validate_batch(batch: &WriteBatch) -> Result<()> {
    if batch.is_empty() {
        return Err(StoreError::InvalidBatch(
            "cannot commit an empty batch".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(batch.len());
    for write in batch.writes() {
        if write.key.collection.is_empty() || write.key.id.is_empty() {
            return Err(StoreError::InvalidBatch(format!(
                "document key must have a collection and an id, got {}",
                write.key
            )));
        }
        if !seen.insert(&write.key) {
            return Err(StoreError::InvalidBatch(format!(
                "document {} is written more than once",
                write.key
            )));
        }
    }

    Ok(())
}
