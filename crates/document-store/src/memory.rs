use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentKey, DocumentQuery, Result, StoreError, Version,
    store::{DocumentStore, WriteBatch, validate_batch},
};

/// In-memory document store implementation for testing.
///
/// This implementation keeps all documents in memory and provides
/// the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<DocumentKey, Document>>>,
    injected_conflicts: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Clears all documents.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }

    /// Makes the next `count` commits fail with a concurrency conflict, as if
    /// another writer had won the race. Nothing is written by those commits.
    pub fn inject_conflicts(&self, count: usize) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn get_many(&self, keys: &[DocumentKey]) -> Result<Vec<Document>> {
        let store = self.documents.read().await;
        Ok(keys.iter().filter_map(|key| store.get(key).cloned()).collect())
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let store = self.documents.read().await;
        let mut documents: Vec<_> = store
            .values()
            .filter(|doc| doc.key.collection == query.collection && query.matches(&doc.body))
            .cloned()
            .collect();

        documents.sort_by(|a, b| a.key.id.cmp(&b.key.id));

        let offset = query.offset.unwrap_or(0);
        let documents = documents.into_iter().skip(offset);
        let documents = match query.limit {
            Some(limit) => documents.take(limit).collect(),
            None => documents.collect(),
        };

        Ok(documents)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Version>> {
        validate_batch(&batch)?;

        let mut store = self.documents.write().await;

        if let Some(first) = batch.writes().first()
            && self.take_injected_conflict()
        {
            return Err(StoreError::ConcurrencyConflict {
                key: first.key.clone(),
                expected: first.expectation.to_string(),
                actual: store.get(&first.key).map(|doc| doc.version),
            });
        }

        // Check every expectation before applying anything
        for write in batch.writes() {
            let actual = store.get(&write.key).map(|doc| doc.version);
            if !write.expectation.is_met_by(actual) {
                return Err(StoreError::ConcurrencyConflict {
                    key: write.key.clone(),
                    expected: write.expectation.to_string(),
                    actual,
                });
            }
        }

        let now = Utc::now();
        let mut versions = Vec::with_capacity(batch.len());
        for write in batch.into_writes() {
            let version = write.expectation.next_version();
            versions.push(version);
            store.insert(
                write.key.clone(),
                Document {
                    key: write.key,
                    version,
                    updated_at: now,
                    body: write.body,
                },
            );
        }

        metrics::counter!("document_store_commits_total").increment(1);
        Ok(versions)
    }
}
