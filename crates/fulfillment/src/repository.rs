//! Typed access to aggregates in the document store.

use std::collections::HashMap;
use std::fmt::Display;

use document_store::{
    DocumentQuery, DocumentStore, DocumentStoreExt, Expectation, Version, Write, WriteBatch,
};
use domain::Aggregate;

use crate::Result;

/// An aggregate together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<A> {
    pub value: A,
    pub version: Version,
}

impl<A: Aggregate> Loaded<A> {
    /// Wraps an aggregate that has not been stored yet.
    pub fn fresh(value: A) -> Self {
        Self {
            value,
            version: Version::initial(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.version == Version::initial()
    }

    /// Builds a write of the current value, conditioned on the version read.
    pub fn stage(&self) -> Result<Write> {
        Ok(Write::serialize(
            self.value.key(),
            Expectation::from_read(self.version),
            &self.value,
        )?)
    }

    pub fn into_inner(self) -> A {
        self.value
    }
}

/// Loads aggregates and commits staged writes.
#[derive(Debug, Clone)]
pub struct Repository<S> {
    store: S,
}

impl<S: DocumentStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads one aggregate by id.
    pub async fn load<A: Aggregate>(&self, id: impl Display) -> Result<Option<Loaded<A>>> {
        let key = A::key_for(id);
        Ok(self
            .store
            .load::<A>(&key)
            .await?
            .map(|(value, version)| Loaded { value, version }))
    }

    /// Loads several aggregates, keyed by document id. Missing ids are absent
    /// from the result.
    pub async fn load_many<A, I>(&self, ids: I) -> Result<HashMap<String, Loaded<A>>>
    where
        A: Aggregate,
        I: IntoIterator,
        I::Item: Display,
    {
        let keys: Vec<_> = ids.into_iter().map(|id| A::key_for(id)).collect();
        let documents = self.store.get_many(&keys).await?;

        let mut loaded = HashMap::with_capacity(documents.len());
        for document in documents {
            let value: A = document.decode()?;
            loaded.insert(
                document.key.id,
                Loaded {
                    value,
                    version: document.version,
                },
            );
        }
        Ok(loaded)
    }

    /// Lists aggregates of one type matching a query.
    pub async fn list<A: Aggregate>(&self, query: DocumentQuery) -> Result<Vec<A>> {
        let documents = self.store.query(query).await?;
        let mut values = Vec::with_capacity(documents.len());
        for document in &documents {
            values.push(document.decode()?);
        }
        Ok(values)
    }

    /// Lists every aggregate of one type.
    pub async fn list_all<A: Aggregate>(&self) -> Result<Vec<A>> {
        self.list(DocumentQuery::collection(A::collection())).await
    }

    /// Commits a batch atomically.
    pub async fn commit(&self, batch: WriteBatch) -> Result<Vec<Version>> {
        Ok(self.store.commit(batch).await?)
    }

    /// Commits a single aggregate conditioned on the version it was read at,
    /// returning it at its new version.
    pub async fn save<A: Aggregate>(&self, loaded: Loaded<A>) -> Result<Loaded<A>> {
        let version = self.store.put(loaded.stage()?).await?;
        Ok(Loaded {
            value: loaded.value,
            version,
        })
    }
}
