/// Builder for constructing document queries.
///
/// A query always targets one collection and may filter on equality of a
/// single top-level body field.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Collection to search.
    pub collection: String,

    /// Top-level body field that must equal the given JSON value.
    pub field_equals: Option<(String, serde_json::Value)>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query over every document in a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Filters to documents whose `field` equals `value`.
    pub fn field_equals(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.field_equals = Some((field.into(), value));
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if a document body satisfies the field filter.
    pub fn matches(&self, body: &serde_json::Value) -> bool {
        match &self.field_equals {
            Some((field, value)) => body.get(field) == Some(value),
            None => true,
        }
    }
}
