use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Result;

/// Version number for a document, used for optimistic concurrency control.
///
/// A document that does not exist is at version 0. The first write produces
/// version 1 and every later write increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a document that was never written.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) assigned by the first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Address of a document: a collection name plus an id unique within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Collection the document belongs to (e.g. `"products"`).
    pub collection: String,

    /// Identifier within the collection.
    pub id: String,
}

impl DocumentKey {
    /// Creates a new key.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document together with its version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Where the document lives.
    pub key: DocumentKey,

    /// Version after the last committed write.
    pub version: Version,

    /// When the last write was committed.
    pub updated_at: DateTime<Utc>,

    /// The document body as JSON.
    pub body: serde_json::Value,
}

impl Document {
    /// Deserializes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_progression() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::initial().next(), Version::first());
        assert_eq!(Version::new(41).next(), Version::new(42));
        assert!(Version::first() > Version::initial());
    }

    #[test]
    fn key_display() {
        let key = DocumentKey::new("products", "SKU-001");
        assert_eq!(key.to_string(), "products/SKU-001");
    }

    #[test]
    fn decode_typed_body() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Stock {
            inventory: i64,
        }

        let doc = Document {
            key: DocumentKey::new("products", "SKU-001"),
            version: Version::first(),
            updated_at: Utc::now(),
            body: serde_json::json!({ "inventory": 7 }),
        };

        let stock: Stock = doc.decode().unwrap();
        assert_eq!(stock, Stock { inventory: 7 });
    }
}
