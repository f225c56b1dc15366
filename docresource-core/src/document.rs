//! Core traits for document representation and serialization.
//!
//! This module provides the fundamental trait that all stored documents must implement,
//! as well as utilities for converting documents between different formats (BSON, JSON).

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::DocumentStoreResult;

/// Name of the field holding a document's (or subdocument's) identifier.
pub const ID_FIELD: &str = "id";

/// Core trait that all documents stored in a document store must implement.
///
/// Every document must have a unique identifier (UUID), serialized in its
/// [`ID_FIELD`] field, and specify which collection it belongs to.
///
/// # Deriving with `#[derive]`
///
/// `Document` can be derived; the collection name comes from the
/// `#[document(collection = "...")]` attribute and the identifier from the `id` field.
///
/// ```ignore
/// use docresource::prelude::*;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Document)]
/// #[document(collection = "users")]
/// pub struct User {
///     pub id: Uuid,
///     pub name: String,
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    ///
    /// This should be a static, lowercase identifier (e.g., "users", "blogs").
    fn collection_name() -> &'static str;
}

/// Extension trait providing serialization/deserialization utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value for serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Returns the identifier stored in a raw document's [`ID_FIELD`], if it holds a UUID.
pub fn document_id(document: &bson::Document) -> Option<Uuid> {
    match document.get(ID_FIELD)? {
        Bson::Binary(binary) => binary.to_uuid().ok(),
        Bson::String(text) => Uuid::parse_str(text).ok(),
        _ => None,
    }
}

/// Returns the identifier of a raw document, assigning a fresh one when it has none.
pub fn ensure_id(document: &mut bson::Document) -> Uuid {
    match document_id(document) {
        Some(id) => id,
        None => {
            let id = Uuid::new();
            document.insert(ID_FIELD, id);
            id
        }
    }
}
