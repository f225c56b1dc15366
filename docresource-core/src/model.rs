//! Model hooks consulted by the resource operations.
//!
//! A [`Model`] is a [`Document`] exposed through a [`Resource`](crate::resource::Resource).
//! Every method has a default, so a plain `impl Model for Blog {}` is enough
//! to get the full CRUD surface; override the hooks to add validation,
//! lifecycle behaviour, hidden fields, references and computed fields.

use bson::Document as BsonDocument;

use crate::{document::Document, error::DocumentStoreResult};

pub trait Model: Document {
    /// Checks invariants that the type alone cannot express.
    ///
    /// Runs after a create or patch has been decoded into the model and before
    /// anything is written. Return [`DocumentStoreError::Validation`](crate::error::DocumentStoreError::Validation)
    /// to reject the change.
    fn validate(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    /// Lifecycle hook run on every save, after [`Model::validate`].
    ///
    /// Changes made here are persisted.
    fn before_save(&mut self) -> DocumentStoreResult<()> {
        Ok(())
    }

    /// Paths left out of results unless a selection names them.
    fn hidden_fields() -> &'static [&'static str] {
        &[]
    }

    /// Paths holding identifiers of other models' documents.
    ///
    /// Used by `populate` entries to find the referenced collection when they
    /// do not name one, and to hide the referenced model's hidden fields.
    fn references() -> Vec<Reference> {
        Vec::new()
    }

    /// Adds computed fields to a non-lean result.
    ///
    /// The document may be partial when a selection is in effect.
    fn virtuals(_document: &mut BsonDocument) {}
}

/// A path holding identifiers of documents of another model.
///
/// ```ignore
/// fn references() -> Vec<Reference> {
///     vec![Reference::to::<User>("created.by"), Reference::to::<User>("readers")]
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub path: &'static str,
    pub collection: &'static str,
    /// Hidden fields of the referenced model.
    pub hidden: &'static [&'static str],
}

impl Reference {
    pub fn to<M: Model>(path: &'static str) -> Self {
        Self {
            path,
            collection: M::collection_name(),
            hidden: M::hidden_fields(),
        }
    }
}
