//! Handles onto a single named collection.
//!
//! A [`Collection`] works with raw BSON documents and is what the resource
//! layer and populate run on. Writes through it skip the model hooks, so
//! application code normally goes through a [`Resource`](crate::resource::Resource).
//!
//! ```ignore
//! let users = store.collection("users");
//! let found = users.get(vec![id]).await?;
//! ```

use bson::{Bson, Uuid};
use tracing::trace;

use crate::{backend::DynStoreBackend, error::DocumentStoreResult, query::Query};

/// An untyped collection bound to a backend.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(name: impl Into<String>, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name: name.into(), backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts `(id, document)` pairs.
    ///
    /// # Errors
    ///
    /// Fails when an id is already stored.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        trace!(collection = %self.name, count = documents.len(), "inserting documents");

        self.backend
            .insert_documents(documents, &self.name)
            .await
    }

    /// Replaces stored documents by id.
    pub async fn update(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        trace!(collection = %self.name, count = documents.len(), "updating documents");

        self.backend
            .update_documents(documents, &self.name)
            .await
    }

    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid>,
    {
        let ids = ids.into_iter().map(Into::into).collect::<Vec<Uuid>>();
        trace!(collection = %self.name, count = ids.len(), "deleting documents");

        self.backend.delete_documents(ids, &self.name).await
    }

    /// Fetches documents by id. Ids that are not stored are omitted.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<Bson>>
    where
        U: Into<Uuid>,
    {
        self.backend
            .get_documents(ids.into_iter().map(Into::into).collect(), &self.name)
            .await
    }

    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        trace!(collection = %self.name, ?query, "querying documents");

        self.backend
            .query_documents(query, &self.name)
            .await
    }
}
