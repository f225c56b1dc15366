//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON values per collection, in insertion order,
//! behind async-aware read-write locks. Queries run through the core
//! [`DocumentEvaluator`] and [`Projection::apply`](docresource_core::projection::Projection::apply),
//! so results match what the MongoDB backend returns for the same query.

use async_trait::async_trait;
use bson::{Bson, Uuid};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use docresource_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    evaluator::{DocumentEvaluator, compare_documents},
    query::Query,
};

/// Documents of one collection, in insertion order.
#[derive(Debug, Default)]
struct CollectionData {
    documents: HashMap<Uuid, Bson>,
    order: Vec<Uuid>,
}

impl CollectionData {
    fn iter(&self) -> impl Iterator<Item = &Bson> {
        self.order
            .iter()
            .filter_map(|id| self.documents.get(id))
    }
}

type StoreMap = HashMap<String, CollectionData>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable; clones share the same underlying data.
/// Queries scan every document in the collection.
///
/// ```ignore
/// use docresource_memory::InMemoryStore;
/// use docresource::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
/// let id = Uuid::new();
/// store.insert_documents(vec![(id, Bson::Document(doc! { "id": id, "title": "first" }))], "blogs").await?;
/// assert_eq!(store.get_documents(vec![id], "blogs").await?.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let data = store
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            if data.documents.contains_key(&id) {
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
            }

            data.documents.insert(id, doc);
            data.order.push(id);
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let data = match store.get_mut(collection) {
            Some(data) => data,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for (id, doc) in documents {
            match data.documents.get_mut(&id) {
                Some(existing) => *existing = doc,
                None => return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string())),
            }
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let Some(data) = store.get_mut(collection) else {
            return Ok(());
        };

        for id in ids {
            if data.documents.remove(&id).is_some() {
                data.order.retain(|existing| *existing != id);
            }
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(data) = store.get(collection) else {
            return Ok(vec![]);
        };

        Ok(ids
            .iter()
            .filter_map(|id| data.documents.get(id).cloned())
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(data) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(data.iter(), filter)?,
            None => data.iter().cloned().collect::<Vec<_>>(),
        };

        if !query.sort.is_empty() {
            // Stable, so ties keep insertion order.
            matched.sort_by(|left, right| compare_documents(left, right, &query.sort));
        }

        trace!(collection, matched = matched.len(), "evaluated query");

        Ok(matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.filter(|limit| *limit > 0).unwrap_or(usize::MAX))
            .map(|doc| match (&query.projection, doc) {
                (Some(projection), Bson::Document(inner)) => Bson::Document(projection.apply(&inner)),
                (_, doc) => doc,
            })
            .collect())
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();
        Ok(names)
    }
}

/// Builder for [`InMemoryStore`] instances.
///
/// ```ignore
/// let store = InMemoryStore::builder()
///     .collection("blogs")
///     .collection("users")
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    collections: Vec<String>,
}

impl InMemoryStoreBuilder {
    /// Creates the named collection up front.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collections.push(name.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore::new();

        for name in &self.collections {
            store.create_collection(name).await?;
        }

        Ok(store)
    }
}
