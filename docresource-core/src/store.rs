//! Document store entry points.
//!
//! - [`DocumentStore`] owns a concrete backend type.
//! - [`DynDocumentStore`] owns a boxed backend chosen at runtime.
//! - [`DynDocumentStoreRef`] borrows either of them.
//!
//! All three hand out [`Resource`]s for models along with plain collections.
//!
//! ```ignore
//! let store = DocumentStore::new(InMemoryStore::new());
//! let blogs = store.resource::<Blog>();
//! let created = blogs.create_doc(doc! { "title": "first" }, &ResourceParams::new()).await?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::Collection,
    error::DocumentStoreResult,
    model::Model,
    resource::Resource,
};

/// A document store bound to a concrete backend type.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the backend this store wraps.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the CRUD resource for model `M`.
    pub fn resource<M: Model>(&self) -> Resource<'_, M> {
        Resource::new(&self.backend)
    }

    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(name, &self.backend)
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(&self.backend, name).await
    }

    /// Drops a collection and all documents in it.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(&self.backend, name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(&self.backend).await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(self.backend).await
    }
}

/// A document store over a backend chosen at runtime.
#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    pub fn resource<M: Model>(&self) -> Resource<'_, M> {
        Resource::new(&*self.backend)
    }

    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(name, &*self.backend)
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.create_collection(name).await
    }

    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}

/// A borrowed document store, handy for passing either store type to helpers.
#[derive(Debug, Clone, Copy)]
pub struct DynDocumentStoreRef<'a> {
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynDocumentStoreRef<'a> {
    pub fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self { backend }
    }

    pub fn resource<M: Model>(&self) -> Resource<'a, M> {
        Resource::new(self.backend)
    }

    pub fn collection(&self, name: &str) -> Collection<'a> {
        Collection::new(name, self.backend)
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }
}

/// Borrows any store as a [`DynDocumentStoreRef`].
pub trait AsDynDocumentStore {
    fn as_dyn(&self) -> DynDocumentStoreRef<'_>;
}

/// Converts any store into an owned [`DynDocumentStore`].
pub trait IntoDynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> AsDynDocumentStore for DocumentStore<B> {
    fn as_dyn(&self) -> DynDocumentStoreRef<'_> {
        DynDocumentStoreRef::new(&self.backend)
    }
}

impl AsDynDocumentStore for DynDocumentStore {
    fn as_dyn(&self) -> DynDocumentStoreRef<'_> {
        DynDocumentStoreRef::new(&*self.backend)
    }
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}
