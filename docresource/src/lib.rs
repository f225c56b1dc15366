//! Main docresource crate: generic CRUD resources over JSON document stores.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! the sub-crates, the `Document` derive, and the available storage backends.
//!
//! # Features
//!
//! - **Resources** - Create, read, patch and destroy documents and the subdocument collections inside them
//! - **Declarative parameters** - `select`, `where`, `sort`, `skip`, `limit`, `populate` and `lean`, in code or as JSON
//! - **Model hooks** - Validation, save hooks, hidden fields, references and virtual fields
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docresource::{prelude::*, memory::InMemoryStore};
//! use bson::{Uuid, doc};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "blogs")]
//! pub struct Blog {
//!     pub id: Uuid,
//!     pub title: String,
//!     #[serde(default)]
//!     pub comments: Vec<Comment>,
//! }
//!
//! impl Model for Blog {
//!     fn validate(&self) -> DocumentStoreResult<()> {
//!         if self.title.is_empty() {
//!             return Err(DocumentStoreError::Validation("title is required".into()));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let blogs = store.resource::<Blog>();
//!
//!     blogs
//!         .create_doc(doc! { "title": "first" }, &ResourceParams::new())
//!         .await?;
//!
//!     let recent = blogs
//!         .read_docs(&ResourceParams::from_json(serde_json::json!({
//!             "select": "title",
//!             "sort": "-created.date",
//!             "limit": 5,
//!         }))?)
//!         .await?;
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A `DocumentStore` converts into a `DynDocumentStore` with `into_dyn`, for
//! code that picks its backend at runtime. Resources work the same on both.
//!
//! ```ignore
//! let store = DocumentStore::new(InMemoryStore::new()).into_dyn();
//! let blogs = store.resource::<Blog>();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use docresource_core::{
    backend, collection, document, error, evaluator, model, params, path, projection, query, resource, store,
};
pub use docresource_macros::Document;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docresource_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docresource_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
