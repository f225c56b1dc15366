//! In-memory document storage backend for docresource.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and suits development,
//! tests, and small deployments.
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Full query support** - Filters, projections, multi-key sorting and paging
//! - **Stable ordering** - Unsorted results come back in insertion order
//!
//! # Quick Start
//!
//! ```ignore
//! use docresource::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let blogs = store.resource::<Blog>();
//!     blogs.create_doc(doc! { "title": "first" }, &ResourceParams::new()).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docresource_memory;

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
