//! A generic CRUD resource layer over JSON document stores.
//!
//! This crate is the core of the docresource project and provides:
//!
//! - **Document traits** ([`document`], [`model`]) - Stored types and the hooks resources consult
//! - **Resources** ([`resource`]) - Document and subdocument CRUD driven by request parameters
//! - **Request parameters** ([`params`]) - `select`, `where`, `sort`, `skip`, `limit`, `populate`, `lean`
//! - **Queries** ([`query`], [`projection`]) - Filters, field selection, multi-key sorting and paging
//! - **Evaluation** ([`evaluator`]) - In-process filter matching and ordering for backends without a query engine
//! - **Store backend abstraction** ([`backend`]) - The trait storage backends implement
//! - **Stores and collections** ([`store`], [`collection`]) - Entry points handing out resources and collections
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docresource::prelude::*;
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "blogs")]
//! pub struct Blog {
//!     pub id: Uuid,
//!     pub title: String,
//! }
//!
//! impl Model for Blog {}
//! ```

#[allow(unused_extern_crates)]
extern crate self as docresource_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod params;
pub mod path;
mod populate;
pub mod projection;
pub mod query;
pub mod resource;
pub mod store;
