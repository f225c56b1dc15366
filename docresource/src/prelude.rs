//! Convenient re-exports of commonly used types from docresource.
//!
//! ```ignore
//! use docresource::prelude::*;
//! ```

pub use docresource_core::{
    collection::Collection,
    store::{DocumentStore, DynDocumentStore, DynDocumentStoreRef, AsDynDocumentStore, IntoDynDocumentStore},
    document::{Document, DocumentExt, ID_FIELD},
    model::{Model, Reference},
    resource::Resource,
    params::{Populate, ResourceParams, Skip},
    projection::{FieldProjection, Projection},
    backend::{StoreBackend, StoreBackendBuilder},
    query::{Query, QueryVisitor, Expr, Sort, SortDirection, FieldOp, QueryBuilder, Filter},
    error::{DocumentStoreError, DocumentStoreResult},
};
pub use docresource_macros::Document;
