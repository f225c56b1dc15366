//! CRUD operations for a model and the subdocument collections embedded in it.
//!
//! A [`Resource`] composes each request from [`ResourceParams`]: the `where`
//! clause narrows the documents an operation may see or touch, `select`
//! shapes what comes back, and `populate` and `lean` post-process results.
//! An operation whose target is missing, or filtered out by `where`, returns
//! `Ok(None)`.
//!
//! Writes follow a fetch, mutate, save sequence. The stored document is read
//! unprojected, changed in memory, decoded into the model to run
//! [`Model::validate`] and [`Model::before_save`], then written back whole.
//! After a write the result is re-read with the caller's parameters, minus
//! `where`, so the response has the same shape as a read.
//!
//! ```ignore
//! let blogs = store.resource::<Blog>();
//! let owned = ResourceParams::new().filter(Filter::eq("created.by", user_id));
//!
//! let blog = blogs.create_doc(doc! { "title": "first", "created": { "by": user_id } }, &owned).await?;
//! let comment = blogs
//!     .create_coll_doc(blog_id, "comments", doc! { "body": "nice" }, &owned)
//!     .await?;
//! ```

use bson::{Bson, Document as BsonDocument, Uuid};
use std::marker::PhantomData;
use tracing::{debug, trace};

use crate::{
    backend::DynStoreBackend,
    collection::Collection,
    document::{DocumentExt, ID_FIELD, document_id, ensure_id},
    error::{DocumentStoreError, DocumentStoreResult},
    model::Model,
    params::ResourceParams,
    path,
    populate::populate_documents,
    projection::{FieldProjection, Projection, slice_items},
    query::{Expr, Filter, Query},
};

/// CRUD access to the documents of model `M`.
#[derive(Debug)]
pub struct Resource<'a, M: Model> {
    backend: &'a dyn DynStoreBackend,
    _marker: PhantomData<M>,
}

impl<'a, M: Model> Clone for Resource<'a, M> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend,
            _marker: PhantomData,
        }
    }
}

impl<'a, M: Model> Resource<'a, M> {
    pub(crate) fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self { backend, _marker: PhantomData }
    }

    /// Returns the name of the collection backing this resource.
    pub fn name(&self) -> &'static str {
        M::collection_name()
    }

    fn collection(&self) -> Collection<'a> {
        Collection::new(M::collection_name(), self.backend)
    }

    /// Lists documents matching `params`.
    ///
    /// Sorting, skipping and limiting follow `params`; with no `select` the
    /// model's hidden fields are left out.
    pub async fn read_docs(&self, params: &ResourceParams) -> DocumentStoreResult<Vec<BsonDocument>> {
        let query = self.compose(None, params)?;
        let found = self.collection().query(query).await?;

        trace!(collection = self.name(), count = found.len(), "read documents");

        self.finish(found, params).await
    }

    /// Creates a document and returns it as [`read_doc_by_id`](Self::read_doc_by_id) would.
    ///
    /// A fresh id is assigned unless `object` carries one. Returns `Ok(None)`
    /// when the new document does not satisfy the `where` clause.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentStoreError::Validation`] when `object` does not
    /// decode into the model or the model rejects it, and with
    /// [`DocumentStoreError::DocumentAlreadyExists`] when the id is taken.
    pub async fn create_doc(
        &self,
        object: BsonDocument,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let mut object = object;
        let id = ensure_id(&mut object);
        let stored = self.prepare(object)?;

        self.collection().insert(vec![(id, stored)]).await?;
        debug!(collection = self.name(), %id, "created document");

        self.read_doc_by_id(id, params).await
    }

    /// Reads one document by id, provided it satisfies the `where` clause.
    pub async fn read_doc_by_id(
        &self,
        id: Uuid,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let query = self.compose(Some(Filter::eq(ID_FIELD, id)), params)?;
        let found = self.collection().query(query).await?;

        Ok(self.finish(found, params).await?.into_iter().next())
    }

    /// Applies `patch` to a document and returns the updated document.
    ///
    /// Keys of `patch` may be dotted paths. The `where` clause decides whether
    /// the document may be patched; it is not applied when re-reading.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentStoreError::Validation`] when the patched document
    /// is rejected or the patch tries to change the id.
    pub async fn patch_doc_by_id(
        &self,
        id: Uuid,
        patch: BsonDocument,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let Some(mut stored) = self.fetch_stored(id, params.filter.clone()).await? else {
            return Ok(None);
        };

        apply_patch(&mut stored, patch)?;
        let stored = self.prepare(stored)?;

        self.collection().update(vec![(id, stored)]).await?;
        debug!(collection = self.name(), %id, "patched document");

        self.read_doc_by_id(id, &params.without_filter()).await
    }

    /// Deletes a document and returns it as it read before deletion.
    pub async fn destroy_doc_by_id(
        &self,
        id: Uuid,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let Some(removed) = self.read_doc_by_id(id, params).await? else {
            return Ok(None);
        };

        self.collection().delete(vec![id]).await?;
        debug!(collection = self.name(), %id, "destroyed document");

        Ok(Some(removed))
    }

    /// Appends `object` to the subdocument collection at `coll_path` and returns it.
    ///
    /// The collection is created when the parent does not have it yet. The
    /// whole parent is validated before it is saved.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentStoreError::InvalidDocument`] when `coll_path`
    /// holds something other than an array.
    pub async fn create_coll_doc(
        &self,
        doc_id: Uuid,
        coll_path: &str,
        object: BsonDocument,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let Some(mut stored) = self.fetch_stored(doc_id, params.filter.clone()).await? else {
            return Ok(None);
        };

        let mut object = object;
        let coll_id = ensure_id(&mut object);

        subdocuments_mut(&mut stored, coll_path)?.push(Bson::Document(object));
        let stored = self.prepare(stored)?;

        self.collection().update(vec![(doc_id, stored)]).await?;
        debug!(collection = self.name(), %doc_id, coll_path, %coll_id, "created subdocument");

        self.read_coll_doc_by_id(doc_id, coll_path, coll_id, &params.without_filter())
            .await
    }

    /// Lists the subdocuments at `coll_path`.
    ///
    /// `select` is given relative to the parent, so `comments.body` keeps the
    /// body of each comment and `-comments.body` drops it. Returns `Ok(None)`
    /// when the parent is missing and an empty list when it has no such
    /// collection.
    pub async fn read_coll_docs(
        &self,
        doc_id: Uuid,
        coll_path: &str,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<Vec<BsonDocument>>> {
        let mut params = params.clone();
        let mut per_item = None;
        let mut slice = None;

        params.select = Some(match params.select.take() {
            None => Projection::include_only([coll_path]),
            Some(select) if select.is_inclusive() => {
                if matches!(select.get(coll_path), Some(FieldProjection::Include)) {
                    select
                } else {
                    select.include(path::join(coll_path, ID_FIELD))
                }
            }
            // Exclusive selections would be merged with the hidden fields,
            // which may hide the collection itself. Select the collection and
            // apply the exclusions to each element instead.
            Some(select) => {
                if excludes(&select, coll_path) {
                    Projection::exclude_only([coll_path])
                } else {
                    if let Some(FieldProjection::Slice(count)) = select.get(coll_path) {
                        slice = Some(*count);
                    }
                    let prefix = format!("{coll_path}.");
                    let hidden_below = M::hidden_fields()
                        .iter()
                        .copied()
                        .filter(|hidden| hidden.starts_with(&prefix))
                        .collect::<Vec<_>>();
                    per_item = Projection::with_hidden(Some(select), &hidden_below)
                        .and_then(|select| select.relative_to(coll_path));
                    Projection::include_only([coll_path])
                }
            }
        });

        let Some(parent) = self.read_doc_by_id(doc_id, &params).await? else {
            return Ok(None);
        };

        let mut items = subdocuments(&parent, coll_path)?;
        if let Some(count) = slice {
            items = slice_items(&items.into_iter().map(Bson::Document).collect::<Vec<_>>(), count)
                .into_iter()
                .filter_map(|item| item.as_document().cloned())
                .collect();
        }
        if let Some(select) = &per_item {
            items = items.iter().map(|item| select.apply(item)).collect();
        }

        Ok(Some(items))
    }

    /// Reads one subdocument of the collection at `coll_path`.
    ///
    /// The `where` clause applies to the parent. `select` paths below
    /// `coll_path` shape the returned subdocument.
    pub async fn read_coll_doc_by_id(
        &self,
        doc_id: Uuid,
        coll_path: &str,
        coll_id: Uuid,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let selection = params
            .select
            .as_ref()
            .and_then(|select| select.relative_to(coll_path));

        let mut params = params.clone();
        params.select = Some(Projection::new().elem_match(coll_path, Filter::eq(ID_FIELD, coll_id)));

        let Some(parent) = self.read_doc_by_id(doc_id, &params).await? else {
            return Ok(None);
        };

        let found = subdocuments(&parent, coll_path)?
            .into_iter()
            .find(|item| document_id(item) == Some(coll_id));

        Ok(found.map(|item| match &selection {
            Some(select) => select.apply(&item),
            None => item,
        }))
    }

    /// Applies `patch` to one subdocument and returns it.
    ///
    /// Keys of `patch` are paths inside the subdocument. The whole parent is
    /// validated before it is saved.
    pub async fn patch_coll_doc_by_id(
        &self,
        doc_id: Uuid,
        coll_path: &str,
        coll_id: Uuid,
        patch: BsonDocument,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let mut filter = Filter::eq(path::join(coll_path, ID_FIELD), coll_id);
        if let Some(extra) = &params.filter {
            filter = filter.and(extra.clone());
        }

        let Some(mut stored) = self.fetch_stored(doc_id, Some(filter)).await? else {
            return Ok(None);
        };

        let Some(item) = subdocuments_mut(&mut stored, coll_path)?
            .iter_mut()
            .find_map(|item| match item {
                Bson::Document(item) if document_id(item) == Some(coll_id) => Some(item),
                _ => None,
            })
        else {
            return Ok(None);
        };

        apply_patch(item, patch)?;
        let stored = self.prepare(stored)?;

        self.collection().update(vec![(doc_id, stored)]).await?;
        debug!(collection = self.name(), %doc_id, coll_path, %coll_id, "patched subdocument");

        self.read_coll_doc_by_id(doc_id, coll_path, coll_id, &params.without_filter())
            .await
    }

    /// Removes one subdocument and returns it as it read before removal.
    ///
    /// The parent is saved without running the model hooks.
    pub async fn destroy_coll_doc_by_id(
        &self,
        doc_id: Uuid,
        coll_path: &str,
        coll_id: Uuid,
        params: &ResourceParams,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let Some(removed) = self
            .read_coll_doc_by_id(doc_id, coll_path, coll_id, params)
            .await?
        else {
            return Ok(None);
        };

        let Some(mut stored) = self.fetch_stored(doc_id, None).await? else {
            return Ok(None);
        };

        subdocuments_mut(&mut stored, coll_path)?
            .retain(|item| !matches!(item, Bson::Document(item) if document_id(item) == Some(coll_id)));

        self.collection()
            .update(vec![(doc_id, Bson::Document(stored))])
            .await?;
        debug!(collection = self.name(), %doc_id, coll_path, %coll_id, "destroyed subdocument");

        Ok(Some(removed))
    }

    /// Builds the query for `params`, narrowed by `base` when given.
    fn compose(&self, base: Option<Expr>, params: &ResourceParams) -> DocumentStoreResult<Query> {
        let mut builder = Query::builder();
        if let Some(base) = base {
            builder = builder.filter(base);
        }

        let mut query = params.apply_to(builder)?.build();
        query.projection = Projection::with_hidden(query.projection.take(), M::hidden_fields());

        Ok(query)
    }

    /// Reads the stored document unprojected, if it satisfies `filter`.
    async fn fetch_stored(&self, id: Uuid, filter: Option<Expr>) -> DocumentStoreResult<Option<BsonDocument>> {
        let mut builder = Query::builder().filter(Filter::eq(ID_FIELD, id));
        if let Some(filter) = filter {
            builder = builder.and_filter(filter);
        }

        let found = self.collection().query(builder.limit(1).build()).await?;

        found
            .into_iter()
            .next()
            .map(into_document)
            .transpose()
    }

    /// Runs the model over a stored document and returns what to save.
    fn prepare(&self, stored: BsonDocument) -> DocumentStoreResult<Bson> {
        let mut model = M::from_bson(Bson::Document(stored))
            .map_err(|e| DocumentStoreError::Validation(e.to_string()))?;

        model.validate()?;
        model.before_save()?;

        model.to_bson()
    }

    /// Populates and decorates query results.
    async fn finish(&self, found: Vec<Bson>, params: &ResourceParams) -> DocumentStoreResult<Vec<BsonDocument>> {
        let mut documents = found
            .into_iter()
            .map(into_document)
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        if !params.populate.is_empty() {
            populate_documents(self.backend, &mut documents, &params.populate, &M::references()).await?;
        }

        if !params.lean {
            documents.iter_mut().for_each(M::virtuals);
        }

        Ok(documents)
    }
}

fn into_document(value: Bson) -> DocumentStoreResult<BsonDocument> {
    match value {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, found {other}"
        ))),
    }
}

/// Returns `true` when `select` excludes `coll_path` or one of its ancestors.
fn excludes(select: &Projection, coll_path: &str) -> bool {
    select.fields().iter().any(|(field, rule)| {
        matches!(rule, FieldProjection::Exclude)
            && (field == coll_path || coll_path.starts_with(&format!("{field}.")))
    })
}

/// Writes each `(path, value)` pair of `patch` into `target`.
fn apply_patch(target: &mut BsonDocument, patch: BsonDocument) -> DocumentStoreResult<()> {
    for (key, value) in patch {
        if key == ID_FIELD {
            if target.get(ID_FIELD) != Some(&value) {
                return Err(DocumentStoreError::Validation("id cannot be changed".to_string()));
            }
            continue;
        }

        path::set_path(target, &key, value)?;
    }

    Ok(())
}

/// Returns the subdocuments at `coll_path` of a read result.
fn subdocuments(parent: &BsonDocument, coll_path: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
    match path::get_path(parent, coll_path) {
        None | Some(Bson::Null) => Ok(Vec::new()),
        Some(Bson::Array(items)) => Ok(items
            .iter()
            .filter_map(|item| item.as_document().cloned())
            .collect()),
        Some(_) => Err(DocumentStoreError::InvalidDocument(format!(
            "{coll_path} is not a collection"
        ))),
    }
}

/// Returns the array at `coll_path`, creating it when absent.
fn subdocuments_mut<'d>(stored: &'d mut BsonDocument, coll_path: &str) -> DocumentStoreResult<&'d mut Vec<Bson>> {
    if matches!(path::get_path(stored, coll_path), None | Some(Bson::Null)) {
        path::set_path(stored, coll_path, Bson::Array(Vec::new()))?;
    }

    match path::get_path_mut(stored, coll_path) {
        Some(Bson::Array(items)) => Ok(items),
        _ => Err(DocumentStoreError::InvalidDocument(format!(
            "{coll_path} is not a collection"
        ))),
    }
}
