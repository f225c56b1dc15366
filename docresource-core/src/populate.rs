//! Reference population.
//!
//! Identifiers stored at a path are replaced by the documents they refer to,
//! fetched from the referenced collection in one batch per populate entry.
//! Paths fan out over arrays, so `readers` (an array of ids) and
//! `comments.created.by` (an id inside every comment) both work.
//!
//! Populated documents hide the referenced model's hidden fields, unless the
//! entry's own selection is inclusive.

use bson::{Bson, Document as BsonDocument, Uuid};
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

use crate::{
    backend::DynStoreBackend,
    collection::Collection,
    document::document_id,
    error::{DocumentStoreError, DocumentStoreResult},
    model::Reference,
    params::Populate,
    path,
    projection::Projection,
};

/// Resolves `entries` against `documents` in place.
///
/// `references` supplies the collection for entries that do not name one,
/// and the hidden fields of the referenced model. An entry naming a
/// collection no reference points to must carry its own hidden fields. Identifiers with no
/// matching document are replaced by `null`.
pub(crate) async fn populate_documents(
    backend: &dyn DynStoreBackend,
    documents: &mut [BsonDocument],
    entries: &[Populate],
    references: &[Reference],
) -> DocumentStoreResult<()> {
    for entry in entries {
        let (collection, hidden) = resolve_target(entry, references)?;
        let select = Projection::with_hidden(entry.select.clone(), hidden);

        let ids = collect_ids(documents, &entry.path);
        if ids.is_empty() {
            continue;
        }

        trace!(path = %entry.path, %collection, count = ids.len(), "populating references");

        let found = Collection::new(collection, backend)
            .get(ids)
            .await?
            .into_iter()
            .filter_map(|value| match value {
                Bson::Document(doc) => document_id(&doc).map(|id| (id, doc)),
                _ => None,
            })
            .map(|(id, doc)| {
                let doc = match &select {
                    Some(select) => select.apply(&doc),
                    None => doc,
                };
                (id, Bson::Document(doc))
            })
            .collect::<HashMap<Uuid, Bson>>();

        let mut missing = 0usize;
        for document in documents.iter_mut() {
            path::for_each_value_mut(document, &entry.path, &mut |value| {
                substitute(value, &found, &mut missing);
            });
        }

        if missing > 0 {
            warn!(path = %entry.path, %collection, missing, "referenced documents not found");
        }
    }

    Ok(())
}

/// Finds the collection an entry refers to and the hidden fields of its model.
fn resolve_target<'e>(entry: &'e Populate, references: &[Reference]) -> DocumentStoreResult<(&'e str, &'e [&'e str])> {
    let by_path = references.iter().find(|reference| reference.path == entry.path);

    let collection = match (&entry.collection, by_path) {
        (Some(collection), _) => collection.as_str(),
        (None, Some(reference)) => reference.collection,
        (None, None) => {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "cannot populate {}: no referenced collection",
                entry.path
            )));
        }
    };

    // Collections the model does not reference have unknown hidden fields.
    let hidden = match entry.hidden {
        Some(hidden) => hidden,
        None => by_path
            .filter(|reference| reference.collection == collection)
            .or_else(|| references.iter().find(|reference| reference.collection == collection))
            .map(|reference| reference.hidden)
            .ok_or_else(|| {
                DocumentStoreError::InvalidQuery(format!(
                    "cannot populate {} from {collection}: collection is not referenced",
                    entry.path
                ))
            })?,
    };

    Ok((collection, hidden))
}

fn collect_ids(documents: &[BsonDocument], field: &str) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for document in documents {
        for value in path::document_values_at(document, field) {
            let candidates = match value {
                Bson::Array(items) => items.as_slice(),
                other => std::slice::from_ref(other),
            };

            for id in candidates.iter().filter_map(reference_id) {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
        }
    }

    ids
}

fn reference_id(value: &Bson) -> Option<Uuid> {
    match value {
        Bson::Binary(binary) => binary.to_uuid().ok(),
        Bson::String(text) => Uuid::parse_str(text).ok(),
        _ => None,
    }
}

fn substitute(value: &mut Bson, found: &HashMap<Uuid, Bson>, missing: &mut usize) {
    if let Bson::Array(items) = value {
        for item in items.iter_mut() {
            substitute(item, found, missing);
        }
        return;
    }

    if let Some(id) = reference_id(value) {
        *value = match found.get(&id) {
            Some(document) => document.clone(),
            None => {
                *missing += 1;
                Bson::Null
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn collects_each_reference_once() {
        let alice = Uuid::new();
        let bob = Uuid::new();
        let documents = vec![
            doc! { "readers": [alice, bob] },
            doc! { "readers": [bob] },
            doc! { "title": "no readers" },
        ];

        assert_eq!(collect_ids(&documents, "readers"), vec![alice, bob]);
    }

    #[test]
    fn substitutes_found_documents_and_nulls_the_rest() {
        let alice = Uuid::new();
        let ghost = Uuid::new();
        let found = HashMap::from([(alice, Bson::Document(doc! { "id": alice, "displayName": "Alice" }))]);
        let mut value = Bson::Array(vec![Bson::from(alice), Bson::from(ghost)]);
        let mut missing = 0;

        substitute(&mut value, &found, &mut missing);

        assert_eq!(missing, 1);
        assert_eq!(
            value,
            Bson::Array(vec![
                Bson::Document(doc! { "id": alice, "displayName": "Alice" }),
                Bson::Null,
            ])
        );
    }

    fn reference(path: &'static str, collection: &'static str) -> Reference {
        Reference { path, collection, hidden: &["password"] }
    }

    #[test]
    fn falls_back_to_model_references() {
        let entry = Populate::new("created.by");

        let (collection, hidden) = resolve_target(&entry, &[reference("created.by", "users")]).unwrap();
        assert_eq!(collection, "users");
        assert_eq!(hidden, ["password"]);
        assert!(resolve_target(&entry, &[]).is_err());
    }

    #[test]
    fn named_collections_must_be_referenced_or_carry_hidden_fields() {
        let references = [reference("readers", "users")];

        let populate = Populate::new("editor").from_collection("users");
        let (_, hidden) = resolve_target(&populate, &references).unwrap();
        assert_eq!(hidden, ["password"]);

        assert!(resolve_target(&Populate::new("editor").from_collection("tags"), &references).is_err());
        let tags = Populate::new("editor").from_collection("tags");
        let tags = Populate { hidden: Some(&[]), ..tags };
        assert!(resolve_target(&tags, &references).is_ok());
    }
}
