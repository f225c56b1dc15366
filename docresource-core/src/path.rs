//! Dotted field path helpers for BSON documents.
//!
//! Paths such as `created.by` or `comments.body` address nested values. When a
//! path crosses an array, lookups fan out over its elements, so
//! `comments.created.by` yields the author of every comment. A numeric segment
//! addresses an array element directly (`comments.0.body`).

use bson::{Bson, Document};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Splits a dotted path into its segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

/// Joins a parent path and a child path.
pub fn join(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{parent}.{child}"),
    }
}

/// Collects every value addressed by `path`, fanning out over arrays.
///
/// Leaf arrays are returned as a single value; callers that need element-wise
/// matching expand them.
pub fn values_at<'a>(value: &'a Bson, path: &str) -> Vec<&'a Bson> {
    let parts = segments(path).collect::<Vec<_>>();
    let mut found = Vec::new();

    collect_values(value, &parts, &mut found);
    found
}

/// Like [`values_at`], starting from a document.
pub fn document_values_at<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let parts = segments(path).collect::<Vec<_>>();
    let mut found = Vec::new();

    if let Some((head, rest)) = parts.split_first() {
        if let Some(child) = doc.get(*head) {
            collect_values(child, rest, &mut found);
        }
    }
    found
}

fn collect_values<'a>(value: &'a Bson, parts: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = parts.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(child) = doc.get(*head) {
                collect_values(child, rest, found);
            }
        }
        Bson::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(child) = items.get(index) {
                    collect_values(child, rest, found);
                }
            }
            Err(_) => {
                for item in items {
                    collect_values(item, parts, found);
                }
            }
        },
        _ => {}
    }
}

/// Returns the value at `path` without fanning out over arrays.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = segments(path);
    let mut current = doc.get(parts.next()?)?;

    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Returns a mutable reference to the value at `path` without fanning out over arrays.
pub fn get_path_mut<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Bson> {
    let mut parts = segments(path);
    let mut current = doc.get_mut(parts.next()?)?;

    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get_mut(part)?,
            Bson::Array(items) => items.get_mut(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Sets the value at `path`, creating intermediate documents as needed.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] when an intermediate value
/// exists but is not a document.
pub fn set_path(doc: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let parts = segments(path).collect::<Vec<_>>();
    let Some((last, parents)) = parts.split_last() else {
        return Err(DocumentStoreError::InvalidDocument("empty field path".to_string()));
    };

    let mut current = doc;

    for part in parents {
        let child = current
            .entry(part.to_string())
            .or_insert_with(|| Bson::Document(Document::new()));

        current = match child {
            Bson::Document(inner) => inner,
            _ => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "cannot set {path}: {part} is not a document"
                )));
            }
        };
    }

    current.insert(last.to_string(), value);

    Ok(())
}

/// Removes the value at `path`, fanning out over arrays of documents.
pub fn remove_path(doc: &mut Document, path: &str) {
    let parts = segments(path).collect::<Vec<_>>();

    remove_in_document(doc, &parts);
}

fn remove_in_document(doc: &mut Document, parts: &[&str]) {
    match parts {
        [] => {}
        [last] => {
            doc.remove(*last);
        }
        [head, rest @ ..] => match doc.get_mut(*head) {
            Some(Bson::Document(inner)) => remove_in_document(inner, rest),
            Some(Bson::Array(items)) => {
                for item in items.iter_mut() {
                    if let Bson::Document(inner) = item {
                        remove_in_document(inner, rest);
                    }
                }
            }
            _ => {}
        },
    }
}

/// Applies `visit` to every value addressed by `path`, fanning out over arrays.
pub fn for_each_value_mut<F>(doc: &mut Document, path: &str, visit: &mut F)
where
    F: FnMut(&mut Bson),
{
    let parts = segments(path).collect::<Vec<_>>();

    if let Some((head, rest)) = parts.split_first() {
        if let Some(value) = doc.get_mut(*head) {
            visit_value_mut(value, rest, visit);
        }
    }
}

fn visit_value_mut<F>(value: &mut Bson, parts: &[&str], visit: &mut F)
where
    F: FnMut(&mut Bson),
{
    let Some((head, rest)) = parts.split_first() else {
        visit(value);
        return;
    };

    match value {
        Bson::Document(inner) => {
            if let Some(child) = inner.get_mut(*head) {
                visit_value_mut(child, rest, visit);
            }
        }
        Bson::Array(items) => {
            for item in items.iter_mut() {
                visit_value_mut(item, parts, visit);
            }
        }
        _ => {}
    }
}
