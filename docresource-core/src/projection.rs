//! Field selection for query results.
//!
//! A [`Projection`] is an ordered list of field paths with a selection rule for
//! each. It can be parsed from the textual form `"title -blog created.by"` or
//! from a MongoDB-style projection document, applied in-process with
//! [`Projection::apply`], or translated by a backend.
//!
//! A projection is *inclusive* when it names any field to include (or an
//! `ElemMatch`); only those fields are returned. Otherwise it is *exclusive*
//! and the named fields are removed. The document `id` is kept unless it is
//! excluded explicitly.

use std::{collections::BTreeMap, str::FromStr};

use bson::{Bson, Document};

use crate::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    evaluator::DocumentEvaluator,
    path,
    query::Expr,
};

/// Selection rule for a single field path.
#[derive(Debug, Clone)]
pub enum FieldProjection {
    /// Keep the field.
    Include,
    /// Drop the field.
    Exclude,
    /// Keep the first `n` elements of an array (or the last `-n` when negative).
    Slice(i64),
    /// Keep only the first array element matching the expression.
    ElemMatch(Expr),
}

/// An ordered set of field selections.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    fields: Vec<(String, FieldProjection)>,
}

impl Projection {
    /// Creates an empty projection, which selects everything.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Creates an inclusive projection of the given paths.
    pub fn include_only<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths
            .into_iter()
            .fold(Self::new(), |projection, path| projection.include(path))
    }

    /// Creates an exclusive projection of the given paths.
    pub fn exclude_only<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths
            .into_iter()
            .fold(Self::new(), |projection, path| projection.exclude(path))
    }

    /// Adds (or replaces) the rule for `path`.
    pub fn field(mut self, path: impl Into<String>, rule: FieldProjection) -> Self {
        let path = path.into();

        match self.fields.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((path, rule)),
        }

        self
    }

    pub fn include(self, path: impl Into<String>) -> Self {
        self.field(path, FieldProjection::Include)
    }

    pub fn exclude(self, path: impl Into<String>) -> Self {
        self.field(path, FieldProjection::Exclude)
    }

    pub fn slice(self, path: impl Into<String>, count: i64) -> Self {
        self.field(path, FieldProjection::Slice(count))
    }

    pub fn elem_match(self, path: impl Into<String>, expr: Expr) -> Self {
        self.field(path, FieldProjection::ElemMatch(expr))
    }

    /// Returns the field rules in declaration order.
    pub fn fields(&self) -> &[(String, FieldProjection)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the rule registered for exactly `path`.
    pub fn get(&self, path: &str) -> Option<&FieldProjection> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, rule)| rule)
    }

    /// Returns `true` when only the named fields are returned.
    pub fn is_inclusive(&self) -> bool {
        self.fields.iter().any(|(_, rule)| {
            matches!(rule, FieldProjection::Include | FieldProjection::ElemMatch(_))
        })
    }

    /// Merges the rules of `other` into this projection; `other` wins on conflicts.
    pub fn merge(self, other: &Projection) -> Self {
        other
            .fields
            .iter()
            .fold(self, |projection, (path, rule)| projection.field(path.clone(), rule.clone()))
    }

    /// Combines a requested selection with paths hidden by default.
    ///
    /// Hidden paths are excluded when there is no selection or an exclusive
    /// one. An inclusive selection is returned as given, so it can name
    /// hidden paths.
    pub fn with_hidden(select: Option<Projection>, hidden: &[&str]) -> Option<Projection> {
        if hidden.is_empty() {
            return select;
        }

        match select {
            None => Some(Projection::exclude_only(hidden.iter().copied())),
            Some(select) if !select.is_inclusive() => {
                Some(Projection::exclude_only(hidden.iter().copied()).merge(&select))
            }
            Some(select) => Some(select),
        }
    }

    /// Rejects projections that mix inclusion and exclusion.
    ///
    /// Excluding `id` is the one exclusion allowed in an inclusive projection.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if !self.is_inclusive() {
            return Ok(());
        }

        match self
            .fields
            .iter()
            .find(|(path, rule)| matches!(rule, FieldProjection::Exclude) && path != ID_FIELD)
        {
            Some((path, _)) => Err(DocumentStoreError::InvalidQuery(format!(
                "cannot exclude {path} in an inclusive projection"
            ))),
            None => Ok(()),
        }
    }

    /// Returns the projection seen from inside the elements of the collection at `path`.
    ///
    /// `comments.body` becomes `body`. Returns `None` when the collection is
    /// selected as a whole or nothing below it is selected, meaning the
    /// elements are returned unchanged.
    pub fn relative_to(&self, path: &str) -> Option<Projection> {
        let prefix = format!("{path}.");

        if matches!(self.get(path), Some(FieldProjection::Include)) {
            return None;
        }

        let fields = self
            .fields
            .iter()
            .filter_map(|(field, rule)| {
                field
                    .strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), rule.clone()))
            })
            .collect::<Vec<_>>();

        if fields.is_empty() {
            None
        } else {
            Some(Projection { fields })
        }
    }

    /// Applies this projection to a document.
    pub fn apply(&self, document: &Document) -> Document {
        if self.fields.is_empty() {
            return document.clone();
        }

        if self.is_inclusive() {
            let mut tree = Node::branch();

            for (field, rule) in &self.fields {
                if !matches!(rule, FieldProjection::Exclude) {
                    tree.insert(&path::segments(field).collect::<Vec<_>>(), rule);
                }
            }

            let keep_id = !matches!(self.get(ID_FIELD), Some(FieldProjection::Exclude));

            if keep_id && !tree.has_child(ID_FIELD) {
                tree.insert(&[ID_FIELD], &INCLUDE);
            }

            tree.project(document)
        } else {
            let mut projected = document.clone();

            for (field, rule) in &self.fields {
                match rule {
                    FieldProjection::Exclude => path::remove_path(&mut projected, field),
                    FieldProjection::Slice(count) => {
                        if let Some(Bson::Array(items)) = path::get_path_mut(&mut projected, field) {
                            *items = slice_items(items, *count);
                        }
                    }
                    _ => {}
                }
            }

            projected
        }
    }

    /// Builds a projection from a MongoDB-style projection document.
    ///
    /// Values may be `1`/`true` (include), `0`/`false` (exclude), a nested
    /// `{"$slice": n}` or a nested `{"$elemMatch": {...}}`.
    pub fn from_document(document: &Document) -> DocumentStoreResult<Self> {
        document
            .iter()
            .try_fold(Projection::new(), |projection, (path, value)| {
                Ok(projection.field(path.clone(), parse_rule(path, value)?))
            })
    }
}

fn parse_rule(path: &str, value: &Bson) -> DocumentStoreResult<FieldProjection> {
    let toggle = |flag: bool| if flag { FieldProjection::Include } else { FieldProjection::Exclude };

    match value {
        Bson::Boolean(flag) => Ok(toggle(*flag)),
        Bson::Int32(n) => Ok(toggle(*n != 0)),
        Bson::Int64(n) => Ok(toggle(*n != 0)),
        Bson::Double(n) => Ok(toggle(*n != 0.0)),
        Bson::Document(inner) => match inner.iter().next() {
            Some((op, Bson::Int32(n))) if op == "$slice" => Ok(FieldProjection::Slice(i64::from(*n))),
            Some((op, Bson::Int64(n))) if op == "$slice" => Ok(FieldProjection::Slice(*n)),
            Some((op, Bson::Document(filter))) if op == "$elemMatch" => {
                Ok(FieldProjection::ElemMatch(Expr::from_document(filter)?))
            }
            _ => Err(DocumentStoreError::InvalidQuery(format!(
                "unsupported projection for {path}: {inner}"
            ))),
        },
        other => Err(DocumentStoreError::InvalidQuery(format!(
            "unsupported projection for {path}: {other}"
        ))),
    }
}

impl FromStr for Projection {
    type Err = DocumentStoreError;

    /// Parses a space separated list of paths; a leading `-` excludes a path
    /// and a leading `+` is ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(input
            .split_whitespace()
            .fold(Projection::new(), |projection, token| {
                match token.strip_prefix('-') {
                    Some(path) => projection.exclude(path),
                    None => projection.include(token.trim_start_matches('+')),
                }
            }))
    }
}

pub(crate) fn slice_items(items: &[Bson], count: i64) -> Vec<Bson> {
    if count >= 0 {
        items.iter().take(usize::try_from(count).unwrap_or(usize::MAX)).cloned().collect()
    } else {
        let keep = usize::try_from(count.unsigned_abs()).unwrap_or(usize::MAX);
        items[items.len().saturating_sub(keep)..].to_vec()
    }
}

static INCLUDE: FieldProjection = FieldProjection::Include;

/// Path tree for inclusive projections.
enum Node<'p> {
    Leaf(&'p FieldProjection),
    Branch(BTreeMap<String, Node<'p>>),
}

impl<'p> Node<'p> {
    fn branch() -> Self {
        Node::Branch(BTreeMap::new())
    }

    fn has_child(&self, key: &str) -> bool {
        matches!(self, Node::Branch(children) if children.contains_key(key))
    }

    fn insert(&mut self, parts: &[&str], rule: &'p FieldProjection) {
        let Node::Branch(children) = self else {
            // A parent path is already selected whole.
            return;
        };

        match parts {
            [] => {}
            [last] => {
                children.insert(last.to_string(), Node::Leaf(rule));
            }
            [head, rest @ ..] => {
                children
                    .entry(head.to_string())
                    .or_insert_with(Node::branch)
                    .insert(rest, rule);
            }
        }
    }

    fn project(&self, document: &Document) -> Document {
        let Node::Branch(children) = self else {
            return document.clone();
        };

        let mut projected = Document::new();

        for (key, value) in document {
            if let Some(child) = children.get(key) {
                if let Some(value) = child.project_value(value) {
                    projected.insert(key.clone(), value);
                }
            }
        }

        projected
    }

    fn project_value(&self, value: &Bson) -> Option<Bson> {
        match self {
            Node::Leaf(FieldProjection::Slice(count)) => match value {
                Bson::Array(items) => Some(Bson::Array(slice_items(items, *count))),
                other => Some(other.clone()),
            },
            Node::Leaf(FieldProjection::ElemMatch(expr)) => match value {
                Bson::Array(items) => {
                    let matched = items
                        .iter()
                        .find(|item| DocumentEvaluator::new(item).evaluate(expr).unwrap_or(false));

                    matched.map(|item| Bson::Array(vec![item.clone()]))
                }
                _ => None,
            },
            Node::Leaf(_) => Some(value.clone()),
            Node::Branch(_) => match value {
                Bson::Document(inner) => Some(Bson::Document(self.project(inner))),
                Bson::Array(items) => Some(Bson::Array(
                    items
                        .iter()
                        .filter_map(|item| match item {
                            Bson::Document(inner) => Some(Bson::Document(self.project(inner))),
                            _ => None,
                        })
                        .collect(),
                )),
                _ => None,
            },
        }
    }
}
