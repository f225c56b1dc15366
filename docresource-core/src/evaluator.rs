//! In-process evaluation of query expressions against BSON documents.
//!
//! Field paths are resolved with [`crate::path::values_at`], so a clause on
//! `comments.created.by` matches when any comment matches, and a clause on an
//! array field matches when the array or any of its elements matches.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, datetime::DateTime};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    path,
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

static NULL: Bson = Bson::Null;

/// Type-erased, comparable representation of BSON values.
///
/// All numeric types are normalized to `f64`.
#[derive(Debug)]
pub enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Binary(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the cross-type sort order
    /// (null, numbers, strings, documents, arrays, binary, booleans, dates).
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Binary(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total ordering used for sorting; values of different types order by type.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match self.type_rank().cmp(&other.type_rank()) {
            Ordering::Equal => self.partial_cmp(other).unwrap_or(Ordering::Equal),
            ordering => ordering,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Binary(a), Comparable::Binary(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compares two documents by a list of sort keys, first key first.
///
/// A missing field sorts like `null`, before every other value.
pub fn compare_documents(left: &Bson, right: &Bson, sort: &[Sort]) -> Ordering {
    for key in sort {
        let left_value = path::values_at(left, &key.field)
            .first()
            .map(|value| Comparable::from(*value))
            .unwrap_or(Comparable::Null);
        let right_value = path::values_at(right, &key.field)
            .first()
            .map(|value| Comparable::from(*value))
            .unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => left_value.sort_cmp(&right_value),
            SortDirection::Desc => right_value.sort_cmp(&left_value),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub struct DocumentEvaluator<'a> {
    document: &'a Bson,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Bson>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            documents
                .into_iter()
                .filter(|doc| {
                    DocumentEvaluator::new(doc)
                        .evaluate(expr)
                        .unwrap_or(false)
                })
                .cloned()
                .collect::<Vec<_>>()
        )
    }

    /// Values at `field`, with leaf arrays also expanded into their elements.
    fn candidates(&self, field: &str) -> Vec<&'a Bson> {
        let mut candidates = Vec::new();

        for value in path::values_at(self.document, field) {
            candidates.push(value);

            if let Bson::Array(items) = value {
                candidates.extend(items.iter());
            }
        }

        candidates
    }

    fn matches_any(candidates: &[&Bson], value: &Bson) -> bool {
        let wanted = match value {
            Bson::Array(values) => values.iter().collect::<Vec<_>>(),
            single => vec![single],
        };

        candidates.iter().any(|candidate| {
            wanted
                .iter()
                .any(|wanted| Comparable::from(*candidate) == Comparable::from(*wanted))
        })
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(!path::values_at(self.document, field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let mut candidates = self.candidates(field);
        let target = Comparable::from(value);

        // A missing field compares as null.
        if candidates.is_empty() {
            candidates.push(&NULL);
        }

        Ok(match op {
            FieldOp::Eq => candidates
                .iter()
                .any(|candidate| Comparable::from(*candidate) == target),
            FieldOp::Ne => !candidates
                .iter()
                .any(|candidate| Comparable::from(*candidate) == target),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => candidates
                .iter()
                .filter_map(|candidate| Comparable::from(*candidate).partial_cmp(&target))
                .any(|ordering| match op {
                    FieldOp::Gt => ordering.is_gt(),
                    FieldOp::Gte => ordering.is_ge(),
                    FieldOp::Lt => ordering.is_lt(),
                    _ => ordering.is_le(),
                }),
            FieldOp::AnyOf => Self::matches_any(&candidates, value),
            FieldOp::NoneOf => !Self::matches_any(&candidates, value),
        })
    }
}
