//! Query construction and filtering API for document stores.
//!
//! This module provides type-safe query construction with filtering, field selection,
//! multi-key sorting, pagination, and a visitor pattern for query execution across
//! different backends.
//!
//! # Query Building
//!
//! Queries can be constructed using the fluent builder API:
//!
//! ```ignore
//! use docresource::query::{Query, Filter};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("name", "Alice"))
//!     .limit(10)
//!     .offset(0)
//!     .sort("created.date", SortDirection::Desc)
//!     .build();
//! ```
//!
//! # MongoDB-style filters
//!
//! [`Expr::from_document`] parses filter documents such as
//! `{"$or": [{"created.by": id}, {"readers": id}]}`, which is how `where`
//! clauses arrive in request parameters.
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides a collection of static methods for building filter expressions:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Existence: `exists`, `not_exists`
//! - Array: `any_of`, `none_of`
//! - Logical: `and`, `or`
//!
//! Expressions can be combined using chainable methods for more complex queries.

use bson::{Bson, Document};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    projection::Projection,
};

/// Sort direction for query results.
#[derive(Debug, Clone)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
///
/// Specifies which field to sort by and in which direction.
#[derive(Debug, Clone)]
pub struct Sort {
    /// The field path to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Sort { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Sort { field: field.into(), direction: SortDirection::Desc }
    }

    /// Parses a space separated list of sort keys; a leading `-` sorts descending.
    ///
    /// `"-created.date title"` sorts newest first, then by title.
    pub fn parse_list(input: &str) -> Vec<Sort> {
        input
            .split_whitespace()
            .map(|token| match token.strip_prefix('-') {
                Some(field) => Sort::desc(field),
                None => Sort::asc(token.trim_start_matches('+')),
            })
            .collect()
    }

    /// Parses a `{field: 1 | -1 | "asc" | "desc"}` sort document.
    pub fn from_document(document: &Document) -> DocumentStoreResult<Vec<Sort>> {
        document
            .iter()
            .map(|(field, value)| {
                let direction = match value {
                    Bson::Int32(1) | Bson::Int64(1) => SortDirection::Asc,
                    Bson::Int32(-1) | Bson::Int64(-1) => SortDirection::Desc,
                    Bson::Double(n) if *n == 1.0 => SortDirection::Asc,
                    Bson::Double(n) if *n == -1.0 => SortDirection::Desc,
                    Bson::String(s) if matches!(s.as_str(), "asc" | "ascending") => SortDirection::Asc,
                    Bson::String(s) if matches!(s.as_str(), "desc" | "descending") => SortDirection::Desc,
                    other => {
                        return Err(DocumentStoreError::InvalidQuery(format!(
                            "invalid sort direction for {field}: {other}"
                        )));
                    }
                };

                Ok(Sort { field: field.clone(), direction })
            })
            .collect()
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Array contains any of the values.
    AnyOf,
    /// Array contains none of the values.
    NoneOf,
}

impl FieldOp {
    /// Resolves a comparison operator name, with or without the leading `$`.
    ///
    /// Accepts `eq ne gt gte lt lte in nin`.
    pub fn from_operator(operator: &str) -> Option<FieldOp> {
        match operator.trim_start_matches('$') {
            "eq" => Some(FieldOp::Eq),
            "ne" => Some(FieldOp::Ne),
            "gt" => Some(FieldOp::Gt),
            "gte" => Some(FieldOp::Gte),
            "lt" => Some(FieldOp::Lt),
            "lte" => Some(FieldOp::Lte),
            "in" => Some(FieldOp::AnyOf),
            "nin" => Some(FieldOp::NoneOf),
            _ => None,
        }
    }
}

/// A filter expression for querying documents.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`)
/// to build complex filter predicates.
///
/// # Example
///
/// ```ignore
/// use docresource::query::{Expr, Filter, FieldOp};
///
/// // Simple equality check
/// let expr1 = Filter::eq("status", "active");
///
/// // Complex nested expression
/// let expr2 = Filter::and(vec![
///     Filter::eq("status", "active"),
///     Filter::gt("age", 18)
/// ]);
/// ```
#[derive(Debug, Clone)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Parses a MongoDB-style filter document.
    ///
    /// Top-level keys are field paths (a bare value means equality, a nested
    /// document holds operators) or the logical operators `$and`, `$or` and
    /// `$nor`. Field operators are `$eq $ne $gt $gte $lt $lte $in $nin
    /// $exists $not`. Several clauses are combined with AND.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] for unknown operators or
    /// malformed operands.
    pub fn from_document(document: &Document) -> DocumentStoreResult<Expr> {
        let mut clauses = Vec::new();

        for (key, value) in document {
            match key.as_str() {
                "$and" => clauses.push(Expr::And(parse_expr_list(key, value)?)),
                "$or" => clauses.push(Expr::Or(parse_expr_list(key, value)?)),
                "$nor" => clauses.push(Expr::Or(parse_expr_list(key, value)?).not()),
                op if op.starts_with('$') => {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "unsupported top-level operator {op}"
                    )));
                }
                field => clauses.extend(parse_field_clauses(field, value)?),
            }
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Expr::And(clauses),
        })
    }
}

fn parse_expr_list(operator: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    match value {
        Bson::Array(items) => items
            .iter()
            .map(|item| match item {
                Bson::Document(inner) => Expr::from_document(inner),
                other => Err(DocumentStoreError::InvalidQuery(format!(
                    "{operator} expects documents, got {other}"
                ))),
            })
            .collect(),
        other => Err(DocumentStoreError::InvalidQuery(format!(
            "{operator} expects an array, got {other}"
        ))),
    }
}

fn parse_field_clauses(field: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    let operators = match value {
        Bson::Document(inner) if inner.keys().next().is_some_and(|key| key.starts_with('$')) => inner,
        _ => return Ok(vec![Expr::field(field.to_string(), FieldOp::Eq, value.clone())]),
    };

    operators
        .iter()
        .map(|(operator, operand)| match operator.as_str() {
            "$exists" => Ok(Expr::Exists(field.to_string(), truthy(operand))),
            "$not" => match operand {
                Bson::Document(_) => Ok(Expr::And(parse_field_clauses(field, operand)?).not()),
                other => Err(DocumentStoreError::InvalidQuery(format!(
                    "$not on {field} expects operators, got {other}"
                ))),
            },
            "$in" | "$nin" if !matches!(operand, Bson::Array(_)) => Err(DocumentStoreError::InvalidQuery(
                format!("{operator} on {field} expects an array"),
            )),
            _ => match FieldOp::from_operator(operator) {
                Some(op) if operator.starts_with('$') => {
                    Ok(Expr::field(field.to_string(), op, operand.clone()))
                }
                _ => Err(DocumentStoreError::InvalidQuery(format!(
                    "unsupported operator {operator} on {field}"
                ))),
            },
        })
        .collect()
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

/// A structured query for retrieving and filtering documents.
///
/// This struct encapsulates filters, field selection, limits, offsets, and sort
/// specifications for document queries. Use [`QueryBuilder`] for ergonomic construction.
///
/// # Example
///
/// ```ignore
/// use docresource::query::{Query, Filter, SortDirection};
///
/// let query = Query::builder()
///     .filter(Filter::eq("status", "active"))
///     .limit(10)
///     .offset(0)
///     .sort("created_at", SortDirection::Desc)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Optional field selection applied to each result.
    pub projection: Option<Projection>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip (for pagination).
    pub offset: Option<usize>,
    /// Sort keys for results, most significant first.
    pub sort: Vec<Sort>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query {
            filter: None,
            projection: None,
            limit: None,
            offset: None,
            sort: Vec::new(),
        }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
///
/// Provides static methods to construct common filter expressions in a type-safe manner.
/// All methods accept field names and values as `Into<String>` and `Into<Bson>` for ergonomics.
///
/// # Example
///
/// ```ignore
/// use docresource::query::Filter;
///
/// let expr = Filter::eq("name", "Alice")
///     .and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
    /// Creates an equality filter expression.
    ///
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Creates a not-equal filter expression.
    ///
    /// Matches documents where the field does not equal the specified value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Creates a greater-than filter expression.
    ///
    /// Matches documents where the field is greater than the specified value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Creates a greater-than-or-equal filter expression.
    ///
    /// Matches documents where the field is greater than or equal to the specified value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Creates a less-than filter expression.
    ///
    /// Matches documents where the field is less than the specified value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Creates a less-than-or-equal filter expression.
    ///
    /// Matches documents where the field is less than or equal to the specified value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Creates an existence filter expression.
    ///
    /// Matches documents where the field is present, even when it holds null.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Creates a non-existence filter expression.
    ///
    /// Matches documents where the field does not exist (is null or missing).
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Creates a logical AND filter expression.
    ///
    /// Combines multiple expressions such that all must match for a document to be included.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Creates a logical OR filter expression.
    ///
    /// Combines multiple expressions such that any can match for a document to be included.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Creates an array membership filter expression.
    ///
    /// Matches documents where the array field contains any of the specified values.
    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    /// Creates an array exclusion filter expression.
    ///
    /// Matches documents where the array field contains none of the specified values.
    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query, replacing any previous one.
    ///
    /// # Arguments
    ///
    /// * `filter` - The filter expression to apply
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Adds a filter clause that must hold in addition to the current filter.
    pub fn and_filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(match self.query.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Sets the field selection applied to results.
    pub fn projection(mut self, projection: Projection) -> Self {
        self.query.projection = Some(projection);
        self
    }

    /// Sets the maximum number of documents to return.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of documents to return
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip (for pagination).
    ///
    /// # Arguments
    ///
    /// * `offset` - The number of documents to skip
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Appends a sort key; earlier keys take precedence.
    ///
    /// # Arguments
    ///
    /// * `field` - The field path to sort by
    /// * `direction` - The sort direction (ascending or descending)
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Appends several sort keys.
    pub fn sort_by(mut self, keys: impl IntoIterator<Item = Sort>) -> Self {
        self.query.sort.extend(keys);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn parses_owner_or_reader_filter() {
        let expr = Expr::from_document(&doc! {
            "$or": [{ "created.by": "alice" }, { "readers": "alice" }],
        })
        .unwrap();

        match expr {
            Expr::Or(branches) => {
                assert_eq!(branches.len(), 2);
                assert!(matches!(
                    &branches[0],
                    Expr::Field { field, op: FieldOp::Eq, .. } if field == "created.by"
                ));
            }
            other => panic!("expected $or, got {other:?}"),
        }
    }

    #[test]
    fn parses_operator_documents_into_conjunctions() {
        let expr = Expr::from_document(&doc! {
            "title": "hello",
            "rank": { "$gte": 2, "$lt": 10 },
            "deleted": { "$exists": false },
        })
        .unwrap();

        let Expr::And(clauses) = expr else {
            panic!("expected a conjunction");
        };

        assert_eq!(clauses.len(), 4);
        assert!(matches!(&clauses[1], Expr::Field { op: FieldOp::Gte, .. }));
        assert!(matches!(&clauses[3], Expr::Exists(field, false) if field == "deleted"));
    }

    #[test]
    fn rejects_unknown_operators() {
        assert!(matches!(
            Expr::from_document(&doc! { "title": { "$regex": "^a" } }),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            Expr::from_document(&doc! { "$where": "true" }),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
        assert!(Expr::from_document(&doc! { "tags": { "$in": "a" } }).is_err());
    }

    #[test]
    fn parses_sort_lists() {
        let keys = Sort::parse_list("-created.date title");

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].field, "created.date");
        assert!(matches!(keys[0].direction, SortDirection::Desc));
        assert!(matches!(keys[1].direction, SortDirection::Asc));

        let keys = Sort::from_document(&doc! { "rank": -1, "title": "asc" }).unwrap();
        assert!(matches!(keys[0].direction, SortDirection::Desc));
        assert!(Sort::from_document(&doc! { "rank": 3 }).is_err());
    }

    #[test]
    fn and_filter_accumulates_clauses() {
        let query = Query::builder()
            .and_filter(Filter::eq("a", 1))
            .and_filter(Filter::eq("b", 2))
            .and_filter(Filter::eq("c", 3))
            .build();

        assert!(matches!(query.filter, Some(Expr::And(ref list)) if list.len() == 3));
    }
}
