//! Request parameters for resource operations and their translation into queries.
//!
//! [`ResourceParams`] is the declarative `{select, where, sort, skip, limit,
//! populate, lean}` object accepted by every [`Resource`](crate::resource::Resource)
//! operation. [`ResourceParams::apply_to`] maps each key onto the matching
//! [`QueryBuilder`] call; `populate` and `lean` are applied to the results
//! after the query has run.
//!
//! Parameters can be built in code or deserialized from a JSON request object:
//!
//! ```ignore
//! let params = ResourceParams::from_json(serde_json::json!({
//!     "select": "title blog created.by",
//!     "where": { "$or": [{ "created.by": user_id }, { "readers": user_id }] },
//!     "sort": "-created.date",
//!     "skip": { "operator": "lt", "path": "created.date", "val": last_seen },
//!     "limit": 5,
//!     "populate": [{ "path": "created.by", "select": "displayName" }],
//! }))?;
//! ```

use bson::{Bson, DateTime, Document, Uuid};
use serde::Deserialize;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    model::Model,
    projection::Projection,
    query::{Expr, FieldOp, Query, QueryBuilder, Sort},
};

/// How many results to pass over before the first one returned.
#[derive(Debug, Clone)]
pub enum Skip {
    /// Skip a fixed number of results.
    Count(usize),
    /// Keyset pagination: only return results where `path <operator> value`.
    Range {
        operator: FieldOp,
        path: String,
        value: Bson,
    },
}

/// Replaces identifiers at `path` with the documents they refer to.
#[derive(Debug, Clone)]
pub struct Populate {
    /// Path holding an identifier or an array of identifiers.
    pub path: String,
    /// Collection the identifiers refer to; taken from the model's references when `None`.
    pub collection: Option<String>,
    /// Selection applied to each referenced document.
    pub select: Option<Projection>,
    /// Hidden fields of the referenced model; looked up in the model's references when `None`.
    pub hidden: Option<&'static [&'static str]>,
}

impl Populate {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            collection: None,
            select: None,
            hidden: None,
        }
    }

    /// Populates `path` with documents of model `M`, hiding its hidden fields.
    pub fn of<M: Model>(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            collection: Some(M::collection_name().to_string()),
            select: None,
            hidden: Some(M::hidden_fields()),
        }
    }

    /// Names the collection; its hidden fields come from the model's references.
    pub fn from_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self.hidden = None;
        self
    }

    pub fn select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }
}

/// Declarative parameters shared by all resource operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawParams")]
pub struct ResourceParams {
    /// Field selection; the model's hidden fields are excluded when `None`.
    pub select: Option<Projection>,
    /// The `where` clause.
    pub filter: Option<Expr>,
    pub sort: Vec<Sort>,
    pub skip: Option<Skip>,
    pub limit: Option<usize>,
    pub populate: Vec<Populate>,
    /// Return stored documents without the model's virtual fields.
    pub lean: bool,
}

impl ResourceParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses parameters from a JSON request object.
    ///
    /// Strings inside `where` and `skip` that parse as UUIDs or RFC 3339
    /// timestamps are converted to UUID and datetime values, so that they
    /// compare equal to stored identifiers and dates.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] when a parameter is malformed.
    pub fn from_json(value: serde_json::Value) -> DocumentStoreResult<Self> {
        serde_json::from_value(value).map_err(|e| DocumentStoreError::InvalidQuery(e.to_string()))
    }

    pub fn select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }

    /// Sets the `where` clause.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.skip = Some(Skip::Count(count));
        self
    }

    /// Skips by range: only results where `path <operator> value` are returned.
    pub fn skip_range(mut self, operator: FieldOp, path: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.skip = Some(Skip::Range {
            operator,
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn populate(mut self, populate: Populate) -> Self {
        self.populate.push(populate);
        self
    }

    pub fn lean(mut self) -> Self {
        self.lean = true;
        self
    }

    /// Returns a copy of these parameters without the `where` clause.
    pub fn without_filter(&self) -> Self {
        Self {
            filter: None,
            ..self.clone()
        }
    }

    /// Maps each parameter onto the matching builder call.
    ///
    /// A `where` clause and a range skip are added to any filter already on the builder.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] for a selection that mixes
    /// inclusion and exclusion, or a range skip with a non-range operator.
    pub fn apply_to(&self, mut builder: QueryBuilder) -> DocumentStoreResult<QueryBuilder> {
        if let Some(select) = &self.select {
            select.validate()?;
            builder = builder.projection(select.clone());
        }
        if let Some(filter) = &self.filter {
            builder = builder.and_filter(filter.clone());
        }
        if !self.sort.is_empty() {
            builder = builder.sort_by(self.sort.iter().cloned());
        }

        match &self.skip {
            Some(Skip::Count(count)) => builder = builder.offset(*count),
            Some(Skip::Range { operator, path, value }) => {
                if !matches!(operator, FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte) {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "skip range on {path} needs gt, gte, lt or lte, got {operator:?}"
                    )));
                }

                builder = builder.and_filter(Expr::field(path.clone(), operator.clone(), value.clone()));
            }
            None => {}
        }

        // A limit of zero means no limit, as in MongoDB.
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            builder = builder.limit(limit);
        }

        Ok(builder)
    }

    /// Builds a standalone query from these parameters.
    pub fn to_query(&self) -> DocumentStoreResult<Query> {
        Ok(self.apply_to(Query::builder())?.build())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Text(String),
    Fields(Document),
}

impl RawSelection {
    fn into_projection(self) -> DocumentStoreResult<Projection> {
        match self {
            RawSelection::Text(text) => text.parse(),
            RawSelection::Fields(fields) => Projection::from_document(&fields),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSort {
    Text(String),
    Fields(Document),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSkip {
    Count(u64),
    Range {
        operator: String,
        path: String,
        val: Bson,
    },
}

#[derive(Deserialize)]
struct RawPopulate {
    path: String,
    #[serde(default, alias = "ref", alias = "model")]
    collection: Option<String>,
    #[serde(default)]
    select: Option<RawSelection>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPopulateList {
    Paths(String),
    One(RawPopulate),
    Many(Vec<RawPopulate>),
}

#[derive(Deserialize)]
struct RawParams {
    #[serde(default)]
    select: Option<RawSelection>,
    #[serde(default, rename = "where")]
    filter: Option<Document>,
    #[serde(default)]
    sort: Option<RawSort>,
    #[serde(default)]
    skip: Option<RawSkip>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    populate: Option<RawPopulateList>,
    #[serde(default)]
    lean: bool,
}

impl TryFrom<RawParams> for ResourceParams {
    type Error = DocumentStoreError;

    fn try_from(raw: RawParams) -> Result<Self, Self::Error> {
        let filter = raw
            .filter
            .map(|filter| Expr::from_document(&cast_document_values(filter)))
            .transpose()?;

        let sort = match raw.sort {
            Some(RawSort::Text(text)) => Sort::parse_list(&text),
            Some(RawSort::Fields(fields)) => Sort::from_document(&fields)?,
            None => Vec::new(),
        };

        let skip = match raw.skip {
            Some(RawSkip::Count(count)) => Some(Skip::Count(usize::try_from(count).map_err(|_| {
                DocumentStoreError::InvalidQuery(format!("skip count {count} is too large"))
            })?)),
            Some(RawSkip::Range { operator, path, val }) => Some(Skip::Range {
                operator: FieldOp::from_operator(&operator).ok_or_else(|| {
                    DocumentStoreError::InvalidQuery(format!("unknown skip operator {operator}"))
                })?,
                path,
                value: cast_values(val),
            }),
            None => None,
        };

        let populate = match raw.populate {
            Some(RawPopulateList::Paths(paths)) => paths.split_whitespace().map(Populate::new).collect(),
            Some(RawPopulateList::One(entry)) => vec![entry.try_into()?],
            Some(RawPopulateList::Many(entries)) => entries
                .into_iter()
                .map(Populate::try_from)
                .collect::<DocumentStoreResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(ResourceParams {
            select: raw.select.map(RawSelection::into_projection).transpose()?,
            filter,
            sort,
            skip,
            limit: raw.limit,
            populate,
            lean: raw.lean,
        })
    }
}

impl TryFrom<RawPopulate> for Populate {
    type Error = DocumentStoreError;

    fn try_from(raw: RawPopulate) -> Result<Self, Self::Error> {
        Ok(Populate {
            path: raw.path,
            collection: raw.collection,
            select: raw.select.map(RawSelection::into_projection).transpose()?,
            hidden: None,
        })
    }
}

/// Converts strings holding UUIDs or timestamps into typed values, recursively.
fn cast_values(value: Bson) -> Bson {
    match value {
        Bson::String(text) => {
            if let Ok(id) = Uuid::parse_str(&text) {
                Bson::from(id)
            } else if let Ok(date) = DateTime::parse_rfc3339_str(&text) {
                Bson::DateTime(date)
            } else {
                Bson::String(text)
            }
        }
        Bson::Array(items) => Bson::Array(items.into_iter().map(cast_values).collect()),
        Bson::Document(doc) => Bson::Document(cast_document_values(doc)),
        other => other,
    }
}

fn cast_document_values(doc: Document) -> Document {
    doc.into_iter()
        .map(|(key, value)| (key, cast_values(value)))
        .collect()
}
