//! Translation of core queries into MongoDB filter, projection and sort documents.

use bson::{Bson, Document, doc};

use docresource_core::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    projection::{FieldProjection, Projection},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // $not only applies to field expressions, $nor negates whole clauses.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::AnyOf => doc! { "$in": value },
                FieldOp::NoneOf => doc! { "$nin": value },
            }
        })
    }
}

/// Builds a MongoDB projection document.
///
/// Rules below a path that already has an include or exclude rule are
/// dropped, since MongoDB rejects such path collisions. Inclusive projections
/// always keep the `id` field.
pub(crate) fn projection_document(projection: &Projection) -> DocumentStoreResult<Document> {
    let mut document = Document::new();

    for (field, rule) in projection.fields() {
        let covered = projection.fields().iter().any(|(other, other_rule)| {
            matches!(other_rule, FieldProjection::Include | FieldProjection::Exclude)
                && field.len() > other.len()
                && field.starts_with(other.as_str())
                && field.as_bytes()[other.len()] == b'.'
        });
        if covered {
            continue;
        }

        let value = match rule {
            FieldProjection::Include => Bson::Int32(1),
            FieldProjection::Exclude => Bson::Int32(0),
            FieldProjection::Slice(count) => Bson::Document(doc! { "$slice": *count }),
            FieldProjection::ElemMatch(expr) => Bson::Document(doc! {
                "$elemMatch": MongoQueryTranslator.visit_expr(expr)?,
            }),
        };
        document.insert(field.clone(), value);
    }

    if projection.is_inclusive() && !document.contains_key(ID_FIELD) {
        document.insert(ID_FIELD, 1);
    }

    Ok(document)
}

/// Builds a MongoDB sort document; key order is significance order.
pub(crate) fn sort_document(sort: &[Sort]) -> Document {
    sort.iter()
        .map(|key| {
            let direction = match key.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            };
            (key.field.clone(), Bson::Int32(direction))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docresource_core::query::Filter;

    #[test]
    fn translates_owner_or_reader_filter() {
        let expr = Filter::or([Filter::eq("created.by", "alice"), Filter::eq("readers", "alice")]);

        let translated = MongoQueryTranslator.visit_expr(&expr).unwrap();

        assert_eq!(
            translated,
            doc! { "$or": [
                { "created.by": { "$eq": "alice" } },
                { "readers": { "$eq": "alice" } },
            ] }
        );
    }

    #[test]
    fn inclusive_projection_keeps_id_and_drops_collisions() {
        let projection = Projection::include_only(["comments", "comments.id", "title"]);

        assert_eq!(
            projection_document(&projection).unwrap(),
            doc! { "comments": 1, "title": 1, "id": 1 }
        );
    }

    #[test]
    fn elem_match_and_slice_rules() {
        let projection = Projection::new()
            .elem_match("comments", Filter::eq("id", "c1"))
            .slice("readers", -2);

        assert_eq!(
            projection_document(&projection).unwrap(),
            doc! {
                "comments": { "$elemMatch": { "id": { "$eq": "c1" } } },
                "readers": { "$slice": -2_i64 },
                "id": 1,
            }
        );
    }

    #[test]
    fn sort_keys_keep_their_order() {
        let sort = Sort::parse_list("-created.date title");

        assert_eq!(sort_document(&sort), doc! { "created.date": -1, "title": 1 });
    }
}
