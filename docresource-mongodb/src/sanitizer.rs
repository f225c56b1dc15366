//! Key escaping for MongoDB field name restrictions.
//!
//! MongoDB reserves `.` for path traversal and `$` for operators, and does not
//! accept `\0` in field names. Keys containing them are escaped on the way in
//! and restored on the way out. Values are stored untouched, so `where`
//! clauses compare against exactly what was written.

use bson::{Bson, Document};

pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Escapes reserved characters in every key of `document`, recursively.
    pub(crate) fn sanitize_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::sanitize_string(&key), Self::map_nested(value, Self::sanitize_document)))
            .collect()
    }

    /// Inverse of [`KeySanitizer::sanitize_document`].
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore_string(&key), Self::map_nested(value, Self::restore_document)))
            .collect()
    }

    pub(crate) fn sanitize_string(input: &str) -> String {
        Self::REPLACEMENTS
            .iter()
            .fold(input.to_string(), |escaped, (target, replacement)| escaped.replace(target, replacement))
    }

    pub(crate) fn restore_string(input: &str) -> String {
        Self::REPLACEMENTS
            .iter()
            .rev()
            .fold(input.to_string(), |restored, (target, replacement)| restored.replace(replacement, target))
    }

    fn map_nested(value: Bson, map: fn(Document) -> Document) -> Bson {
        match value {
            Bson::Document(inner) => Bson::Document(map(inner)),
            Bson::Array(items) => Bson::Array(
                items
                    .into_iter()
                    .map(|item| Self::map_nested(item, map))
                    .collect(),
            ),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn escapes_keys_but_not_values() {
        let original = doc! {
            "title": "ends with a dot.",
            "meta": { "a.b": 1, "$weird": [{ "x.y": "$5" }] },
        };

        let sanitized = KeySanitizer::sanitize_document(original.clone());

        assert_eq!(
            sanitized,
            doc! {
                "title": "ends with a dot.",
                "meta": { "a__dot__b": 1, "__dollar__weird": [{ "x__dot__y": "$5" }] },
            }
        );
        assert_eq!(KeySanitizer::restore_document(sanitized), original);
    }
}
