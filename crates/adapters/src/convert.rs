//! BSON <-> core value conversion and query translation.

use leaf_core::document::{Document, FieldValue, ObjectId, PRIMARY_KEY_FIELD};
use leaf_core::query::{FieldPredicate, Matcher, QuerySpec, SortDirection, SortSpec};
use mongodb::bson::{doc, oid, Bson, DateTime, Document as BsonDocument};
use tracing::warn;

#[must_use]
pub fn document_from_bson(document: BsonDocument) -> Document {
    document
        .into_iter()
        .map(|(name, value)| (name, field_value_from_bson(value)))
        .collect()
}

#[must_use]
pub fn field_value_from_bson(value: Bson) -> FieldValue {
    match value {
        Bson::Null | Bson::Undefined => FieldValue::Null,
        Bson::Boolean(value) => FieldValue::Bool(value),
        Bson::Int32(value) => FieldValue::Int(i64::from(value)),
        Bson::Int64(value) => FieldValue::Int(value),
        Bson::Double(value) => FieldValue::Double(value),
        Bson::String(value) => FieldValue::String(value),
        Bson::ObjectId(id) => FieldValue::ObjectId(ObjectId::from_bytes(id.bytes())),
        Bson::DateTime(timestamp) => FieldValue::DateTime(timestamp.timestamp_millis()),
        Bson::Array(items) => {
            FieldValue::Array(items.into_iter().map(field_value_from_bson).collect())
        }
        Bson::Document(document) => FieldValue::Document(document_from_bson(document)),
        other => opaque_value(other),
    }
}

/// Field name of the single-field wrapper that carries an unmapped value.
const OPAQUE_KEY: &str = "v";

fn opaque_value(value: Bson) -> FieldValue {
    let display = value.to_string();
    let mut wrapper = BsonDocument::new();
    wrapper.insert(OPAQUE_KEY, value);
    let mut raw = Vec::new();
    if let Err(error) = wrapper.to_writer(&mut raw) {
        let text = display.as_str();
        warn!(%error, display = %text, "value kept as text only");
        raw.clear();
    }
    FieldValue::Other { display, raw }
}

fn opaque_to_bson(display: &str, raw: &[u8]) -> Bson {
    BsonDocument::from_reader(raw)
        .ok()
        .and_then(|mut wrapper| wrapper.remove(OPAQUE_KEY))
        .unwrap_or_else(|| Bson::String(display.to_string()))
}

/// Integers are stored as 32-bit when they fit.
#[must_use]
pub fn field_value_to_bson(value: &FieldValue) -> Bson {
    match value {
        FieldValue::Null => Bson::Null,
        FieldValue::Bool(value) => Bson::Boolean(*value),
        FieldValue::Int(value) => i32::try_from(*value).map_or(Bson::Int64(*value), Bson::Int32),
        FieldValue::Double(value) => Bson::Double(*value),
        FieldValue::String(value) => Bson::String(value.clone()),
        FieldValue::Other { display, raw } => opaque_to_bson(display, raw),
        FieldValue::ObjectId(id) => Bson::ObjectId(oid::ObjectId::from_bytes(id.bytes())),
        FieldValue::DateTime(millis) => Bson::DateTime(DateTime::from_millis(*millis)),
        FieldValue::Array(items) => Bson::Array(items.iter().map(field_value_to_bson).collect()),
        FieldValue::Document(document) => Bson::Document(document_to_bson(document)),
    }
}

#[must_use]
pub fn document_to_bson(document: &Document) -> BsonDocument {
    document
        .iter()
        .map(|(name, value)| (name.to_string(), field_value_to_bson(value)))
        .collect()
}

#[must_use]
pub fn query_to_filter(query: &QuerySpec) -> BsonDocument {
    match query {
        QuerySpec::All => BsonDocument::new(),
        QuerySpec::Field(predicate) => predicate_to_filter(predicate),
        QuerySpec::AnyOf(predicates) => {
            let branches: Vec<Bson> = predicates
                .iter()
                .map(|predicate| Bson::Document(predicate_to_filter(predicate)))
                .collect();
            doc! { "$or": branches }
        }
    }
}

/// Substring matches are case-insensitive with the search text taken literally.
fn predicate_to_filter(predicate: &FieldPredicate) -> BsonDocument {
    let condition = match &predicate.matcher {
        Matcher::Equals(value) => field_value_to_bson(value),
        Matcher::Contains(text) => Bson::Document(doc! {
            "$regex": regex::escape(text),
            "$options": "i",
        }),
    };
    let mut filter = BsonDocument::new();
    filter.insert(predicate.field.clone(), condition);
    filter
}

/// Sort document for `sort`, with `_id` as tie-breaker so that pages are
/// stable when the sort field repeats.
#[must_use]
pub fn sort_to_document(sort: &SortSpec) -> BsonDocument {
    let order = match sort.direction {
        SortDirection::Ascending => 1,
        SortDirection::Descending => -1,
    };
    let mut document = BsonDocument::new();
    document.insert(sort.field.clone(), Bson::Int32(order));
    if sort.field != PRIMARY_KEY_FIELD {
        document.insert(PRIMARY_KEY_FIELD, Bson::Int32(order));
    }
    document
}

#[must_use]
pub fn id_filter(id: &FieldValue) -> BsonDocument {
    let mut filter = BsonDocument::new();
    filter.insert(PRIMARY_KEY_FIELD, field_value_to_bson(id));
    filter
}

#[cfg(test)]
mod tests {
    use leaf_core::document::{Document, FieldValue, ObjectId};
    use leaf_core::query::{build_query, SearchScope, SortSpec};
    use mongodb::bson::spec::BinarySubtype;
    use mongodb::bson::{doc, oid, Binary, Bson, DateTime, Decimal128, Timestamp};

    use super::{
        document_from_bson, field_value_from_bson, field_value_to_bson, id_filter,
        query_to_filter, sort_to_document,
    };

    #[test]
    fn bson_documents_keep_field_order_and_types() {
        let oid = oid::ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").expect("valid oid");
        let document = document_from_bson(doc! {
            "_id": oid,
            "name": "Ada",
            "age": 36_i32,
            "score": 9.5,
            "joined": DateTime::from_millis(0),
            "tags": ["a", 1_i64],
            "address": { "city": "London" },
            "missing": Bson::Null,
        });

        let names: Vec<_> = document.field_names().collect();
        assert_eq!(
            names,
            ["_id", "name", "age", "score", "joined", "tags", "address", "missing"]
        );
        assert_eq!(
            document.id(),
            Some(&FieldValue::ObjectId(
                ObjectId::parse_canonical("64b7f0c2a1b2c3d4e5f60718").expect("valid id")
            ))
        );
        assert_eq!(document.get("age"), Some(&FieldValue::Int(36)));
        assert_eq!(document.get("joined"), Some(&FieldValue::DateTime(0)));
        assert_eq!(
            document.get("tags"),
            Some(&FieldValue::Array(vec![
                FieldValue::String("a".to_string()),
                FieldValue::Int(1),
            ]))
        );
        assert_eq!(
            document.get("address"),
            Some(&FieldValue::Document(
                Document::new().with_field("city", FieldValue::String("London".to_string()))
            ))
        );
        assert_eq!(document.get("missing"), Some(&FieldValue::Null));
    }

    #[test]
    fn integers_use_the_narrowest_width() {
        assert_eq!(field_value_to_bson(&FieldValue::Int(42)), Bson::Int32(42));
        assert_eq!(
            field_value_to_bson(&FieldValue::Int(5_000_000_000)),
            Bson::Int64(5_000_000_000)
        );
    }

    #[test]
    fn field_search_translates_to_equality_or_regex() {
        let fields = vec!["_id".to_string(), "age".to_string(), "name".to_string()];

        let equality = build_query(&fields, &SearchScope::Field("age".to_string()), "30");
        assert_eq!(query_to_filter(&equality), doc! { "age": 30_i32 });

        let substring = build_query(&fields, &SearchScope::Field("name".to_string()), "a.b");
        assert_eq!(
            query_to_filter(&substring),
            doc! { "name": { "$regex": "a\\.b", "$options": "i" } }
        );

        let identifier = build_query(
            &fields,
            &SearchScope::Field("_id".to_string()),
            "64b7f0c2a1b2c3d4e5f60718",
        );
        let oid = oid::ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").expect("valid oid");
        assert_eq!(query_to_filter(&identifier), doc! { "_id": oid });
    }

    #[test]
    fn global_search_becomes_disjunction() {
        let fields = vec!["name".to_string(), "city".to_string()];
        let query = build_query(&fields, &SearchScope::AllFields, "lon");
        assert_eq!(
            query_to_filter(&query),
            doc! {
                "$or": [
                    { "name": { "$regex": "lon", "$options": "i" } },
                    { "city": { "$regex": "lon", "$options": "i" } },
                ]
            }
        );
        assert_eq!(
            query_to_filter(&build_query(&fields, &SearchScope::AllFields, "  ")),
            doc! {}
        );
    }

    #[test]
    fn sort_documents_break_ties_on_identifier() {
        assert_eq!(sort_to_document(&SortSpec::default()), doc! { "_id": 1 });

        let mut sort = SortSpec::ascending("age");
        sort.toggle_direction();
        assert_eq!(sort_to_document(&sort), doc! { "age": -1, "_id": -1 });
    }

    #[test]
    fn id_filter_targets_primary_key() {
        assert_eq!(
            id_filter(&FieldValue::String("a1".to_string())),
            doc! { "_id": "a1" }
        );
    }

    #[test]
    fn unmapped_identifiers_are_written_back_unchanged() {
        let ids = [
            Bson::Binary(Binary {
                subtype: BinarySubtype::Uuid,
                bytes: vec![7; 16],
            }),
            Bson::Decimal128(Decimal128::from_bytes([1; 16])),
            Bson::Timestamp(Timestamp {
                time: 1_700_000_000,
                increment: 3,
            }),
        ];

        for id in ids {
            let value = field_value_from_bson(id.clone());
            assert_eq!(value.type_name(), "other");
            assert_eq!(value.display_text(), id.to_string());
            assert_eq!(id_filter(&value), doc! { "_id": id });
        }
    }

    #[test]
    fn unmapped_value_without_encoding_falls_back_to_text() {
        let value = FieldValue::Other {
            display: "Decimal128(..)".to_string(),
            raw: Vec::new(),
        };
        assert_eq!(
            field_value_to_bson(&value),
            Bson::String("Decimal128(..)".to_string())
        );
    }
}
