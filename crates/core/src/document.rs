use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as JsonValue};

/// Name of the identity field every stored document carries.
pub const PRIMARY_KEY_FIELD: &str = "_id";

/// 12-byte object identifier whose canonical text form is 24 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const CANONICAL_LEN: usize = 24;

    #[must_use]
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parses the canonical 24-hex-digit form. Anything else yields `None`.
    #[must_use]
    pub fn parse_canonical(raw: &str) -> Option<Self> {
        if raw.len() != Self::CANONICAL_LEN {
            return None;
        }

        let mut bytes = [0_u8; 12];
        hex::decode_to_slice(raw, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    ObjectId(ObjectId),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Array(Vec<FieldValue>),
    Document(Document),
    /// Driver types without a dedicated variant. `raw` is the driver's own
    /// encoding and is written back unchanged, so such values still work as
    /// identities and filters.
    Other { display: String, raw: Vec<u8> },
}

impl FieldValue {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Double(_) => "number",
            Self::String(_) => "string",
            Self::ObjectId(_) => "objectId",
            Self::DateTime(_) => "date",
            Self::Array(_) => "array",
            Self::Document(_) => "document",
            Self::Other { .. } => "other",
        }
    }

    /// Relaxed JSON projection used for compact cells and the detail view.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(value) => JsonValue::Bool(*value),
            Self::Int(value) => JsonValue::Number(Number::from(*value)),
            Self::Double(value) => {
                Number::from_f64(*value).map_or(JsonValue::Null, JsonValue::Number)
            }
            Self::String(value) | Self::Other { display: value, .. } => {
                JsonValue::String(value.clone())
            },
            Self::ObjectId(id) => JsonValue::String(id.to_hex()),
            Self::DateTime(millis) => JsonValue::String(format_timestamp_millis(*millis)),
            Self::Array(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Document(document) => document.to_json(),
        }
    }

    /// Untruncated single-line text form: empty for null, timestamps for
    /// dates, compact JSON for containers, plain text for everything else.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Double(value) => value.to_string(),
            Self::String(value) | Self::Other { display: value, .. } => value.clone(),
            Self::ObjectId(id) => id.to_hex(),
            Self::DateTime(millis) => format_timestamp_millis(*millis),
            Self::Array(_) | Self::Document(_) => self.to_json().to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

#[must_use]
pub fn format_timestamp_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |timestamp| timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Schema-less record. Field order follows the store's order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(existing) = self
            .fields
            .iter_mut()
            .find(|(existing, _)| *existing == name)
        {
            existing.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn id(&self) -> Option<&FieldValue> {
        self.get(PRIMARY_KEY_FIELD)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            object.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(object)
    }
}

impl FromIterator<(String, FieldValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut document = Self::new();
        for (name, value) in iter {
            document.insert(name, value);
        }
        document
    }
}

/// Field names observed across `documents`, in first-seen order.
#[must_use]
pub fn field_set(documents: &[Document]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for document in documents {
        for name in document.field_names() {
            if !fields.iter().any(|known| known == name) {
                fields.push(name.to_string());
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::{field_set, format_timestamp_millis, Document, FieldValue, ObjectId};

    #[test]
    fn object_id_parses_only_canonical_hex() {
        let parsed = ObjectId::parse_canonical("65a1f0c2e4b0a1b2c3d4e5f6").expect("valid id");
        assert_eq!(parsed.to_hex(), "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(
            ObjectId::parse_canonical("65A1F0C2E4B0A1B2C3D4E5F6").map(|id| id.to_hex()),
            Some("65a1f0c2e4b0a1b2c3d4e5f6".to_string())
        );

        assert!(ObjectId::parse_canonical("65a1f0c2e4b0a1b2c3d4e5f").is_none());
        assert!(ObjectId::parse_canonical("zza1f0c2e4b0a1b2c3d4e5f6").is_none());
        assert!(ObjectId::parse_canonical("").is_none());
        assert!(ObjectId::parse_canonical("ééééééééééé").is_none());
    }

    #[test]
    fn display_text_follows_value_kind() {
        assert_eq!(FieldValue::Null.display_text(), "");
        assert_eq!(FieldValue::Bool(false).display_text(), "false");
        assert_eq!(FieldValue::Double(2.5).display_text(), "2.5");
        assert_eq!(
            FieldValue::DateTime(0).display_text(),
            "1970-01-01T00:00:00.000Z"
        );
        let nested = FieldValue::Document(
            Document::new()
                .with_field("city", FieldValue::String("Oslo".to_string()))
                .with_field("zip", FieldValue::Int(150)),
        );
        assert_eq!(nested.display_text(), r#"{"city":"Oslo","zip":150}"#);
        let array = FieldValue::Array(vec![FieldValue::Int(1), FieldValue::Null]);
        assert_eq!(array.display_text(), "[1,null]");
        let opaque = FieldValue::Other {
            display: "Timestamp(1, 2)".to_string(),
            raw: vec![0; 4],
        };
        assert_eq!(opaque.display_text(), "Timestamp(1, 2)");
        assert_eq!(opaque.type_name(), "other");
    }

    #[test]
    fn insert_replaces_existing_field_in_place() {
        let mut document = Document::new()
            .with_field("_id", FieldValue::Int(1))
            .with_field("name", FieldValue::String("a".to_string()));
        document.insert("name", FieldValue::String("b".to_string()));

        assert_eq!(document.len(), 2);
        assert_eq!(
            document.get("name"),
            Some(&FieldValue::String("b".to_string()))
        );
        assert_eq!(document.id(), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn field_set_keeps_first_seen_order_across_page() {
        let documents = vec![
            Document::new()
                .with_field("_id", FieldValue::Int(1))
                .with_field("name", FieldValue::Null),
            Document::new()
                .with_field("_id", FieldValue::Int(2))
                .with_field("email", FieldValue::Null)
                .with_field("name", FieldValue::Null),
        ];

        assert_eq!(field_set(&documents), vec!["_id", "name", "email"]);
        assert!(field_set(&[]).is_empty());
    }

    #[test]
    fn out_of_range_timestamps_fall_back_to_raw_millis() {
        assert_eq!(format_timestamp_millis(i64::MAX), i64::MAX.to_string());
    }
}
