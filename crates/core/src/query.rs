use std::fmt;

use crate::coercion::coerce_literal;
use crate::document::{FieldValue, ObjectId, PRIMARY_KEY_FIELD};

pub const ALL_FIELDS_LABEL: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    Field(String),
    AllFields,
}

impl SearchScope {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Field(field) => field,
            Self::AllFields => ALL_FIELDS_LABEL,
        }
    }

    /// Next scope in `field_set` order, wrapping through "all fields".
    #[must_use]
    pub fn cycle(&self, field_set: &[String]) -> Self {
        let next_index = match self {
            Self::AllFields => 0,
            Self::Field(field) => field_set
                .iter()
                .position(|known| known == field)
                .map_or(0, |index| index + 1),
        };
        field_set
            .get(next_index)
            .map_or(Self::AllFields, |field| Self::Field(field.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Equals(FieldValue),
    /// Case-insensitive substring match on the field's text.
    Contains(String),
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(FieldValue::String(text)) => write!(f, "= \"{text}\""),
            Self::Equals(value) => write!(f, "= {value}"),
            Self::Contains(text) => write!(f, "~ \"{text}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub field: String,
    pub matcher: Matcher,
}

impl fmt::Display for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.matcher)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum QuerySpec {
    #[default]
    All,
    Field(FieldPredicate),
    /// Logical OR of the predicates.
    AnyOf(Vec<FieldPredicate>),
}

impl QuerySpec {
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all documents"),
            Self::Field(predicate) => write!(f, "{predicate}"),
            Self::AnyOf(predicates) => match predicates.first() {
                Some(first) => write!(f, "any field {}", first.matcher),
                None => f.write_str("no fields"),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    #[must_use]
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Ascending => "↑",
            Self::Descending => "↓",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: PRIMARY_KEY_FIELD.to_string(),
            direction: SortDirection::Ascending,
        }
    }
}

impl SortSpec {
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn toggle_direction(&mut self) {
        self.direction = self.direction.toggled();
    }
}

/// Builds the store query for a search submitted against `scope`.
///
/// Never fails: malformed identifier literals fall back to substring matching.
#[must_use]
pub fn build_query(field_set: &[String], scope: &SearchScope, raw: &str) -> QuerySpec {
    if raw.trim().is_empty() {
        return QuerySpec::All;
    }

    match scope {
        SearchScope::Field(field) => QuerySpec::Field(field_predicate(field, raw)),
        SearchScope::AllFields if field_set.is_empty() => {
            QuerySpec::Field(field_predicate(PRIMARY_KEY_FIELD, raw))
        }
        SearchScope::AllFields => QuerySpec::AnyOf(
            field_set
                .iter()
                .map(|field| field_predicate(field, raw))
                .collect(),
        ),
    }
}

/// Primary keys try the canonical identifier form first; other inputs go
/// through literal coercion, with strings matched as substrings.
#[must_use]
pub fn field_predicate(field: &str, raw: &str) -> FieldPredicate {
    let identifier = (field == PRIMARY_KEY_FIELD)
        .then(|| ObjectId::parse_canonical(raw.trim()))
        .flatten();

    let matcher = match identifier {
        Some(id) => Matcher::Equals(FieldValue::ObjectId(id)),
        None => match coerce_literal(raw) {
            FieldValue::String(text) => Matcher::Contains(text),
            literal => Matcher::Equals(literal),
        },
    };

    FieldPredicate {
        field: field.to_string(),
        matcher,
    }
}
