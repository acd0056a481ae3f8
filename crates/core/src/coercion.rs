use crate::document::FieldValue;

/// Turns operator input into a typed literal.
///
/// `true`/`false` (any case) become booleans, text that parses fully as a
/// finite number becomes numeric, and everything else stays a string. The
/// function is total: there is no input it rejects.
#[must_use]
pub fn coerce_literal(raw: &str) -> FieldValue {
    if raw.eq_ignore_ascii_case("true") {
        return FieldValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return FieldValue::Bool(false);
    }

    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        if let Ok(integer) = trimmed.parse::<i64>() {
            return FieldValue::Int(integer);
        }
        if let Ok(number) = trimmed.parse::<f64>() {
            if number.is_finite() {
                return FieldValue::Double(number);
            }
        }
    }

    FieldValue::String(raw.to_string())
}
