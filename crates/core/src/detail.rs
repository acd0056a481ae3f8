use crate::document::FieldValue;

pub const DETAIL_WRAP_WIDTH: usize = 80;

/// Pretty-printed, untruncated form of one field value, hard-wrapped at
/// `width` columns.
#[must_use]
pub fn format_detail(value: &FieldValue, width: usize) -> Vec<String> {
    let pretty = serde_json::to_string_pretty(&value.to_json())
        .unwrap_or_else(|_| value.display_text());
    pretty
        .lines()
        .flat_map(|line| wrap_line(line, width))
        .collect()
}

/// Splits `line` into pieces of at most `width` characters. Escape
/// sequences such as `\n` or `\u00e9` are never split. Continuation pieces
/// repeat the line's leading indentation.
#[must_use]
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let indent: String = line.chars().take_while(|ch| *ch == ' ').collect();
    let indent_len = indent.len();
    let continuation_width = if indent_len < width / 2 {
        width - indent_len
    } else {
        width
    };
    let continuation_indent = if continuation_width == width {
        ""
    } else {
        indent.as_str()
    };

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut limit = width;

    for unit in escape_units(line) {
        let unit_len = unit.chars().count();
        if current_len + unit_len > limit && current_len > 0 {
            pieces.push(std::mem::take(&mut current));
            current.push_str(continuation_indent);
            current_len = 0;
            limit = continuation_width;
        }
        current.push_str(unit);
        current_len += unit_len;
    }
    if current_len > 0 || pieces.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Breaks serialized text into slices that must stay on one line.
fn escape_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let mut end = start + ch.len_utf8();
        if ch == '\\' {
            if let Some((index, escaped)) = chars.next() {
                end = index + escaped.len_utf8();
                if escaped == 'u' {
                    for _ in 0..4 {
                        let Some(&(index, hex)) = chars.peek() else {
                            break;
                        };
                        if !hex.is_ascii_hexdigit() {
                            break;
                        }
                        end = index + hex.len_utf8();
                        chars.next();
                    }
                }
            }
        }
        units.push(&text[start..end]);
    }
    units
}
