//! Projection of the browser state into display cells.

use crate::browser::DocumentBrowser;
use crate::document::FieldValue;
use crate::query::SortDirection;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub field: String,
    pub label: String,
    pub sorted: Option<SortDirection>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub column_width: u16,
    pub header: Vec<HeaderCell>,
    pub rows: Vec<TableRow>,
    /// Position of the selected column inside `header`, if any column shows.
    pub selected_column: Option<usize>,
}

impl TableView {
    #[must_use]
    pub fn project(browser: &DocumentBrowser) -> Self {
        let column_width = browser.layout().column_width;
        let width = usize::from(column_width);
        let visible = browser.visible_fields();
        let selected_column = (!visible.is_empty()).then(|| browser.window().selected());
        let sort = browser.sort();

        let header = visible
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let sorted = (sort.field == *field).then_some(sort.direction);
                let label = match sorted {
                    Some(direction) => format!("{field} {}", direction.indicator()),
                    None => field.clone(),
                };
                HeaderCell {
                    field: field.clone(),
                    label: truncate_with_ellipsis(&label, width),
                    sorted,
                    selected: selected_column == Some(index),
                }
            })
            .collect();

        let rows = browser
            .documents()
            .iter()
            .enumerate()
            .map(|(index, document)| TableRow {
                cells: visible
                    .iter()
                    .map(|field| cell_text(document.get(field), width))
                    .collect(),
                selected: index == browser.selected_row(),
            })
            .collect();

        Self {
            column_width,
            header,
            rows,
            selected_column,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Single-line cell text for `value`, cut to `width` columns. Missing
/// fields and nulls render empty.
#[must_use]
pub fn cell_text(value: Option<&FieldValue>, width: usize) -> String {
    let text = value.map(FieldValue::display_text).unwrap_or_default();
    let flattened: String = text
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect();
    truncate_with_ellipsis(&flattened, width)
}

/// Cuts `text` to at most `width` terminal columns, ending in [`ELLIPSIS`]
/// when anything was dropped. Wide characters count as two columns.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let budget = width.saturating_sub(ELLIPSIS.width().unwrap_or(1));
    let mut used = 0;
    let mut truncated = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        used += ch_width;
        truncated.push(ch);
    }
    truncated.push(ELLIPSIS);
    truncated
}
