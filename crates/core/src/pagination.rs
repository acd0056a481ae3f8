use std::ops::Range;

pub const PAGE_SIZE: u64 = 10;

pub const MIN_COLUMN_WIDTH: u16 = 15;
pub const MAX_COLUMN_WIDTH: u16 = 30;
/// Borders, padding and fixed UI text around the table.
pub const RESERVED_CHROME: u16 = 4;
pub const INTER_COLUMN_GAP: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    page_index: u64,
    total_count: u64,
}

impl Pagination {
    #[must_use]
    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(PAGE_SIZE)
    }

    #[must_use]
    pub fn last_page_index(&self) -> u64 {
        self.total_pages().saturating_sub(1)
    }

    #[must_use]
    pub fn skip(&self) -> u64 {
        self.page_index.saturating_mul(PAGE_SIZE)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page_index.saturating_add(1).saturating_mul(PAGE_SIZE) < self.total_count
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    /// True when the current page starts beyond the last matching document.
    #[must_use]
    pub fn is_past_end(&self) -> bool {
        self.total_count > 0 && self.skip() >= self.total_count
    }

    pub fn set_total_count(&mut self, total_count: u64) {
        self.total_count = total_count;
        if total_count == 0 {
            self.page_index = 0;
        }
    }

    /// Each navigation method returns whether the page index changed.
    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page_index += 1;
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.page_index -= 1;
        true
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to(0)
    }

    pub fn last_page(&mut self) -> bool {
        self.go_to(self.last_page_index())
    }

    pub fn reset(&mut self) {
        self.page_index = 0;
    }

    fn go_to(&mut self, page_index: u64) -> bool {
        let changed = self.page_index != page_index;
        self.page_index = page_index;
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub column_width: u16,
    pub visible_count: usize,
}

impl ColumnLayout {
    #[must_use]
    pub fn for_terminal_width(terminal_width: u16) -> Self {
        let available = terminal_width.saturating_sub(RESERVED_CHROME);
        let column_width = (available / 3).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
        let visible_count = usize::from(available / (column_width + INTER_COLUMN_GAP)).max(1);
        Self {
            column_width,
            visible_count,
        }
    }
}

/// Horizontal slice of the field set plus the selected column inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWindow {
    offset: usize,
    visible_count: usize,
    selected: usize,
}

impl Default for ColumnWindow {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ColumnWindow {
    #[must_use]
    pub fn new(visible_count: usize) -> Self {
        Self {
            offset: 0,
            visible_count: visible_count.max(1),
            selected: 0,
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Index into the field set of the selected column.
    #[must_use]
    pub fn selected_field_index(&self) -> usize {
        self.offset + self.selected
    }

    #[must_use]
    pub fn visible_range(&self, field_count: usize) -> Range<usize> {
        let start = self.offset.min(field_count);
        let end = (self.offset + self.visible_count).min(field_count);
        start..end
    }

    pub fn move_left(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        } else if self.offset > 0 {
            self.offset -= 1;
        }
    }

    pub fn move_right(&mut self, field_count: usize) {
        if self.selected < self.last_selectable(field_count) {
            self.selected += 1;
        } else if self.offset + self.visible_count < field_count {
            self.offset += 1;
        }
    }

    pub fn jump_first(&mut self) {
        self.offset = 0;
        self.selected = 0;
    }

    pub fn jump_last(&mut self, field_count: usize) {
        self.offset = field_count.saturating_sub(self.visible_count);
        self.selected = self.last_selectable(field_count);
    }

    /// Re-establishes the window invariants after the terminal width or the
    /// field set changed.
    pub fn reconcile(&mut self, field_count: usize, visible_count: usize) {
        self.visible_count = visible_count.max(1);
        self.offset = self
            .offset
            .min(field_count.saturating_sub(self.visible_count));
        self.selected = self
            .selected
            .min(self.visible_count - 1)
            .min(self.last_selectable(field_count));
    }

    fn last_selectable(&self, field_count: usize) -> usize {
        field_count
            .saturating_sub(self.offset)
            .min(self.visible_count)
            .saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowSelection {
    selected: usize,
}

impl RowSelection {
    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self, row_count: usize) {
        self.selected = (self.selected + 1).min(row_count.saturating_sub(1));
    }

    pub fn reset(&mut self) {
        self.selected = 0;
    }

    pub fn clamp(&mut self, row_count: usize) {
        self.selected = self.selected.min(row_count.saturating_sub(1));
    }
}
