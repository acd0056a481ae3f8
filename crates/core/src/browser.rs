//! Interactive document browser for one collection.
//!
//! The browser is a synchronous state machine. Key presses and completed
//! store calls go in; [`BrowserEffect`]s come out and are executed by the
//! caller, which feeds the outcome back through [`DocumentBrowser::apply_load`]
//! or [`DocumentBrowser::apply_mutation`]. Loads are tagged with a
//! [`RequestToken`] so that only the most recently issued one is applied.

use thiserror::Error;
use tracing::debug;

use crate::document::{field_set, Document, FieldValue, PRIMARY_KEY_FIELD};
use crate::mutation::{MutationCommand, MutationResponse};
use crate::pagination::{ColumnLayout, ColumnWindow, Pagination, RowSelection, PAGE_SIZE};
use crate::query::{build_query, QuerySpec, SearchScope, SortSpec};
use crate::sequencer::{LoadRequest, LoadResponse, RequestSequencer};

pub const DEFAULT_TERMINAL_WIDTH: u16 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKey {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewMode {
    Browse,
    Search {
        scope: SearchScope,
        input: String,
    },
    /// Field-name entry phase of an edit.
    EditField {
        document_id: FieldValue,
        field: String,
    },
    /// Value entry phase of an edit. `submitting` is set while the write is
    /// in flight; no input is accepted until it completes.
    EditValue {
        document_id: FieldValue,
        field: String,
        value: String,
        submitting: bool,
    },
    Detail {
        field: String,
        value: FieldValue,
        scroll: u16,
    },
    DeleteConfirm {
        document_id: FieldValue,
        submitting: bool,
    },
}

impl ViewMode {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Browse => "Browse",
            Self::Search { .. } => "Search",
            Self::EditField { .. } => "Edit field",
            Self::EditValue { .. } => "Edit value",
            Self::Detail { .. } => "Detail",
            Self::DeleteConfirm { .. } => "Delete",
        }
    }

    #[must_use]
    pub fn is_browse(&self) -> bool {
        matches!(self, Self::Browse)
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(
            self,
            Self::EditValue {
                submitting: true,
                ..
            } | Self::DeleteConfirm {
                submitting: true,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserEffect {
    Load(LoadRequest),
    Mutate(MutationCommand),
    /// Escape in browse mode: hand control back to the parent view.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    #[error("failed to load documents: {0}")]
    Load(String),
    #[error("failed to {operation} document: {message}")]
    Mutation {
        operation: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Loading,
    Ready,
    Error(BrowserError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserOptions {
    pub read_only: bool,
    pub terminal_width: u16,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            terminal_width: DEFAULT_TERMINAL_WIDTH,
        }
    }
}

#[derive(Debug)]
pub struct DocumentBrowser {
    collection: String,
    read_only: bool,
    mode: ViewMode,
    documents: Vec<Document>,
    fields: Vec<String>,
    pagination: Pagination,
    sort: SortSpec,
    query: QuerySpec,
    layout: ColumnLayout,
    window: ColumnWindow,
    rows: RowSelection,
    sequencer: RequestSequencer,
    status: PageStatus,
    notice: Option<String>,
}

impl DocumentBrowser {
    #[must_use]
    pub fn new(collection: impl Into<String>, options: BrowserOptions) -> Self {
        let layout = ColumnLayout::for_terminal_width(options.terminal_width);
        Self {
            collection: collection.into(),
            read_only: options.read_only,
            mode: ViewMode::Browse,
            documents: Vec::new(),
            fields: Vec::new(),
            pagination: Pagination::default(),
            sort: SortSpec::default(),
            query: QuerySpec::All,
            layout,
            window: ColumnWindow::new(layout.visible_count),
            rows: RowSelection::default(),
            sequencer: RequestSequencer::new(),
            status: PageStatus::Loading,
            notice: None,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn visible_fields(&self) -> &[String] {
        &self.fields[self.window.visible_range(self.fields.len())]
    }

    #[must_use]
    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    #[must_use]
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    #[must_use]
    pub fn query(&self) -> &QuerySpec {
        &self.query
    }

    #[must_use]
    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }

    #[must_use]
    pub fn window(&self) -> &ColumnWindow {
        &self.window
    }

    #[must_use]
    pub fn selected_row(&self) -> usize {
        self.rows.selected()
    }

    #[must_use]
    pub fn status(&self) -> &PageStatus {
        &self.status
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn selected_document(&self) -> Option<&Document> {
        self.documents.get(self.rows.selected())
    }

    #[must_use]
    pub fn selected_field(&self) -> Option<&str> {
        self.fields
            .get(self.window.selected_field_index())
            .map(String::as_str)
    }

    /// Issues a load for the current query, sort and page.
    pub fn reload(&mut self) -> BrowserEffect {
        let token = self.sequencer.mint();
        self.status = PageStatus::Loading;
        let request = LoadRequest {
            token,
            query: self.query.clone(),
            sort: self.sort.clone(),
            page_index: self.pagination.page_index(),
            skip: self.pagination.skip(),
            limit: PAGE_SIZE,
        };
        debug!(
            token = token.value(),
            collection = %self.collection,
            page = request.page_index,
            query = %request.query,
            "issuing page load"
        );
        BrowserEffect::Load(request)
    }

    pub fn set_terminal_width(&mut self, terminal_width: u16) {
        let layout = ColumnLayout::for_terminal_width(terminal_width);
        if layout == self.layout {
            return;
        }
        self.layout = layout;
        self.window
            .reconcile(self.fields.len(), self.layout.visible_count);
    }

    /// Applies a finished load. Responses for anything but the latest token
    /// are dropped. May return a follow-up load when the page fell past the
    /// end of the result set.
    pub fn apply_load(&mut self, response: LoadResponse) -> Option<BrowserEffect> {
        if !self.sequencer.is_current(response.token) {
            debug!(
                token = response.token.value(),
                "discarding stale page load"
            );
            return None;
        }

        match response.result {
            Ok(snapshot) => {
                self.pagination.set_total_count(snapshot.total_count);
                if snapshot.documents.is_empty() && self.pagination.is_past_end() {
                    self.pagination.last_page();
                    self.rows.reset();
                    return Some(self.reload());
                }

                self.documents = snapshot.documents;
                self.fields = field_set(&self.documents);
                self.window
                    .reconcile(self.fields.len(), self.layout.visible_count);
                self.rows.clamp(self.documents.len());
                self.status = PageStatus::Ready;
                None
            }
            Err(error) => {
                tracing::warn!(%error, collection = %self.collection, "page load failed");
                self.status = PageStatus::Error(BrowserError::Load(error.message().to_string()));
                None
            }
        }
    }

    /// Applies a finished edit or delete and, on success, reloads the page.
    pub fn apply_mutation(&mut self, response: MutationResponse) -> Option<BrowserEffect> {
        self.mode = ViewMode::Browse;
        match response.result {
            Ok(()) => {
                self.notice = Some(match &response.command {
                    MutationCommand::Update { field, .. } => format!("Updated `{field}`"),
                    MutationCommand::Delete { id } => format!("Deleted document {id}"),
                });
                Some(self.reload())
            }
            Err(error) => {
                tracing::warn!(
                    %error,
                    operation = response.command.operation(),
                    "document mutation failed"
                );
                self.status = PageStatus::Error(BrowserError::Mutation {
                    operation: response.command.operation(),
                    message: error.message().to_string(),
                });
                None
            }
        }
    }

    pub fn handle_key(&mut self, key: BrowserKey) -> Option<BrowserEffect> {
        if self.mode.is_submitting() {
            return None;
        }

        if key == BrowserKey::Escape {
            if self.mode.is_browse() {
                return Some(BrowserEffect::Exit);
            }
            self.mode = ViewMode::Browse;
            return None;
        }

        match self.mode {
            ViewMode::Browse => self.handle_browse_key(key),
            ViewMode::Search { .. } => self.handle_search_key(key),
            ViewMode::EditField { .. } => {
                self.handle_edit_field_key(key);
                None
            }
            ViewMode::EditValue { .. } => self.handle_edit_value_key(key),
            ViewMode::Detail { .. } => {
                self.handle_detail_key(key);
                None
            }
            ViewMode::DeleteConfirm { .. } => self.handle_delete_key(key),
        }
    }

    fn handle_browse_key(&mut self, key: BrowserKey) -> Option<BrowserEffect> {
        self.notice = None;
        match key {
            BrowserKey::Up => self.rows.move_up(),
            BrowserKey::Down => self.rows.move_down(self.documents.len()),
            BrowserKey::Left => self.window.move_left(),
            BrowserKey::Right => self.window.move_right(self.fields.len()),
            BrowserKey::Char('[') => self.window.jump_first(),
            BrowserKey::Char(']') => self.window.jump_last(self.fields.len()),
            BrowserKey::PageDown => return self.change_page(Pagination::next_page),
            BrowserKey::PageUp => return self.change_page(Pagination::previous_page),
            BrowserKey::Char('f') => return self.change_page(Pagination::first_page),
            BrowserKey::Char('l') => return self.change_page(Pagination::last_page),
            BrowserKey::Char('o') => {
                self.sort.toggle_direction();
                return Some(self.reload());
            }
            BrowserKey::Char('O') => {
                let field = self.selected_field()?.to_string();
                self.sort = SortSpec::ascending(field);
                self.pagination.reset();
                self.rows.reset();
                return Some(self.reload());
            }
            BrowserKey::Char('r') => return Some(self.reload()),
            BrowserKey::Char('s') => {
                let scope = self
                    .selected_field()
                    .map_or(SearchScope::AllFields, |field| {
                        SearchScope::Field(field.to_string())
                    });
                self.mode = ViewMode::Search {
                    scope,
                    input: String::new(),
                };
            }
            BrowserKey::Char('g') => {
                self.mode = ViewMode::Search {
                    scope: SearchScope::AllFields,
                    input: String::new(),
                };
            }
            BrowserKey::Char('e') => self.begin_edit(),
            BrowserKey::Char('d') => self.begin_delete(),
            BrowserKey::Enter => self.open_detail(),
            _ => {}
        }
        None
    }

    fn change_page(&mut self, navigate: fn(&mut Pagination) -> bool) -> Option<BrowserEffect> {
        if !navigate(&mut self.pagination) {
            return None;
        }
        self.rows.reset();
        Some(self.reload())
    }

    fn selected_document_id(&self) -> Option<FieldValue> {
        self.selected_document()
            .and_then(Document::id)
            .cloned()
    }

    fn begin_edit(&mut self) {
        if self.read_only {
            self.notice = Some("Read-only session: editing is disabled".to_string());
            return;
        }
        if let Some(document_id) = self.selected_document_id() {
            self.mode = ViewMode::EditField {
                document_id,
                field: String::new(),
            };
        }
    }

    fn begin_delete(&mut self) {
        if self.read_only {
            self.notice = Some("Read-only session: deleting is disabled".to_string());
            return;
        }
        if let Some(document_id) = self.selected_document_id() {
            self.mode = ViewMode::DeleteConfirm {
                document_id,
                submitting: false,
            };
        }
    }

    fn open_detail(&mut self) {
        let (Some(document), Some(field)) = (self.selected_document(), self.selected_field())
        else {
            return;
        };
        let value = document.get(field).cloned().unwrap_or(FieldValue::Null);
        self.mode = ViewMode::Detail {
            field: field.to_string(),
            value,
            scroll: 0,
        };
    }

    fn handle_search_key(&mut self, key: BrowserKey) -> Option<BrowserEffect> {
        let ViewMode::Search { scope, input } = &mut self.mode else {
            return None;
        };
        match key {
            BrowserKey::Enter => {
                self.query = build_query(&self.fields, scope, input);
                self.mode = ViewMode::Browse;
                self.pagination.reset();
                self.rows.reset();
                Some(self.reload())
            }
            BrowserKey::Tab => {
                *scope = scope.cycle(&self.fields);
                None
            }
            key => {
                edit_buffer(input, key);
                None
            }
        }
    }

    fn handle_edit_field_key(&mut self, key: BrowserKey) {
        let ViewMode::EditField { document_id, field } = &mut self.mode else {
            return;
        };
        if key != BrowserKey::Enter {
            edit_buffer(field, key);
            return;
        }

        let field = field.trim().to_string();
        if field.is_empty() {
            return;
        }
        if field == PRIMARY_KEY_FIELD {
            self.notice = Some(format!("`{PRIMARY_KEY_FIELD}` cannot be edited"));
            return;
        }

        let document_id = document_id.clone();
        let value = self
            .documents
            .iter()
            .find(|document| document.id() == Some(&document_id))
            .and_then(|document| document.get(&field))
            .map(editable_text)
            .unwrap_or_default();
        self.notice = None;
        self.mode = ViewMode::EditValue {
            document_id,
            field,
            value,
            submitting: false,
        };
    }

    fn handle_edit_value_key(&mut self, key: BrowserKey) -> Option<BrowserEffect> {
        let ViewMode::EditValue {
            document_id,
            field,
            value,
            submitting,
        } = &mut self.mode
        else {
            return None;
        };
        if key != BrowserKey::Enter {
            edit_buffer(value, key);
            return None;
        }

        *submitting = true;
        let command = MutationCommand::edit(document_id.clone(), field.clone(), value);
        debug!(field = %field, "submitting field update");
        Some(BrowserEffect::Mutate(command))
    }

    fn handle_detail_key(&mut self, key: BrowserKey) {
        let ViewMode::Detail { scroll, .. } = &mut self.mode else {
            return;
        };
        match key {
            BrowserKey::Up => *scroll = scroll.saturating_sub(1),
            BrowserKey::Down => *scroll = scroll.saturating_add(1),
            _ => {}
        }
    }

    fn handle_delete_key(&mut self, key: BrowserKey) -> Option<BrowserEffect> {
        let ViewMode::DeleteConfirm {
            document_id,
            submitting,
        } = &mut self.mode
        else {
            return None;
        };
        match key {
            BrowserKey::Char('y' | 'Y') => {
                *submitting = true;
                debug!(id = %document_id, "submitting delete");
                Some(BrowserEffect::Mutate(MutationCommand::delete(
                    document_id.clone(),
                )))
            }
            BrowserKey::Char('n' | 'N') => {
                self.mode = ViewMode::Browse;
                None
            }
            _ => None,
        }
    }
}

fn edit_buffer(buffer: &mut String, key: BrowserKey) {
    match key {
        BrowserKey::Char(ch) if !ch.is_control() => buffer.push(ch),
        BrowserKey::Backspace => {
            buffer.pop();
        }
        _ => {}
    }
}

/// Text used to pre-fill the value editor.
fn editable_text(value: &FieldValue) -> String {
    value.display_text()
}
