use leaf_core::browser::{DocumentBrowser, PageStatus, ViewMode};
use leaf_core::detail::{format_detail, DETAIL_WRAP_WIDTH};
use leaf_core::table_view::TableView;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::app::{ListStatus, PickList, Screen, TuiApp};

const BROWSE_HELP: &str = "↑↓←→ move  PgUp/PgDn page  f/l first/last page  [/] first/last column  \
o/O sort  s/g search  e edit  d delete  Enter detail  r reload  Esc back";

pub(crate) fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let footer_height = if matches!(app.screen(), Screen::Documents { .. }) {
        5
    } else {
        3
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(footer_height),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.screen().name()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(app.location()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("leaf"));
    frame.render_widget(header, chunks[0]);

    match app.screen() {
        Screen::Connect {
            url,
            connecting,
            error,
        } => render_connect(frame, chunks[1], url, *connecting, error.as_deref()),
        Screen::Databases(list) => render_pick_list(frame, chunks[1], "Databases", list),
        Screen::Collections { database, list } => {
            render_pick_list(frame, chunks[1], &format!("Collections in {database}"), list);
        }
        Screen::Documents { browser, .. } => {
            render_documents(frame, chunks[1], browser);
            render_browser_footer(frame, chunks[2], browser);
            return;
        }
    }

    let footer = Paragraph::new(vec![Line::from(format!("Status: {}", app.status_line()))])
        .block(Block::default().borders(Borders::ALL).title("Ctrl+C quit"));
    frame.render_widget(footer, chunks[2]);
}

fn render_connect(
    frame: &mut Frame<'_>,
    area: Rect,
    url: &str,
    connecting: bool,
    error: Option<&str>,
) {
    let mut lines = vec![
        Line::from("Connection URL"),
        Line::from(format!("> {url}_")),
        Line::from(""),
        Line::from(if connecting {
            "Connecting..."
        } else {
            "Enter: connect  Esc: quit"
        }),
    ];
    if let Some(error) = error {
        lines.push(Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        )));
    }
    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Connect"));
    frame.render_widget(body, area);
}

fn render_pick_list(frame: &mut Frame<'_>, area: Rect, title: &str, list: &PickList) {
    let lines = match list.status() {
        ListStatus::Loading => vec![Line::from("Loading...")],
        ListStatus::Error(error) => vec![Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        ))],
        ListStatus::Ready if list.items().is_empty() => {
            vec![Line::from(if title == "Databases" {
                "No databases found"
            } else {
                "No collections found"
            })]
        }
        ListStatus::Ready => {
            let visible = usize::from(area.height.saturating_sub(2)).max(1);
            let start = list.selected().saturating_sub(visible.saturating_sub(1));
            list.items()
                .iter()
                .enumerate()
                .skip(start)
                .take(visible)
                .map(|(index, item)| {
                    if index == list.selected() {
                        Line::from(Span::styled(
                            format!("> {item}"),
                            Style::default().add_modifier(Modifier::REVERSED),
                        ))
                    } else {
                        Line::from(format!("  {item}"))
                    }
                })
                .collect()
        }
    };
    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{title}  (Enter open, r refresh, Esc back)")),
    );
    frame.render_widget(body, area);
}

fn render_documents(frame: &mut Frame<'_>, area: Rect, browser: &DocumentBrowser) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(browser.collection().to_string());

    if let ViewMode::Detail {
        field,
        value,
        scroll,
    } = browser.mode()
    {
        let lines: Vec<Line<'_>> = format_detail(value, DETAIL_WRAP_WIDTH)
            .into_iter()
            .map(Line::from)
            .collect();
        let detail = Paragraph::new(lines)
            .scroll((*scroll, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{field} ({})", value.type_name())),
            );
        frame.render_widget(detail, area);
        return;
    }

    let view = TableView::project(browser);
    if view.is_empty() {
        let message = match browser.status() {
            PageStatus::Loading => "Loading...",
            _ => "No documents found",
        };
        frame.render_widget(Paragraph::new(message).block(block), area);
        return;
    }

    let selected_style = Style::default().add_modifier(Modifier::REVERSED);
    let header = Row::new(view.header.iter().map(|cell| {
        let style = Style::default().add_modifier(Modifier::BOLD);
        let style = if cell.selected {
            style.fg(Color::Yellow)
        } else {
            style
        };
        Cell::from(cell.label.clone()).style(style)
    }));
    let rows = view.rows.iter().map(|row| {
        Row::new(row.cells.iter().enumerate().map(|(index, text)| {
            let cell = Cell::from(text.clone());
            if row.selected && view.selected_column == Some(index) {
                cell.style(selected_style)
            } else {
                cell
            }
        }))
        .style(if row.selected {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
    });
    let widths = vec![Constraint::Length(view.column_width); view.header.len()];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(block);
    frame.render_widget(table, area);
}

fn render_browser_footer(frame: &mut Frame<'_>, area: Rect, browser: &DocumentBrowser) {
    let pagination = browser.pagination();
    let mut summary = format!(
        "Page {} of {} | {} documents | sort {} {}",
        pagination.page_index() + 1,
        pagination.total_pages().max(1),
        pagination.total_count(),
        browser.sort().field,
        browser.sort().direction.indicator(),
    );
    if !browser.query().is_all() {
        summary.push_str(&format!(" | Filtering by: {}", browser.query()));
    }
    if browser.is_read_only() {
        summary.push_str(" | read-only");
    }

    let prompt = match browser.mode() {
        ViewMode::Browse => BROWSE_HELP.to_string(),
        ViewMode::Search { scope, input } => {
            format!("Search {}: {input}_   (Tab scope, Enter apply, Esc cancel)", scope.label())
        }
        ViewMode::EditField { field, .. } => {
            format!("Field to edit: {field}_   (Enter next, Esc cancel)")
        }
        ViewMode::EditValue {
            field,
            value,
            submitting,
            ..
        } => {
            if *submitting {
                format!("Saving {field}...")
            } else {
                format!("New value for {field}: {value}_   (Enter save, Esc cancel)")
            }
        }
        ViewMode::Detail { .. } => "↑↓ scroll  Esc back".to_string(),
        ViewMode::DeleteConfirm {
            document_id,
            submitting,
        } => {
            if *submitting {
                format!("Deleting {document_id}...")
            } else {
                format!("Delete document {document_id}? (y/n)")
            }
        }
    };

    let status = match browser.status() {
        PageStatus::Error(error) => Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )),
        PageStatus::Loading => Line::from("Loading..."),
        PageStatus::Ready => Line::from(browser.notice().unwrap_or_default().to_string()),
    };

    let footer = Paragraph::new(vec![Line::from(summary), Line::from(prompt), status])
        .block(Block::default().borders(Borders::ALL).title(browser.mode().name()));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use leaf_core::browser::BrowserKey;
    use leaf_core::document::{Document, FieldValue};
    use leaf_core::sequencer::{LoadResponse, PageSnapshot};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::render;
    use crate::app::{Command, ConnectedInfo, Msg, TuiApp, TuiOptions};

    fn draw(app: &TuiApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 24)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, app))
            .expect("draw should succeed");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app() -> TuiApp {
        TuiApp::new(
            TuiOptions {
                url: "mongodb://localhost:27017".to_string(),
                profile: None,
                read_only: false,
            },
            120,
        )
    }

    fn browsing_app() -> TuiApp {
        let mut app = app();
        let commands = app.handle(Msg::Key(BrowserKey::Enter));
        let Some(Command::Connect(profile)) = commands.into_iter().next() else {
            panic!("expected connect");
        };
        app.handle(Msg::Connected(Ok(ConnectedInfo {
            profile,
            latency: Duration::from_millis(2),
        })));
        app.handle(Msg::DatabasesLoaded(Ok(vec!["shop".to_string()])));
        app.handle(Msg::Key(BrowserKey::Enter));
        app.handle(Msg::CollectionsLoaded {
            database: "shop".to_string(),
            result: Ok(vec!["people".to_string()]),
        });
        let commands = app.handle(Msg::Key(BrowserKey::Enter));
        let Some(Command::Load(request)) = commands.into_iter().nth(1) else {
            panic!("expected load");
        };
        app.handle(Msg::PageLoaded(LoadResponse {
            token: request.token,
            result: Ok(PageSnapshot {
                documents: vec![
                    Document::new()
                        .with_field("_id", FieldValue::Int(1))
                        .with_field("name", FieldValue::String("Ada".to_string())),
                    Document::new()
                        .with_field("_id", FieldValue::Int(2))
                        .with_field("name", FieldValue::String("Grace".to_string())),
                ],
                total_count: 2,
            }),
        }));
        app
    }

    #[test]
    fn connect_screen_shows_url() {
        let screen = draw(&app());
        assert!(screen.contains("mongodb://localhost:27017"));
        assert!(screen.contains("Enter: connect"));
    }

    #[test]
    fn documents_screen_shows_table_and_pagination() {
        let screen = draw(&browsing_app());
        assert!(screen.contains("_id ↑"));
        assert!(screen.contains("Grace"));
        assert!(screen.contains("Page 1 of 1 | 2 documents"));
        assert!(screen.contains("localhost:27017 / shop / people"));
    }

    #[test]
    fn search_prompt_and_filter_are_shown() {
        let mut app = browsing_app();
        app.handle(Msg::Key(BrowserKey::Char('g')));
        for ch in "ada".chars() {
            app.handle(Msg::Key(BrowserKey::Char(ch)));
        }
        assert!(draw(&app).contains("Search *: ada_"));

        app.handle(Msg::Key(BrowserKey::Enter));
        assert!(draw(&app).contains("Filtering by: any field ~ \"ada\""));
    }

    #[test]
    fn detail_view_pretty_prints_value() {
        let mut app = browsing_app();
        app.handle(Msg::Key(BrowserKey::Right));
        app.handle(Msg::Key(BrowserKey::Enter));
        let screen = draw(&app);
        assert!(screen.contains("name (string)"));
        assert!(screen.contains("\"Ada\""));
    }

    #[test]
    fn delete_confirmation_prompt_names_document() {
        let mut app = browsing_app();
        app.handle(Msg::Key(BrowserKey::Down));
        app.handle(Msg::Key(BrowserKey::Char('d')));
        assert!(draw(&app).contains("Delete document 2? (y/n)"));
    }
}
