//! Terminal front end: screens, key handling and the event loop that feeds
//! driver results back into the browser.

mod app;
mod executor;
mod keymap;
mod render;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use thiserror::Error;
use tracing::{debug, info};

pub use app::TuiOptions;

use app::{Msg, TuiApp};
use executor::Executor;
use keymap::map_key_event;
use render::render;

const TICK_RATE: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

pub fn run(options: TuiOptions) -> Result<(), TuiError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("leaf-worker")
        .build()
        .map_err(TuiError::Runtime)?;
    let mut executor = Executor::new(runtime);

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &mut executor, options);
    let restore_result = restore_terminal(&mut terminal);
    executor.shutdown();

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    executor: &mut Executor,
    options: TuiOptions,
) -> Result<(), TuiError> {
    let width = terminal.size()?.width;
    let mut app = TuiApp::new(options, width);
    info!(width, "event loop started");

    loop {
        terminal.draw(|frame| render(frame, &app))?;

        let deadline = Instant::now() + TICK_RATE;
        while let Some(timeout) = deadline.checked_duration_since(Instant::now()) {
            if !event::poll(timeout)? {
                break;
            }
            let message = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => map_key_event(key),
                Event::Resize(width, _) => Some(Msg::Resize(width)),
                _ => None,
            };
            if let Some(message) = message {
                dispatch(&mut app, executor, message);
                break;
            }
        }

        while let Some(completion) = executor.try_next() {
            if let Some(message) = executor.absorb(completion) {
                dispatch(&mut app, executor, message);
            }
        }

        if app.should_quit() {
            debug!("quit requested");
            break;
        }
    }

    Ok(())
}

fn dispatch(app: &mut TuiApp, executor: &mut Executor, message: Msg) {
    for command in app.handle(message) {
        executor.execute(command);
    }
}
