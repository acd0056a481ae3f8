use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use leaf_core::browser::BrowserKey;

use crate::app::Msg;

/// `Ctrl+C` quits from anywhere; every other key is forwarded to the active
/// screen.
#[must_use]
pub fn map_key_event(key: KeyEvent) -> Option<Msg> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c' | 'C')).then_some(Msg::Quit);
    }

    let key = match key.code {
        KeyCode::Char(ch) => BrowserKey::Char(ch),
        KeyCode::Enter => BrowserKey::Enter,
        KeyCode::Esc => BrowserKey::Escape,
        KeyCode::Backspace => BrowserKey::Backspace,
        KeyCode::Tab => BrowserKey::Tab,
        KeyCode::Up => BrowserKey::Up,
        KeyCode::Down => BrowserKey::Down,
        KeyCode::Left => BrowserKey::Left,
        KeyCode::Right => BrowserKey::Right,
        KeyCode::PageUp => BrowserKey::PageUp,
        KeyCode::PageDown => BrowserKey::PageDown,
        _ => return None,
    };
    Some(Msg::Key(key))
}
