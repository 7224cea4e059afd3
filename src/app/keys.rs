use crate::log_debug;
use crate::session::{Effect, SessionController};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Lines moved per PgUp/PgDn.
pub(super) const PAGE_LINES: u16 = 10;

#[derive(Debug)]
pub(super) enum KeyOutcome {
    Continue(Vec<Effect>),
    Quit,
}

/// Interpret one keystroke against the controller.
pub(super) fn handle_key(ctrl: &mut SessionController, key: KeyEvent) -> KeyOutcome {
    if key.kind == KeyEventKind::Release {
        return KeyOutcome::Continue(Vec::new());
    }
    let ctrl_held = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl_held {
        log_debug(&format!("key: ctrl+{:?}", key.code));
    }

    let effects = match key.code {
        KeyCode::Char('c') if ctrl_held => return KeyOutcome::Quit,
        KeyCode::Char('s') if ctrl_held => vec![ctrl.toggle()],
        KeyCode::Char('l') if ctrl_held => {
            ctrl.clear_log();
            Vec::new()
        }
        KeyCode::Char(_) if ctrl_held => Vec::new(),
        KeyCode::Char(ch) => {
            ctrl.push_input_char(ch);
            Vec::new()
        }
        KeyCode::Enter => ctrl.send_current_input(),
        KeyCode::Backspace => {
            ctrl.backspace_input();
            Vec::new()
        }
        KeyCode::Esc => {
            ctrl.clear_input();
            Vec::new()
        }
        KeyCode::PageUp => {
            ctrl.scroll_up(PAGE_LINES);
            Vec::new()
        }
        KeyCode::PageDown => {
            ctrl.scroll_down(PAGE_LINES);
            Vec::new()
        }
        KeyCode::Up => {
            ctrl.scroll_up(1);
            Vec::new()
        }
        KeyCode::Down => {
            ctrl.scroll_down(1);
            Vec::new()
        }
        _ => Vec::new(),
    };
    KeyOutcome::Continue(effects)
}
