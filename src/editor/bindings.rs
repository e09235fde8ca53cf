use super::keys::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Submit,
    Newline,
    Escape,
    Backspace,
    Delete,
    MoveLeft,
    MoveRight,
    MoveUpVisual,
    MoveDownVisual,
    InputStart,
    InputEnd,
    LineStart,
    LineEnd,
    WordLeft,
    WordRight,
    DeleteWordLeft,
    DeleteWordRight,
    DeleteAllBefore,
    DeleteAllAfter,
    Tab,
}

const NONE: KeyModifiers = KeyModifiers::NONE;
const CTRL: KeyModifiers = KeyModifiers::CONTROL;
const ALT: KeyModifiers = KeyModifiers::ALT;
const SHIFT: KeyModifiers = KeyModifiers::SHIFT;

pub const DEFAULT_BINDINGS: &[(KeyModifiers, KeyCode, Action)] = &[
    (NONE, KeyCode::Enter, Action::Submit),
    (NONE, KeyCode::KpEnter, Action::Submit),
    (CTRL, KeyCode::Char('j'), Action::Newline),
    (SHIFT, KeyCode::Enter, Action::Newline),
    (ALT, KeyCode::Enter, Action::Newline),
    (NONE, KeyCode::Escape, Action::Escape),
    (NONE, KeyCode::Backspace, Action::Backspace),
    (NONE, KeyCode::Delete, Action::Delete),
    (NONE, KeyCode::Left, Action::MoveLeft),
    (NONE, KeyCode::Right, Action::MoveRight),
    (NONE, KeyCode::Up, Action::MoveUpVisual),
    (NONE, KeyCode::Down, Action::MoveDownVisual),
    (NONE, KeyCode::Home, Action::InputStart),
    (NONE, KeyCode::End, Action::InputEnd),
    (CTRL, KeyCode::Char('a'), Action::LineStart),
    (CTRL, KeyCode::Char('e'), Action::LineEnd),
    (CTRL, KeyCode::Left, Action::WordLeft),
    (CTRL, KeyCode::Right, Action::WordRight),
    (ALT, KeyCode::Char('b'), Action::WordLeft),
    (ALT, KeyCode::Char('f'), Action::WordRight),
    (CTRL, KeyCode::Char('w'), Action::DeleteWordLeft),
    (ALT, KeyCode::Char('d'), Action::DeleteWordRight),
    (CTRL, KeyCode::Char('u'), Action::DeleteAllBefore),
    (CTRL, KeyCode::Char('k'), Action::DeleteAllAfter),
    (NONE, KeyCode::Tab, Action::Tab),
];

#[derive(Clone, Debug)]
pub struct KeyBindings {
    table: Vec<(KeyModifiers, KeyCode, Action)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            table: DEFAULT_BINDINGS.to_vec(),
        }
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self { table: Vec::new() }
    }

    /// Bind (or rebind) a key.
    pub fn bind(&mut self, modifiers: KeyModifiers, code: KeyCode, action: Action) {
        self.unbind(modifiers, code);
        self.table.push((modifiers, code, action));
    }

    pub fn unbind(&mut self, modifiers: KeyModifiers, code: KeyCode) {
        self.table
            .retain(|(mods, bound, _)| !(*mods == modifiers && *bound == code));
    }

    /// Composite binding first (e.g. CTRL_LEFT), then the bare key. Modified
    /// characters never fall back: CTRL_X is not `x`.
    pub fn lookup(&self, key: &KeyEvent) -> Option<Action> {
        let ascii_lower = |code: KeyCode| match code {
            KeyCode::Char(ch) => KeyCode::Char(ch.to_ascii_lowercase()),
            other => other,
        };
        let code = if key.modifiers.is_empty() {
            key.code
        } else {
            ascii_lower(key.code)
        };

        if let Some(action) = self.find(key.modifiers, code) {
            return Some(action);
        }
        if key.modifiers.is_empty() || matches!(code, KeyCode::Char(_)) {
            return None;
        }
        self.find(KeyModifiers::NONE, code)
    }

    fn find(&self, modifiers: KeyModifiers, code: KeyCode) -> Option<Action> {
        self.table
            .iter()
            .find(|(mods, bound, _)| *mods == modifiers && *bound == code)
            .map(|(_, _, action)| *action)
    }
}
