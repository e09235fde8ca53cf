use std::fmt;

pub use crossterm::event::KeyModifiers;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    KpEnter,
    Escape,
    Backspace,
    Delete,
    Tab,
    BackTab,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
}

/// xterm encodes modifiers as `1 + bits` in CSI parameters.
pub fn modifiers_from_xterm_param(param: u16) -> KeyModifiers {
    let bits = param.saturating_sub(1);
    let mut out = KeyModifiers::NONE;
    if bits & 1 != 0 {
        out |= KeyModifiers::SHIFT;
    }
    if bits & 2 != 0 {
        out |= KeyModifiers::ALT;
    }
    if bits & 4 != 0 {
        out |= KeyModifiers::CONTROL;
    }
    out
}

/// Closed set of key categories, resolved once when a key enters the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCategory {
    Character,
    Navigation,
    Editing,
    Modified,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn char(ch: char) -> Self {
        Self::plain(KeyCode::Char(ch))
    }

    pub const fn ctrl(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    pub const fn alt(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), KeyModifiers::ALT)
    }

    /// Keys for every character of `text`, as if typed.
    pub fn typed(text: &str) -> Vec<Self> {
        text.chars().map(Self::char).collect()
    }

    /// True for a printable character with no control/alt modifier.
    pub fn is_character(&self) -> bool {
        matches!(self.code, KeyCode::Char(ch) if !ch.is_control())
            && !self.modifiers.contains(KeyModifiers::CONTROL)
            && !self.modifiers.contains(KeyModifiers::ALT)
    }

    pub fn is_plain_escape(&self) -> bool {
        self.code == KeyCode::Escape && self.modifiers.is_empty()
    }

    pub fn as_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) if self.is_character() => Some(ch),
            _ => None,
        }
    }

    pub fn category(&self) -> KeyCategory {
        if self.is_plain_escape() {
            return KeyCategory::Escape;
        }
        if self.modifiers.contains(KeyModifiers::CONTROL) || self.modifiers.contains(KeyModifiers::ALT) {
            return KeyCategory::Modified;
        }
        match self.code {
            KeyCode::Char(_) => KeyCategory::Character,
            KeyCode::Left
            | KeyCode::Right
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Home
            | KeyCode::End
            | KeyCode::PageUp
            | KeyCode::PageDown => KeyCategory::Navigation,
            _ => KeyCategory::Editing,
        }
    }

    /// Composite name such as `CTRL_LEFT`, `ALT_D` or `ENTER`; characters
    /// name themselves.
    pub fn name(&self) -> String {
        if let Some(ch) = self.as_char() {
            return ch.to_string();
        }
        let mut name = String::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            name.push_str("CTRL_");
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            name.push_str("ALT_");
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            name.push_str("SHIFT_");
        }
        match self.code {
            KeyCode::Char(ch) => name.extend(ch.to_uppercase()),
            code => name.push_str(code_name(code)),
        }
        name
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn code_name(code: KeyCode) -> &'static str {
    match code {
        KeyCode::Char(_) => "CHAR",
        KeyCode::Enter => "ENTER",
        KeyCode::KpEnter => "KP_ENTER",
        KeyCode::Escape => "ESCAPE",
        KeyCode::Backspace => "BACKSPACE",
        KeyCode::Delete => "DELETE",
        KeyCode::Tab => "TAB",
        KeyCode::BackTab => "BACK_TAB",
        KeyCode::Left => "LEFT",
        KeyCode::Right => "RIGHT",
        KeyCode::Up => "UP",
        KeyCode::Down => "DOWN",
        KeyCode::Home => "HOME",
        KeyCode::End => "END",
        KeyCode::PageUp => "PAGE_UP",
        KeyCode::PageDown => "PAGE_DOWN",
        KeyCode::Insert => "INSERT",
    }
}
