use super::keys::{KeyCode, KeyEvent};

const PASTE_START: &[char] = &['[', '2', '0', '0', '~'];
const PASTE_END: &[char] = &['[', '2', '0', '1', '~'];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PasteState {
    #[default]
    Idle,
    AccumulatingEscape,
    PasteMode,
    AccumulatingPasteEnd,
}

/// Output of the escape/paste state machine, in the order it must be
/// applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    /// An ordinary key for the binding table.
    Key(KeyEvent),
    /// A confirmed, stand-alone ESC keypress.
    Escape,
    /// Literal text from inside a bracketed paste.
    PasteChar(char),
    /// (Re)start the short escape timer.
    ArmEscapeTimer,
    PasteStarted,
    PasteEnded,
}

#[derive(Clone, Debug, Default)]
pub struct PasteDecoder {
    state: PasteState,
    accumulator: Vec<KeyEvent>,
}

impl PasteDecoder {
    pub fn state(&self) -> PasteState {
        self.state
    }

    pub fn in_paste(&self) -> bool {
        matches!(
            self.state,
            PasteState::PasteMode | PasteState::AccumulatingPasteEnd
        )
    }

    /// True while an escape timer would be meaningful.
    pub fn is_accumulating(&self) -> bool {
        matches!(
            self.state,
            PasteState::AccumulatingEscape | PasteState::AccumulatingPasteEnd
        )
    }

    pub fn feed(&mut self, key: KeyEvent) -> Vec<Decoded> {
        let mut out = Vec::new();
        self.feed_into(key, &mut out);
        out
    }

    fn feed_into(&mut self, key: KeyEvent, out: &mut Vec<Decoded>) {
        match self.state {
            PasteState::Idle => {
                if key.is_plain_escape() {
                    self.accumulator.clear();
                    self.state = PasteState::AccumulatingEscape;
                    out.push(Decoded::ArmEscapeTimer);
                } else {
                    out.push(Decoded::Key(key));
                }
            }
            PasteState::AccumulatingEscape => match marker_progress(&self.accumulator, key, PASTE_START) {
                Progress::Complete => {
                    self.accumulator.clear();
                    self.state = PasteState::PasteMode;
                    tracing::trace!("bracketed paste started");
                    out.push(Decoded::PasteStarted);
                }
                Progress::Partial => {
                    self.accumulator.push(key);
                    out.push(Decoded::ArmEscapeTimer);
                }
                Progress::Broken => {
                    self.state = PasteState::Idle;
                    out.push(Decoded::Escape);
                    out.extend(self.accumulator.drain(..).map(Decoded::Key));
                    self.feed_into(key, out);
                }
            },
            PasteState::PasteMode => {
                if key.is_plain_escape() {
                    self.accumulator.clear();
                    self.state = PasteState::AccumulatingPasteEnd;
                    out.push(Decoded::ArmEscapeTimer);
                } else {
                    out.extend(paste_char(key).map(Decoded::PasteChar));
                }
            }
            PasteState::AccumulatingPasteEnd => match marker_progress(&self.accumulator, key, PASTE_END) {
                Progress::Complete => {
                    self.accumulator.clear();
                    self.state = PasteState::Idle;
                    tracing::trace!("bracketed paste ended");
                    out.push(Decoded::PasteEnded);
                }
                Progress::Partial => {
                    self.accumulator.push(key);
                    out.push(Decoded::ArmEscapeTimer);
                }
                Progress::Broken => {
                    self.state = PasteState::PasteMode;
                    self.flush_literal(out);
                    self.feed_into(key, out);
                }
            },
        }
    }

    /// The escape timer fired with no further key.
    pub fn timeout(&mut self) -> Vec<Decoded> {
        let mut out = Vec::new();
        match self.state {
            PasteState::AccumulatingEscape => {
                self.state = PasteState::Idle;
                out.push(Decoded::Escape);
                out.extend(self.accumulator.drain(..).map(Decoded::Key));
            }
            PasteState::AccumulatingPasteEnd => {
                self.state = PasteState::PasteMode;
                out.push(Decoded::Escape);
                self.flush_literal(&mut out);
            }
            PasteState::Idle | PasteState::PasteMode => {}
        }
        out
    }

    fn flush_literal(&mut self, out: &mut Vec<Decoded>) {
        let pending: Vec<KeyEvent> = self.accumulator.drain(..).collect();
        for key in pending {
            out.extend(paste_char(key).map(Decoded::PasteChar));
        }
    }
}

enum Progress {
    Partial,
    Complete,
    Broken,
}

fn marker_progress(accumulated: &[KeyEvent], key: KeyEvent, marker: &[char]) -> Progress {
    let idx = accumulated.len();
    match (marker.get(idx), key.as_char()) {
        (Some(expected), Some(ch)) if *expected == ch => {
            if idx + 1 == marker.len() {
                Progress::Complete
            } else {
                Progress::Partial
            }
        }
        _ => Progress::Broken,
    }
}

/// Text a key contributes inside a paste. Line breaks are soft newlines;
/// anything without a textual meaning is dropped.
fn paste_char(key: KeyEvent) -> Option<char> {
    if let Some(ch) = key.as_char() {
        return Some(ch);
    }
    match key.code {
        KeyCode::Enter | KeyCode::KpEnter => Some('\n'),
        KeyCode::Char('j') | KeyCode::Char('m') if !key.modifiers.is_empty() => Some('\n'),
        KeyCode::Tab => Some('\t'),
        _ => None,
    }
}
