use crate::error::EditorError;

use super::bindings::{Action, KeyBindings};
use super::keys::{KeyCategory, KeyEvent};
use super::paste::Decoded;
use super::state::{EditorState, Effect};

/// Return `true` to veto the insertion.
pub type CharacterHook = Box<dyn FnMut(char, &str) -> bool + Send>;
/// Return `true` to suppress the default handling of the key.
pub type SpecialKeyHook = Box<dyn FnMut(&str) -> bool + Send>;
pub type EscapeHook = Box<dyn FnMut(&str, usize, EscapePress) + Send>;
pub type TabHook = Box<dyn FnMut(&str, usize) + Send>;
pub type TextChangeHook = Box<dyn FnMut(&str, &str) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapePress {
    First,
    Second,
    /// The double-escape window closed without a second press.
    Expired,
}

#[derive(Default)]
pub struct Hooks {
    pub on_character_will_insert: Option<CharacterHook>,
    pub on_special_key: Option<SpecialKeyHook>,
    pub on_escape: Option<EscapeHook>,
    pub on_tab: Option<TabHook>,
    pub on_text_change: Option<TextChangeHook>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_character_will_insert", &self.on_character_will_insert.is_some())
            .field("on_special_key", &self.on_special_key.is_some())
            .field("on_escape", &self.on_escape.is_some())
            .field("on_tab", &self.on_tab.is_some())
            .field("on_text_change", &self.on_text_change.is_some())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Submitted(String),
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoubleEscape {
    Arm,
    Disarm,
}

/// Everything one key (or timer) asks of the session driver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Step {
    pub effect: Effect,
    pub arm_escape_timer: bool,
    pub double_escape: Option<DoubleEscape>,
    pub outcome: Option<Outcome>,
    pub rejected: Option<EditorError>,
}

/// Pure editing actions. Submit, Escape and Tab need session context and
/// are no-ops here.
pub fn dispatch(state: &mut EditorState, action: Action) -> Effect {
    match action {
        Action::Newline => state.insert_newline(),
        Action::Backspace => state.backspace(),
        Action::Delete => state.delete(),
        Action::MoveLeft => state.move_left(),
        Action::MoveRight => state.move_right(),
        Action::MoveUpVisual => state.move_up_visual(),
        Action::MoveDownVisual => state.move_down_visual(),
        Action::InputStart => state.move_to_input_start(),
        Action::InputEnd => state.move_to_input_end(),
        Action::LineStart => state.move_to_line_start(),
        Action::LineEnd => state.move_to_line_end(),
        Action::WordLeft => state.word_left(),
        Action::WordRight => state.word_right(),
        Action::DeleteWordLeft => state.delete_word_left(),
        Action::DeleteWordRight => state.delete_word_right(),
        Action::DeleteAllBefore => state.delete_all_before(),
        Action::DeleteAllAfter => state.delete_all_after(),
        Action::Submit | Action::Escape | Action::Tab => Effect::None,
    }
}

/// Editor state plus the bindings and hooks that drive it. Owns no I/O.
#[derive(Debug)]
pub struct Editor {
    pub state: EditorState,
    bindings: KeyBindings,
    hooks: Hooks,
    cancelable: bool,
    escape_armed: bool,
}

impl Editor {
    pub fn new(state: EditorState, bindings: KeyBindings, hooks: Hooks, cancelable: bool) -> Self {
        Self {
            state,
            bindings,
            hooks,
            cancelable,
            escape_armed: false,
        }
    }

    pub fn escape_armed(&self) -> bool {
        self.escape_armed
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Step {
        tracing::trace!(key = %key, paste = self.state.paste_mode(), "key");
        let decoded = self.state.paste.feed(key);
        self.apply(decoded)
    }

    /// The short escape timer fired.
    pub fn escape_timeout(&mut self) -> Step {
        let decoded = self.state.paste.timeout();
        self.apply(decoded)
    }

    /// End a cancelable session with no value. No-op otherwise.
    pub fn cancel(&mut self) -> Step {
        if !self.cancelable {
            tracing::debug!("cancel ignored: session is not cancelable");
            return Step::default();
        }
        Step {
            outcome: Some(Outcome::Cancelled),
            ..Step::default()
        }
    }

    /// The double-escape window closed.
    pub fn double_escape_expired(&mut self) -> Step {
        if self.escape_armed {
            self.escape_armed = false;
            let text = self.state.text();
            let lines = self.state.line_count();
            if let Some(hook) = self.hooks.on_escape.as_mut() {
                hook(&text, lines, EscapePress::Expired);
            }
        }
        Step::default()
    }

    fn apply(&mut self, decoded: Vec<Decoded>) -> Step {
        let mut step = Step::default();
        for item in decoded {
            if step.outcome.is_some() {
                break;
            }
            match item {
                Decoded::Key(key) => self.dispatch_key(key, &mut step),
                Decoded::Escape => self.escape(&mut step),
                Decoded::PasteChar(ch) => {
                    let effect = self.state.insert_character(ch);
                    self.record(effect, "PASTE", &mut step);
                }
                Decoded::ArmEscapeTimer => step.arm_escape_timer = true,
                Decoded::PasteStarted | Decoded::PasteEnded => {}
            }
        }
        step.arm_escape_timer &= self.state.paste.is_accumulating();
        step
    }

    fn record(&mut self, effect: Effect, key_name: &str, step: &mut Step) {
        if effect.changed_text() {
            if let Some(hook) = self.hooks.on_text_change.as_mut() {
                hook(&self.state.text(), key_name);
            }
        }
        step.effect = step.effect.merge(effect);
    }

    fn dispatch_key(&mut self, key: KeyEvent, step: &mut Step) {
        let name = key.name();
        match key.category() {
            KeyCategory::Modified if key != KeyEvent::ctrl('j') => {
                if let Some(hook) = self.hooks.on_special_key.as_mut() {
                    if hook(&name) {
                        tracing::trace!(key = %name, "special key consumed by hook");
                        return;
                    }
                }
            }
            KeyCategory::Character => {
                if let Some(ch) = key.as_char() {
                    let text = self.state.text();
                    let vetoed = self
                        .hooks
                        .on_character_will_insert
                        .as_mut()
                        .is_some_and(|hook| hook(ch, &text));
                    if !vetoed {
                        let effect = self.state.insert_character(ch);
                        self.record(effect, &name, step);
                    }
                    return;
                }
            }
            _ => {}
        }

        let Some(action) = self.bindings.lookup(&key) else {
            tracing::trace!(key = %name, "unbound key");
            return;
        };
        match action {
            Action::Submit => match self.state.submit() {
                Ok(text) => step.outcome = Some(Outcome::Submitted(text)),
                Err(err) => {
                    tracing::debug!(error = %err, "submit rejected");
                    step.rejected = Some(err);
                }
            },
            Action::Escape => self.escape(step),
            Action::Tab => {
                let text = self.state.text();
                let lines = self.state.line_count();
                if let Some(hook) = self.hooks.on_tab.as_mut() {
                    hook(&text, lines);
                }
            }
            action => {
                let effect = dispatch(&mut self.state, action);
                self.record(effect, &name, step);
            }
        }
    }

    fn escape(&mut self, step: &mut Step) {
        let text = self.state.text();
        let lines = self.state.line_count();

        if self.state.paste_mode() {
            if let Some(hook) = self.hooks.on_escape.as_mut() {
                hook(&text, lines, EscapePress::First);
            }
            return;
        }
        if self.cancelable {
            step.outcome = Some(Outcome::Cancelled);
            return;
        }

        if self.escape_armed {
            self.escape_armed = false;
            step.double_escape = Some(DoubleEscape::Disarm);
            let effect = self.state.clear_input();
            self.record(effect, "ESCAPE", step);
            if let Some(hook) = self.hooks.on_escape.as_mut() {
                hook(&text, lines, EscapePress::Second);
            }
            return;
        }

        if let Some(hook) = self.hooks.on_escape.as_mut() {
            hook(&text, lines, EscapePress::First);
        }
        if !text.is_empty() {
            self.escape_armed = true;
            step.double_escape = Some(DoubleEscape::Arm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::keys::{KeyCode, KeyModifiers};
    use std::sync::{Arc, Mutex};

    fn editor(text: &str) -> Editor {
        Editor::new(
            EditorState::with_text(text),
            KeyBindings::default(),
            Hooks::default(),
            false,
        )
    }

    fn press_all(editor: &mut Editor, keys: &[KeyEvent]) -> Vec<Step> {
        keys.iter().map(|&key| editor.handle_key(key)).collect()
    }

    #[test]
    fn test_type_and_submit() {
        let mut editor = editor("");
        press_all(&mut editor, &KeyEvent::typed("hello"));
        let step = editor.handle_key(KeyEvent::plain(KeyCode::Enter));
        assert_eq!(step.outcome, Some(Outcome::Submitted("hello".to_string())));
    }

    #[test]
    fn test_character_hook_can_veto() {
        let mut editor = editor("");
        editor.hooks.on_character_will_insert = Some(Box::new(|ch: char, _: &str| ch == '/'));
        press_all(&mut editor, &KeyEvent::typed("a/b"));
        assert_eq!(editor.state.text(), "ab");
    }

    #[test]
    fn test_special_key_hook_intercepts_ctrl_c_but_not_ctrl_j() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut editor = editor("a");
        editor.hooks.on_special_key = Some(Box::new(move |name: &str| {
            sink.lock().expect("lock").push(name.to_string());
            true
        }));
        editor.handle_key(KeyEvent::ctrl('c'));
        editor.handle_key(KeyEvent::ctrl('j'));
        assert_eq!(*seen.lock().expect("lock"), vec!["CTRL_C".to_string()]);
        assert_eq!(editor.state.text(), "a\n");
    }

    #[test]
    fn test_text_change_hook_reports_key_name() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut editor = editor("ab");
        editor.hooks.on_text_change = Some(Box::new(move |text: &str, key: &str| {
            sink.lock().expect("lock").push((text.to_string(), key.to_string()));
        }));
        editor.handle_key(KeyEvent::plain(KeyCode::Left));
        editor.handle_key(KeyEvent::plain(KeyCode::Backspace));
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![("b".to_string(), "BACKSPACE".to_string())]
        );
    }

    #[test]
    fn test_short_input_is_rejected_and_editor_stays_active() {
        let state = EditorState::new(
            &[],
            &crate::editor::state::EditorOptions {
                min_length: 2,
                ..Default::default()
            },
            Default::default(),
        );
        let mut editor = Editor::new(state, KeyBindings::default(), Hooks::default(), false);
        editor.handle_key(KeyEvent::char('x'));
        let step = editor.handle_key(KeyEvent::plain(KeyCode::KpEnter));
        assert_eq!(step.outcome, None);
        assert_eq!(
            step.rejected,
            Some(EditorError::InputTooShort { len: 1, min: 2 })
        );
        editor.handle_key(KeyEvent::char('y'));
        let step = editor.handle_key(KeyEvent::plain(KeyCode::Enter));
        assert_eq!(step.outcome, Some(Outcome::Submitted("xy".to_string())));
    }

    #[test]
    fn test_escape_cancels_cancelable_session_after_timeout() {
        let mut editor = Editor::new(
            EditorState::with_text("draft"),
            KeyBindings::default(),
            Hooks::default(),
            true,
        );
        let step = editor.handle_key(KeyEvent::plain(KeyCode::Escape));
        assert!(step.arm_escape_timer);
        assert_eq!(step.outcome, None);
        assert_eq!(editor.escape_timeout().outcome, Some(Outcome::Cancelled));
    }

    #[test]
    fn test_cancel_only_ends_cancelable_sessions() {
        let mut plain = editor("draft");
        assert_eq!(plain.cancel().outcome, None);

        let mut cancelable = Editor::new(
            EditorState::with_text("draft"),
            KeyBindings::default(),
            Hooks::default(),
            true,
        );
        assert_eq!(cancelable.cancel().outcome, Some(Outcome::Cancelled));
    }

    #[test]
    fn test_double_escape_clears_input() {
        let presses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&presses);
        let mut editor = editor("draft");
        editor.hooks.on_escape = Some(Box::new(move |_: &str, _: usize, press: EscapePress| {
            sink.lock().expect("lock").push(press);
        }));

        editor.handle_key(KeyEvent::plain(KeyCode::Escape));
        let first = editor.escape_timeout();
        assert_eq!(first.double_escape, Some(DoubleEscape::Arm));
        assert!(editor.escape_armed());

        editor.handle_key(KeyEvent::plain(KeyCode::Escape));
        let second = editor.escape_timeout();
        assert_eq!(second.double_escape, Some(DoubleEscape::Disarm));
        assert_eq!(second.effect, Effect::Repaint);
        assert_eq!(editor.state.text(), "");
        assert_eq!(
            *presses.lock().expect("lock"),
            vec![EscapePress::First, EscapePress::Second]
        );
    }

    #[test]
    fn test_double_escape_window_expiry_disarms() {
        let mut editor = editor("draft");
        editor.handle_key(KeyEvent::plain(KeyCode::Escape));
        editor.escape_timeout();
        editor.double_escape_expired();
        assert!(!editor.escape_armed());

        editor.handle_key(KeyEvent::plain(KeyCode::Escape));
        editor.escape_timeout();
        assert_eq!(editor.state.text(), "draft");
    }

    #[test]
    fn test_alt_sequence_after_escape_replays_as_keys() {
        let mut editor = editor("one two");
        // ESC followed by a non-marker key: escape first, then the key types.
        editor.handle_key(KeyEvent::plain(KeyCode::Escape));
        let step = editor.handle_key(KeyEvent::char('x'));
        assert_eq!(editor.state.text(), "one twox");
        assert!(!step.arm_escape_timer);
        assert!(editor.escape_armed());
    }

    #[test]
    fn test_paste_inserts_verbatim_and_skips_bindings() {
        let mut editor = editor("");
        let mut keys = vec![KeyEvent::plain(KeyCode::Escape)];
        keys.extend(KeyEvent::typed("[200~"));
        keys.extend(KeyEvent::typed("line one"));
        keys.push(KeyEvent::plain(KeyCode::Enter));
        keys.extend(KeyEvent::typed("line two"));
        keys.push(KeyEvent::plain(KeyCode::Escape));
        keys.extend(KeyEvent::typed("[201~"));
        let steps = press_all(&mut editor, &keys);
        assert!(steps.iter().all(|step| step.outcome.is_none()));
        assert_eq!(editor.state.text(), "line one\nline two");
        assert!(!editor.state.paste_mode());
    }

    #[test]
    fn test_word_keys_use_composite_bindings() {
        let mut editor = editor("alpha beta");
        editor.handle_key(KeyEvent::new(KeyCode::Left, KeyModifiers::CONTROL));
        assert_eq!(editor.state.cursor_offset(), 6);
        editor.handle_key(KeyEvent::ctrl('w'));
        assert_eq!(editor.state.text(), "beta");
    }
}
