use crate::error::EditorError;
use crate::ui::input_metrics::{calculate_input_line_count, Coordinate};

use super::paste::PasteDecoder;

/// Characters that end a word, in addition to whitespace.
const WORD_BOUNDARY_PUNCTUATION: &str = ",.:;!?()[]{}<>\"'`~@#$%^&*+=|\\/-";

pub fn is_word_boundary(ch: char) -> bool {
    ch.is_whitespace() || WORD_BOUNDARY_PUNCTUATION.contains(ch)
}

/// What the caller must redraw after an editing operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,
    MoveCursor,
    Repaint,
    Reposition {
        delta: isize,
    },
}

impl Effect {
    /// Combine two effects produced by one key (replayed escape sequences
    /// can yield several).
    pub fn merge(self, other: Effect) -> Effect {
        match (self, other) {
            (Effect::Reposition { delta: a }, Effect::Reposition { delta: b }) => {
                Effect::Reposition { delta: a + b }
            }
            (Effect::Reposition { delta }, _) | (_, Effect::Reposition { delta }) => {
                Effect::Reposition { delta }
            }
            (Effect::Repaint, _) | (_, Effect::Repaint) => Effect::Repaint,
            (Effect::MoveCursor, _) | (_, Effect::MoveCursor) => Effect::MoveCursor,
            (Effect::None, Effect::None) => Effect::None,
        }
    }

    pub fn changed_text(&self) -> bool {
        matches!(self, Effect::Repaint | Effect::Reposition { .. })
    }
}

/// How edits behave while a history entry is displayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryEditPolicy {
    /// Edits land in the historical slot itself and survive navigation.
    #[default]
    MutateInPlace,
    /// The first edit copies the entry into the live slot and switches to it.
    CopyOnWrite,
}

/// Width of the terminal and of the prompt in front of the first input row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: usize,
    pub prompt_width: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 80,
            prompt_width: 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EditorOptions {
    pub max_length: Option<usize>,
    pub min_length: usize,
    pub echo: bool,
    pub echo_char: Option<char>,
    pub default_text: String,
    /// Initial cursor; negative values count back from the end, -1 being
    /// the end of the input.
    pub cursor_position: Option<isize>,
    pub history_policy: HistoryEditPolicy,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            max_length: None,
            min_length: 0,
            echo: true,
            echo_char: None,
            default_text: String::new(),
            cursor_position: None,
            history_policy: HistoryEditPolicy::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EditorState {
    slots: Vec<Vec<char>>,
    active_index: usize,
    cursor_offset: usize,
    echo: bool,
    echo_char: Option<char>,
    max_length: usize,
    min_length: usize,
    history_policy: HistoryEditPolicy,
    geometry: Geometry,
    pub(crate) paste: PasteDecoder,
}

impl EditorState {
    pub fn new(history: &[String], options: &EditorOptions, geometry: Geometry) -> Self {
        let max_length = options.max_length.unwrap_or(usize::MAX);
        let mut slots: Vec<Vec<char>> = history
            .iter()
            .map(|entry| entry.chars().take(max_length).collect())
            .collect();
        let live: Vec<char> = options.default_text.chars().take(max_length).collect();
        let len = live.len();
        slots.push(live);

        let cursor_offset = match options.cursor_position {
            None => len,
            Some(pos) if pos >= 0 => (pos as usize).min(len),
            Some(pos) => len.saturating_sub(pos.unsigned_abs() - 1),
        };

        Self {
            active_index: slots.len() - 1,
            slots,
            cursor_offset,
            echo: options.echo,
            echo_char: options.echo_char,
            max_length,
            min_length: options.min_length,
            history_policy: options.history_policy,
            geometry,
            paste: PasteDecoder::default(),
        }
    }

    pub fn with_text(text: &str) -> Self {
        let options = EditorOptions {
            default_text: text.to_string(),
            ..EditorOptions::default()
        };
        Self::new(&[], &options, Geometry::default())
    }

    pub fn chars(&self) -> &[char] {
        &self.slots[self.active_index]
    }

    pub fn text(&self) -> String {
        self.chars().iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars().is_empty()
    }

    pub fn cursor_offset(&self) -> usize {
        self.cursor_offset
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn live_index(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn paste_mode(&self) -> bool {
        self.paste.in_paste()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    /// What the terminal shows for the active slot: nothing without echo,
    /// the mask character per code point when masking.
    pub fn display_chars(&self) -> Vec<char> {
        if !self.echo {
            return Vec::new();
        }
        match self.echo_char {
            Some(mask) => self
                .chars()
                .iter()
                .map(|&ch| if ch == '\n' { ch } else { mask })
                .collect(),
            None => self.chars().to_vec(),
        }
    }

    pub fn display_cursor_offset(&self) -> usize {
        if self.echo {
            self.cursor_offset
        } else {
            0
        }
    }

    /// Screen lines the prompt plus the displayed input occupy.
    pub fn line_count(&self) -> usize {
        let text: String = self.display_chars().into_iter().collect();
        calculate_input_line_count(self.geometry.prompt_width, &text, self.geometry.width)
    }

    /// Cursor position relative to the prompt's first row (row 0).
    pub fn cursor_coordinate(&self) -> Coordinate {
        let start = Coordinate::new(0, self.geometry.prompt_width);
        crate::ui::input_metrics::offset_to_coordinate(
            start,
            &self.display_chars(),
            self.display_cursor_offset(),
            self.geometry.width,
        )
    }

    fn forks_on_edit(&self) -> bool {
        self.history_policy == HistoryEditPolicy::CopyOnWrite && self.active_index != self.live_index()
    }

    /// Every slot before the live one, including in-place edits.
    pub fn history(&self) -> Vec<String> {
        self.slots[..self.live_index()]
            .iter()
            .map(|slot| slot.iter().collect())
            .collect()
    }

    pub fn into_history(self) -> Vec<String> {
        self.history()
    }

    fn edit<F>(&mut self, mutate: F) -> Effect
    where
        F: FnOnce(&mut Vec<char>, &mut usize) -> bool,
    {
        let before = self.line_count();
        let mut cursor = self.cursor_offset;
        let changed = if self.forks_on_edit() {
            // A recalled entry is only copied over the draft once it really changes.
            let mut scratch = self.slots[self.active_index].clone();
            let changed = mutate(&mut scratch, &mut cursor);
            if changed {
                let live = self.live_index();
                self.slots[live] = scratch;
                self.active_index = live;
            }
            changed
        } else {
            mutate(&mut self.slots[self.active_index], &mut cursor)
        };
        self.cursor_offset = cursor;
        if !changed {
            return Effect::None;
        }
        self.text_effect(before)
    }

    fn text_effect(&self, lines_before: usize) -> Effect {
        let after = self.line_count();
        if after == lines_before {
            Effect::Repaint
        } else {
            Effect::Reposition {
                delta: after as isize - lines_before as isize,
            }
        }
    }

    fn move_to(&mut self, offset: usize) -> Effect {
        let offset = offset.min(self.len());
        if offset == self.cursor_offset {
            return Effect::None;
        }
        self.cursor_offset = offset;
        Effect::MoveCursor
    }

    pub fn insert_character(&mut self, ch: char) -> Effect {
        if self.len() >= self.max_length {
            return Effect::None;
        }
        self.edit(|slot, cursor| {
            slot.insert(*cursor, ch);
            *cursor += 1;
            true
        })
    }

    pub fn insert_newline(&mut self) -> Effect {
        self.insert_character('\n')
    }

    pub fn backspace(&mut self) -> Effect {
        self.edit(|slot, cursor| {
            if *cursor == 0 {
                return false;
            }
            *cursor -= 1;
            slot.remove(*cursor);
            true
        })
    }

    pub fn delete(&mut self) -> Effect {
        self.edit(|slot, cursor| {
            if *cursor >= slot.len() {
                return false;
            }
            slot.remove(*cursor);
            true
        })
    }

    pub fn move_left(&mut self) -> Effect {
        self.move_to(self.cursor_offset.saturating_sub(1))
    }

    pub fn move_right(&mut self) -> Effect {
        self.move_to(self.cursor_offset + 1)
    }

    pub fn move_to_input_start(&mut self) -> Effect {
        self.move_to(0)
    }

    pub fn move_to_input_end(&mut self) -> Effect {
        self.move_to(self.len())
    }

    fn line_start_of(&self, offset: usize) -> usize {
        self.chars()[..offset]
            .iter()
            .rposition(|&ch| ch == '\n')
            .map_or(0, |idx| idx + 1)
    }

    fn line_end_of(&self, offset: usize) -> usize {
        self.chars()[offset..]
            .iter()
            .position(|&ch| ch == '\n')
            .map_or(self.len(), |idx| offset + idx)
    }

    pub fn move_to_line_start(&mut self) -> Effect {
        self.move_to(self.line_start_of(self.cursor_offset))
    }

    pub fn move_to_line_end(&mut self) -> Effect {
        self.move_to(self.line_end_of(self.cursor_offset))
    }

    /// UP: history at the very start of the first line, buffer start
    /// elsewhere on that line, otherwise the same column one line up.
    pub fn move_up_visual(&mut self) -> Effect {
        let line_start = self.line_start_of(self.cursor_offset);
        if line_start == 0 {
            if self.cursor_offset == 0 {
                let effect = self.history_previous();
                // Keep walking back on repeated UP.
                return effect.merge(self.move_to(0));
            }
            return self.move_to(0);
        }
        let column = self.cursor_offset - line_start;
        let prev_start = self.line_start_of(line_start - 1);
        let prev_len = line_start - 1 - prev_start;
        self.move_to(prev_start + column.min(prev_len))
    }

    pub fn move_down_visual(&mut self) -> Effect {
        let line_end = self.line_end_of(self.cursor_offset);
        if line_end == self.len() {
            if self.cursor_offset == self.len() {
                return self.history_next();
            }
            return self.move_to(self.len());
        }
        let column = self.cursor_offset - self.line_start_of(self.cursor_offset);
        let next_start = line_end + 1;
        let next_len = self.line_end_of(next_start) - next_start;
        self.move_to(next_start + column.min(next_len))
    }

    fn switch_slot(&mut self, index: usize) -> Effect {
        let before = self.line_count();
        let text_before = self.chars().to_vec();
        self.active_index = index;
        self.cursor_offset = self.len();
        if self.chars() == text_before.as_slice() {
            return Effect::MoveCursor;
        }
        self.text_effect(before)
    }

    pub(crate) fn history_previous(&mut self) -> Effect {
        if self.active_index == 0 {
            return Effect::None;
        }
        self.switch_slot(self.active_index - 1)
    }

    pub(crate) fn history_next(&mut self) -> Effect {
        if self.active_index >= self.live_index() {
            return Effect::None;
        }
        self.switch_slot(self.active_index + 1)
    }

    pub fn word_left_offset(&self) -> usize {
        let buffer = self.chars();
        let mut offset = self.cursor_offset;
        while offset > 0 && is_word_boundary(buffer[offset - 1]) {
            offset -= 1;
        }
        while offset > 0 && !is_word_boundary(buffer[offset - 1]) {
            offset -= 1;
        }
        offset
    }

    pub fn word_right_offset(&self) -> usize {
        let buffer = self.chars();
        let mut offset = self.cursor_offset;
        while offset < buffer.len() && is_word_boundary(buffer[offset]) {
            offset += 1;
        }
        while offset < buffer.len() && !is_word_boundary(buffer[offset]) {
            offset += 1;
        }
        offset
    }

    pub fn word_left(&mut self) -> Effect {
        self.move_to(self.word_left_offset())
    }

    pub fn word_right(&mut self) -> Effect {
        self.move_to(self.word_right_offset())
    }

    pub fn delete_word_left(&mut self) -> Effect {
        let target = self.word_left_offset();
        self.edit(|slot, cursor| {
            if target == *cursor {
                return false;
            }
            slot.drain(target..*cursor);
            *cursor = target;
            true
        })
    }

    pub fn delete_word_right(&mut self) -> Effect {
        let target = self.word_right_offset();
        self.edit(|slot, cursor| {
            if target == *cursor {
                return false;
            }
            slot.drain(*cursor..target);
            true
        })
    }

    pub fn delete_all_before(&mut self) -> Effect {
        self.edit(|slot, cursor| {
            if *cursor == 0 {
                return false;
            }
            slot.drain(..*cursor);
            *cursor = 0;
            true
        })
    }

    pub fn delete_all_after(&mut self) -> Effect {
        self.edit(|slot, cursor| {
            if *cursor >= slot.len() {
                return false;
            }
            slot.truncate(*cursor);
            true
        })
    }

    pub fn clear_input(&mut self) -> Effect {
        self.edit(|slot, cursor| {
            if slot.is_empty() {
                return false;
            }
            slot.clear();
            *cursor = 0;
            true
        })
    }

    pub fn submit(&self) -> Result<String, EditorError> {
        if self.len() < self.min_length {
            return Err(EditorError::InputTooShort {
                len: self.len(),
                min: self.min_length,
            });
        }
        Ok(self.text())
    }
}
