use unicode_width::UnicodeWidthChar;

use crate::error::{RenderError, RenderResult};

/// Smallest terminal the editor can draw into without losing the cursor.
pub const MIN_USABLE_WIDTH: usize = 4;
pub const MIN_USABLE_HEIGHT: usize = 2;

/// A screen position. `row` is 1-based and may drop below 1 once the input has
/// scrolled past the top of the viewport; `col` counts the cells already used
/// on that row, so the next character lands in terminal column `col + 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coordinate {
    pub row: isize,
    pub col: usize,
}

impl Coordinate {
    pub fn new(row: isize, col: usize) -> Self {
        Self { row, col }
    }

    /// Terminal column (1-based) for a cursor parked at this coordinate. A row
    /// that is exactly full keeps the cursor on its last cell.
    pub fn screen_col(&self, width: usize) -> usize {
        (self.col + 1).min(width.max(1))
    }
}

/// Geometry of one buffer drawn from `start`, after scroll compensation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub start: Coordinate,
    pub end: Coordinate,
    pub cursor: Coordinate,
    /// Blank lines the caller must emit before the rows above are valid.
    pub scroll: usize,
}

impl Extent {
    pub fn line_count(&self) -> usize {
        (self.end.row - self.start.row) as usize + 1
    }
}

/// One visual row of a wrapped buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisualRow {
    pub row: isize,
    pub col: usize,
    pub text: String,
}

/// Column width under the legacy two-class rule: full-width code points take
/// two cells, everything else takes one.
pub fn cell_width(ch: char) -> usize {
    if UnicodeWidthChar::width(ch) == Some(2) {
        2
    } else {
        1
    }
}

/// Move one character forward from `pos`. Overflow is checked after the
/// character is placed; a character that overflows wraps flush left.
pub fn advance(pos: Coordinate, ch: char, width: usize) -> Coordinate {
    if ch == '\n' {
        return Coordinate::new(pos.row + 1, 0);
    }
    let w = cell_width(ch);
    let col = pos.col + w;
    if col > width {
        Coordinate::new(pos.row + 1, w)
    } else {
        Coordinate::new(pos.row, col)
    }
}

pub fn offset_to_coordinate(
    start: Coordinate,
    buffer: &[char],
    offset: usize,
    width: usize,
) -> Coordinate {
    let width = width.max(1);
    buffer
        .iter()
        .take(offset)
        .fold(start, |pos, &ch| advance(pos, ch, width))
}

/// End and cursor coordinates for `buffer`, shifted so that the end row fits
/// inside a terminal of `height` rows.
pub fn compute_extent(
    start: Coordinate,
    buffer: &[char],
    cursor_offset: usize,
    width: usize,
    height: usize,
) -> RenderResult<Extent> {
    ensure_usable(width, height)?;

    let end = offset_to_coordinate(start, buffer, buffer.len(), width);
    let cursor = offset_to_coordinate(start, buffer, cursor_offset.min(buffer.len()), width);

    let scroll = if end.row > height as isize {
        (end.row - height as isize) as usize
    } else {
        0
    };
    let shift = |pos: Coordinate| Coordinate::new(pos.row - scroll as isize, pos.col);

    Ok(Extent {
        start: shift(start),
        end: shift(end),
        cursor: shift(cursor),
        scroll,
    })
}

pub fn ensure_usable(width: usize, height: usize) -> RenderResult<()> {
    if width < MIN_USABLE_WIDTH || height < MIN_USABLE_HEIGHT {
        tracing::warn!(width, height, "terminal below minimum usable size");
        return Err(RenderError::GeometryOverflow {
            width,
            height,
            min_width: MIN_USABLE_WIDTH,
            min_height: MIN_USABLE_HEIGHT,
        });
    }
    Ok(())
}

/// Number of screen lines a prompt of `prompt_width` cells followed by `text`
/// occupies.
pub fn calculate_input_line_count(prompt_width: usize, text: &str, width: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let end = offset_to_coordinate(Coordinate::new(0, prompt_width), &chars, chars.len(), width);
    end.row as usize + 1
}

/// Split `buffer` into the rows it occupies when drawn from `start`.
pub fn visual_rows(start: Coordinate, buffer: &[char], width: usize) -> Vec<VisualRow> {
    let width = width.max(1);
    let mut rows = vec![VisualRow {
        row: start.row,
        col: start.col,
        text: String::new(),
    }];
    let mut pos = start;
    for &ch in buffer {
        let next = advance(pos, ch, width);
        if next.row != pos.row {
            let col = if ch == '\n' { 0 } else { next.col - cell_width(ch) };
            rows.push(VisualRow {
                row: next.row,
                col,
                text: String::new(),
            });
        }
        if ch != '\n' {
            if let Some(row) = rows.last_mut() {
                row.text.push(ch);
            }
        }
        pos = next;
    }
    rows
}

pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width && used > 0 {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

/// Truncate to `width` cells, replacing the tail with "..." when cut.
pub fn truncate_with_ellipsis(input: &str, width: usize) -> String {
    if display_width(input) <= width {
        return input.to_string();
    }
    if width < 4 {
        return truncate_to_display_width(input, width);
    }
    let mut out = truncate_to_display_width(input, width - 3);
    out.push_str("...");
    out
}

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}
