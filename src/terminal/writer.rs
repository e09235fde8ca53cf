use crossterm::{
    cursor::MoveTo,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
    Command,
};
use std::fmt;
use std::io::{self, Stdout, Write};

/// `CSI n L`: insert `n` blank lines at the cursor row; rows below move down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertLines(pub u16);

impl Command for InsertLines {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "\x1b[{}L", self.0)
    }

    #[cfg(windows)]
    fn execute_winapi(&self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "InsertLines requires an ANSI terminal",
        ))
    }
}

/// `CSI n M`: delete `n` lines at the cursor row; rows below move up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteLines(pub u16);

impl Command for DeleteLines {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "\x1b[{}M", self.0)
    }

    #[cfg(windows)]
    fn execute_winapi(&self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "DeleteLines requires an ANSI terminal",
        ))
    }
}

/// Control-sequence primitives used by the editor and the component tree.
///
/// Rows and columns are 1-based, like the terminal addresses them. Every
/// primitive is flushed before it returns so a partial redraw stays visible
/// even when a later write fails.
pub struct TerminalWriter<W: Write> {
    out: W,
    width: usize,
    height: usize,
    ops: usize,
}

impl TerminalWriter<Stdout> {
    pub fn stdout() -> io::Result<Self> {
        let (width, height) = crossterm::terminal::size()?;
        Ok(Self::new(io::stdout(), width as usize, height as usize))
    }
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(out: W, width: usize, height: usize) -> Self {
        Self {
            out,
            width,
            height,
            ops: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Number of primitives emitted so far.
    pub fn ops(&self) -> usize {
        self.ops
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn move_cursor_to(&mut self, row: usize, col: usize) -> io::Result<()> {
        let row = row.clamp(1, u16::MAX as usize) as u16;
        let col = col.clamp(1, u16::MAX as usize) as u16;
        self.emit(MoveTo(col - 1, row - 1))
    }

    pub fn erase_line_from_cursor(&mut self) -> io::Result<()> {
        self.emit(Clear(ClearType::UntilNewLine))
    }

    pub fn erase_line(&mut self) -> io::Result<()> {
        self.emit(Clear(ClearType::CurrentLine))
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.finish()
    }

    /// Push the rows from the cursor down by `n`, opening blank lines.
    pub fn scroll_region_down(&mut self, n: usize) -> io::Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.emit(InsertLines(n.min(u16::MAX as usize) as u16))
    }

    /// Remove `n` rows at the cursor, pulling the rows below up.
    pub fn scroll_region_up(&mut self, n: usize) -> io::Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.emit(DeleteLines(n.min(u16::MAX as usize) as u16))
    }

    /// Emit `n` line feeds; at the bottom row each one scrolls the viewport.
    pub fn newlines(&mut self, n: usize) -> io::Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.emit(Print("\n".repeat(n)))
    }

    pub fn write_raw(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.emit(Print(text))
    }

    pub fn enable_bracketed_paste(&mut self) -> io::Result<()> {
        self.emit(EnableBracketedPaste)
    }

    pub fn disable_bracketed_paste(&mut self) -> io::Result<()> {
        self.emit(DisableBracketedPaste)
    }

    fn emit(&mut self, command: impl Command) -> io::Result<()> {
        queue!(self.out, command)?;
        self.finish()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.ops += 1;
        self.out.flush()
    }
}

/// In-memory writer used by tests and by callers that want to inspect output.
pub type BufferWriter = TerminalWriter<Vec<u8>>;

impl BufferWriter {
    pub fn buffer(width: usize, height: usize) -> Self {
        Self::new(Vec::new(), width, height)
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    pub fn take_contents(&mut self) -> String {
        let text = self.contents();
        self.out.clear();
        text
    }
}
