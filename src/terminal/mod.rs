pub mod writer;

use crossterm::{
    cursor::Show,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io;
use std::sync::Once;

pub use writer::{BufferWriter, TerminalWriter};

static PANIC_HOOK_INSTALLED: Once = Once::new();

pub fn install_panic_hook_once() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = restore();
            original_hook(panic_info);
        }));
    });
}

/// Put the terminal in raw mode for an inline (scrolling) session. No
/// alternate screen: the transcript stays in the normal scrollback.
pub fn setup() -> anyhow::Result<()> {
    install_panic_hook_once();

    enable_raw_mode()?;
    execute!(io::stdout(), EnableBracketedPaste)?;
    tracing::debug!("terminal in raw mode");
    Ok(())
}

pub fn restore() -> anyhow::Result<()> {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), DisableBracketedPaste, Show);
    Ok(())
}

/// Current terminal size as (width, height), falling back to 80x24.
pub fn size() -> (usize, usize) {
    crossterm::terminal::size()
        .map(|(w, h)| (w as usize, h as usize))
        .unwrap_or((80, 24))
}
