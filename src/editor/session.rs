use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{sleep_until, Instant};

use super::bindings::KeyBindings;
use super::dispatch::{DoubleEscape, Editor, Hooks, Outcome, Step};
use super::keys::{KeyCode, KeyEvent};
use super::paste::PasteState;
use super::state::{EditorOptions, EditorState, Effect, Geometry, HistoryEditPolicy};
use crate::config::Config;
use crate::error::RenderResult;
use crate::input::{InputEvent, KeySource};
use crate::tree::{Menu, NodeId, View};

const ESCAPE_HINT: &str = "Press Escape again to clear";

/// Shared flag a hook can raise to end the running session, e.g. on
/// Ctrl+C. Checked after every key.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Read and reset.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

pub struct SessionOptions {
    pub max_length: Option<usize>,
    pub min_length: usize,
    pub cancelable: bool,
    pub echo: bool,
    pub echo_char: Option<char>,
    pub default_text: String,
    pub cursor_position: Option<isize>,
    pub escape_timeout: Duration,
    pub double_escape_window: Duration,
    pub history_policy: HistoryEditPolicy,
    pub bindings: KeyBindings,
    pub hooks: Hooks,
    pub interrupt: Interrupt,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_length: config.max_length,
            min_length: config.min_length,
            cancelable: config.cancelable,
            echo: true,
            echo_char: None,
            default_text: String::new(),
            cursor_position: None,
            escape_timeout: config.escape_timeout(),
            double_escape_window: config.double_escape_window(),
            history_policy: HistoryEditPolicy::default(),
            bindings: KeyBindings::default(),
            hooks: Hooks::default(),
            interrupt: Interrupt::default(),
        }
    }

    fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            max_length: self.max_length,
            min_length: self.min_length,
            echo: self.echo,
            echo_char: self.echo_char,
            default_text: self.default_text.clone(),
            cursor_position: self.cursor_position,
            history_policy: self.history_policy,
        }
    }
}

/// How a session ended. The history comes back with any in-place edits so
/// the caller can persist it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Submitted { text: String, history: Vec<String> },
    Cancelled { history: Vec<String> },
}

impl SessionOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            SessionOutcome::Submitted { text, .. } => Some(text),
            SessionOutcome::Cancelled { .. } => None,
        }
    }

    pub fn history(&self) -> &[String] {
        match self {
            SessionOutcome::Submitted { history, .. } | SessionOutcome::Cancelled { history } => {
                history
            }
        }
    }
}

struct Timing {
    escape: Duration,
    double_escape: Duration,
}

/// Read one line of input into the View's prompt.
///
/// Keys come from `keys`; animation ticks from the View are applied while
/// waiting. The prompt is left empty when the session ends.
pub async fn run_input_session<W, K>(
    view: &mut View<W>,
    keys: &mut K,
    history: Vec<String>,
    options: SessionOptions,
) -> Result<SessionOutcome>
where
    W: Write + 'static,
    K: KeySource,
{
    let geometry = Geometry {
        width: view.width(),
        prompt_width: view.prompt_width(),
    };
    let state = EditorState::new(&history, &options.editor_options(), geometry);
    let timing = Timing {
        escape: options.escape_timeout,
        double_escape: options.double_escape_window,
    };
    let interrupt = options.interrupt;
    let mut editor = Editor::new(state, options.bindings, options.hooks, options.cancelable);

    view.writer_mut()
        .enable_bracketed_paste()
        .context("failed to enable bracketed paste")?;
    tracing::debug!(history = history.len(), "input session started");

    let result = drive(view, keys, &mut editor, &timing, &interrupt).await;

    let cleanup = finish(view);
    let outcome = result?;
    cleanup.context("failed to reset the prompt")?;

    let history = editor.state.into_history();
    Ok(match outcome {
        Outcome::Submitted(text) => {
            tracing::debug!(len = text.chars().count(), "input submitted");
            SessionOutcome::Submitted { text, history }
        }
        Outcome::Cancelled => {
            tracing::debug!("input cancelled");
            SessionOutcome::Cancelled { history }
        }
    })
}

async fn drive<W, K>(
    view: &mut View<W>,
    keys: &mut K,
    editor: &mut Editor,
    timing: &Timing,
    interrupt: &Interrupt,
) -> Result<Outcome>
where
    W: Write + 'static,
    K: KeySource,
{
    sync_input(view, editor, Effect::Reposition { delta: 0 })?;
    view.set_footer_input_text(&editor.state.text())?;

    let mut escape_deadline: Option<Instant> = None;
    let mut double_escape_deadline: Option<Instant> = None;

    loop {
        let step = tokio::select! {
            biased;

            event = keys.next_event() => match event {
                None => {
                    tracing::debug!("key source closed");
                    return Ok(Outcome::Cancelled);
                }
                Some(InputEvent::Resize { width, height }) => {
                    tracing::debug!(width, height, "terminal resized");
                    view.resize(width, height)?;
                    editor.state.set_geometry(Geometry {
                        width,
                        prompt_width: view.prompt_width(),
                    });
                    sync_input(view, editor, Effect::Reposition { delta: 0 })?;
                    continue;
                }
                Some(InputEvent::Key(key)) => {
                    escape_deadline = None;
                    if view.footer_help_visible() {
                        view.set_footer_help(false)?;
                    } else if opens_help(view, editor, key) {
                        view.set_footer_help(true)?;
                        continue;
                    }
                    let step = editor.handle_key(key);
                    if interrupt.take() {
                        tracing::debug!(key = %key, "session interrupted");
                        return Ok(Outcome::Cancelled);
                    }
                    step
                }
            },

            _ = sleep_until(escape_deadline.unwrap_or_else(Instant::now)), if escape_deadline.is_some() => {
                escape_deadline = None;
                editor.escape_timeout()
            }

            _ = sleep_until(double_escape_deadline.unwrap_or_else(Instant::now)), if double_escape_deadline.is_some() => {
                double_escape_deadline = None;
                view.set_footer_right_text(None)?;
                editor.double_escape_expired()
            }

            tick = view.next_tick() => {
                view.apply_tick(&tick)?;
                continue;
            }
        };

        if step.arm_escape_timer {
            escape_deadline = Some(Instant::now() + timing.escape);
        }
        match step.double_escape {
            Some(DoubleEscape::Arm) => {
                double_escape_deadline = Some(Instant::now() + timing.double_escape);
                view.set_footer_right_text(Some(ESCAPE_HINT.to_string()))?;
            }
            Some(DoubleEscape::Disarm) => {
                double_escape_deadline = None;
                view.set_footer_right_text(None)?;
            }
            None => {}
        }
        if let Some(err) = &step.rejected {
            tracing::debug!(error = %err, "input rejected");
        }
        if let Some(outcome) = step.outcome {
            return Ok(outcome);
        }

        apply_step(view, editor, &step)?;
        if step.effect.changed_text() && editor.state.is_empty() && double_escape_deadline.is_some() {
            // Clearing the input closes the double-escape window.
            double_escape_deadline = None;
            editor.double_escape_expired();
            view.set_footer_right_text(None)?;
        }
    }
}

fn apply_step<W: Write + 'static>(view: &mut View<W>, editor: &Editor, step: &Step) -> RenderResult<()> {
    sync_input(view, editor, step.effect)?;
    if step.effect.changed_text() {
        view.set_footer_input_text(&editor.state.text())?;
    }
    Ok(())
}

/// Bring the prompt on screen in line with the editor.
fn sync_input<W: Write + 'static>(view: &mut View<W>, editor: &Editor, effect: Effect) -> RenderResult<()> {
    let state = &editor.state;
    match effect {
        Effect::None => Ok(()),
        Effect::MoveCursor => {
            view.set_input(&state.display_chars(), state.display_cursor_offset());
            view.place_cursor()
        }
        Effect::Repaint => {
            view.set_input(&state.display_chars(), state.display_cursor_offset());
            view.paint_input()
        }
        Effect::Reposition { .. } => {
            view.set_input(&state.display_chars(), state.display_cursor_offset());
            view.set_prompt_line_count(state.line_count())?;
            view.paint_input()
        }
    }
}

/// `?` on an empty prompt shows the shortcut help instead of typing.
fn opens_help<W: Write + 'static>(view: &View<W>, editor: &Editor, key: KeyEvent) -> bool {
    key == KeyEvent::char('?')
        && view.footer_id().is_some()
        && editor.state.is_empty()
        && editor.state.paste.state() == PasteState::Idle
}

fn finish<W: Write + 'static>(view: &mut View<W>) -> Result<()> {
    view.set_footer_help(false)?;
    view.set_footer_right_text(None)?;
    view.set_footer_input_text("")?;
    view.clear_input()?;
    view.writer_mut().disable_bracketed_paste()?;
    Ok(())
}

/// Let the user pick one of `items` from a menu drawn above the prompt.
///
/// UP and DOWN move the selection, ENTER picks it, ESCAPE or a closed key
/// source cancels. The menu is gone from the screen when this returns.
pub async fn select_option<W, K>(
    view: &mut View<W>,
    keys: &mut K,
    title: &str,
    items: Vec<String>,
    max_visible: usize,
) -> Result<Option<String>>
where
    W: Write + 'static,
    K: KeySource,
{
    if items.is_empty() {
        return Ok(None);
    }
    let count = items.len();
    let id = view
        .show_menu(Menu::new(title, items, max_visible))
        .context("failed to draw the menu")?;
    tracing::debug!(items = count, "menu shown");

    let result = drive_menu(view, keys, id).await;

    let cleanup = view.remove(id);
    let picked = result?;
    cleanup.context("failed to remove the menu")?;
    tracing::debug!(picked = picked.is_some(), "menu closed");
    Ok(picked)
}

async fn drive_menu<W, K>(view: &mut View<W>, keys: &mut K, id: NodeId) -> Result<Option<String>>
where
    W: Write + 'static,
    K: KeySource,
{
    loop {
        let key = tokio::select! {
            biased;

            event = keys.next_event() => match event {
                None => return Ok(None),
                Some(InputEvent::Resize { width, height }) => {
                    view.resize(width, height)?;
                    continue;
                }
                Some(InputEvent::Key(key)) => key,
            },

            tick = view.next_tick() => {
                view.apply_tick(&tick)?;
                continue;
            }
        };

        match key.code {
            KeyCode::Up => view.update_menu(id, Menu::select_previous)?,
            KeyCode::Down => view.update_menu(id, Menu::select_next)?,
            KeyCode::Enter | KeyCode::KpEnter => {
                return Ok(view
                    .menu(id)
                    .and_then(Menu::selected_item)
                    .map(str::to_string));
            }
            KeyCode::Escape => return Ok(None),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::dispatch::EscapePress;
    use crate::terminal::writer::BufferWriter;
    use crate::tree::{Footer, Header};
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedSender};

    fn view() -> View<Vec<u8>> {
        let mut view = View::new(BufferWriter::buffer(40, 20), Duration::from_millis(150));
        view.initialize(Header::new("vexline"), "> ", Footer::new(""))
            .expect("initialize");
        view
    }

    fn send_text(tx: &UnboundedSender<InputEvent>, text: &str) {
        for key in KeyEvent::typed(text) {
            tx.send(InputEvent::Key(key)).expect("send");
        }
    }

    fn send_key(tx: &UnboundedSender<InputEvent>, code: KeyCode) {
        tx.send(InputEvent::Key(KeyEvent::plain(code))).expect("send");
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_line_is_submitted() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_text(&tx, "hello");
        send_key(&tx, KeyCode::Enter);

        let outcome = run_input_session(&mut view, &mut rx, vec!["old".into()], SessionOptions::default())
            .await
            .expect("session");
        assert_eq!(
            outcome,
            SessionOutcome::Submitted {
                text: "hello".to_string(),
                history: vec!["old".to_string()],
            }
        );
        assert!(view.writer_mut().contents().contains("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_key_source_cancels() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel::<InputEvent>();
        drop(tx);
        let outcome = run_input_session(&mut view, &mut rx, Vec::new(), SessionOptions::default())
            .await
            .expect("session");
        assert_eq!(outcome, SessionOutcome::Cancelled { history: Vec::new() });
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_keeps_session_open() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_text(&tx, "ab");
        send_key(&tx, KeyCode::Enter);
        send_text(&tx, "c");
        send_key(&tx, KeyCode::Enter);

        let options = SessionOptions {
            min_length: 3,
            ..SessionOptions::default()
        };
        let outcome = run_input_session(&mut view, &mut rx, Vec::new(), options)
            .await
            .expect("session");
        assert_eq!(outcome.text(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_escape_cancels_after_timeout() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_text(&tx, "draft");
        send_key(&tx, KeyCode::Escape);

        let options = SessionOptions {
            cancelable: true,
            ..SessionOptions::default()
        };
        let outcome = run_input_session(&mut view, &mut rx, Vec::new(), options)
            .await
            .expect("session");
        assert_eq!(outcome, SessionOutcome::Cancelled { history: Vec::new() });
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_escape_clears_then_submit_is_empty() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let presses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&presses);
        let mut options = SessionOptions::default();
        options.hooks.on_escape = Some(Box::new(move |_: &str, _: usize, press: EscapePress| {
            sink.lock().expect("lock").push(press);
        }));

        let task = tokio::spawn(async move {
            let outcome = run_input_session(&mut view, &mut rx, Vec::new(), options).await;
            (outcome, view)
        });

        send_text(&tx, "draft");
        send_key(&tx, KeyCode::Escape);
        tokio::time::sleep(Duration::from_millis(100)).await;
        send_key(&tx, KeyCode::Escape);
        tokio::time::sleep(Duration::from_millis(100)).await;
        send_key(&tx, KeyCode::Enter);

        let (outcome, mut view) = task.await.expect("join");
        assert_eq!(outcome.expect("session").text(), Some(""));
        assert_eq!(
            *presses.lock().expect("lock"),
            vec![EscapePress::First, EscapePress::Second]
        );
        assert!(view.writer_mut().contents().contains(ESCAPE_HINT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_window_expires() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let presses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&presses);
        let mut options = SessionOptions::default();
        options.hooks.on_escape = Some(Box::new(move |_: &str, _: usize, press: EscapePress| {
            sink.lock().expect("lock").push(press);
        }));

        let task = tokio::spawn(async move {
            let outcome = run_input_session(&mut view, &mut rx, Vec::new(), options).await;
            (outcome, view)
        });

        send_text(&tx, "draft");
        send_key(&tx, KeyCode::Escape);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        send_key(&tx, KeyCode::Escape);
        tokio::time::sleep(Duration::from_millis(100)).await;
        send_key(&tx, KeyCode::Enter);

        let (outcome, _view) = task.await.expect("join");
        assert_eq!(outcome.expect("session").text(), Some("draft"));
        assert_eq!(
            *presses.lock().expect("lock"),
            vec![EscapePress::First, EscapePress::Expired, EscapePress::First]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bracketed_paste_is_inserted_literally() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_key(&tx, KeyCode::Escape);
        send_text(&tx, "[200~line one");
        send_key(&tx, KeyCode::Enter);
        send_text(&tx, "line two");
        send_key(&tx, KeyCode::Escape);
        send_text(&tx, "[201~");
        send_key(&tx, KeyCode::Enter);

        let outcome = run_input_session(&mut view, &mut rx, Vec::new(), SessionOptions::default())
            .await
            .expect("session");
        assert_eq!(outcome.text(), Some("line one\nline two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_question_mark_on_empty_input_shows_help() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_text(&tx, "?");
        send_text(&tx, "a?");
        send_key(&tx, KeyCode::Enter);

        let outcome = run_input_session(&mut view, &mut rx, Vec::new(), SessionOptions::default())
            .await
            .expect("session");
        assert_eq!(outcome.text(), Some("a?"));
        assert!(view.writer_mut().contents().contains("/ for commands"));
        assert!(!view.footer_help_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_raised_by_hook_ends_session() {
        let mut view = view();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let interrupt = Interrupt::default();
        let raised = interrupt.clone();
        let mut options = SessionOptions {
            interrupt,
            ..SessionOptions::default()
        };
        options.hooks.on_special_key = Some(Box::new(move |name: &str| {
            if name == "CTRL_C" {
                raised.raise();
                return true;
            }
            false
        }));
        send_text(&tx, "typed");
        tx.send(InputEvent::Key(KeyEvent::ctrl('c'))).expect("send");

        let outcome = run_input_session(&mut view, &mut rx, vec!["prev".into()], options)
            .await
            .expect("session");
        assert_eq!(
            outcome,
            SessionOutcome::Cancelled {
                history: vec!["prev".to_string()]
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_input_grows_prompt_and_resize_rewraps() {
        let mut view = view();
        let prompt = view.prompt_id().expect("prompt");
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_text(&tx, &"x".repeat(45));
        tx.send(InputEvent::Resize { width: 80, height: 20 }).expect("send");
        send_key(&tx, KeyCode::Enter);

        let task = tokio::spawn(async move {
            let outcome = run_input_session(&mut view, &mut rx, Vec::new(), SessionOptions::default()).await;
            (outcome, view)
        });
        let (outcome, view) = task.await.expect("join");
        assert_eq!(outcome.expect("session").text().map(str::len), Some(45));
        // Prompt band shrinks back once the session ends.
        assert_eq!(view.tree().position(prompt).map(|p| p.height), Some(1));
        assert_eq!(view.tree().width(), 80);
    }
}
