use anyhow::Result;
use crossterm::style::Stylize;
use std::io::Stdout;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use vexline::config::Config;
use vexline::editor::{Interrupt, SessionOptions, SessionOutcome};
use vexline::error::RenderResult;
use vexline::input::StdinKeySource;
use vexline::terminal::{self, TerminalWriter};
use vexline::tree::{Footer, Header, NodeId, StyleTag, View};
use vexline::{logging, run_input_session};

const THINKING: Duration = Duration::from_millis(600);
const TOOL_RUN: Duration = Duration::from_millis(450);

fn style_lines(lines: &[String], tag: StyleTag) -> Vec<String> {
    lines
        .iter()
        .map(|line| match tag {
            StyleTag::Gray => line.as_str().dark_grey().to_string(),
            StyleTag::User => line.as_str().grey().to_string(),
            StyleTag::Error => line.as_str().red().to_string(),
            StyleTag::Assistant | StyleTag::Default => line.clone(),
        })
        .collect()
}

/// Keep animations running for `duration` without reading keys.
async fn animate_for(view: &mut View<Stdout>, duration: Duration) -> RenderResult<()> {
    let deadline = Instant::now() + duration;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return Ok(()),
            tick = view.next_tick() => view.apply_tick(&tick)?,
        }
    }
}

fn summarize(text: &str) -> String {
    let words = text.split_whitespace().count();
    let chars = text.chars().count();
    let lines = text.lines().count().max(1);
    format!("{words} words, {chars} characters, {lines} lines")
}

/// A canned assistant turn: spinner, one tool call, then a short answer.
async fn fake_reply(view: &mut View<Stdout>, text: &str) -> RenderResult<NodeId> {
    view.show_activity("Thinking…")?;
    animate_for(view, THINKING).await?;
    view.hide_activity()?;

    let message = view.add_assistant_message()?;
    view.append_assistant_text(message, "Let me look at that.")?;
    let tool = view.add_tool_call(message, "count_words(input)")?;
    view.start_tool_animations(message);
    animate_for(view, TOOL_RUN).await?;
    view.complete_tool_call(tool, &summarize(text))?;
    view.stop_tool_animations();

    let first_line = text.lines().next().unwrap_or_default();
    view.append_assistant_text(message, &format!("You said: {first_line}"))?;
    Ok(message)
}

fn session_options(config: &Config) -> SessionOptions {
    let interrupt = Interrupt::default();
    let raise = interrupt.clone();
    let mut options = SessionOptions::from_config(config);
    options.interrupt = interrupt;
    options.hooks.on_special_key = Some(Box::new(move |name: &str| match name {
        "CTRL_C" | "CTRL_D" => {
            raise.raise();
            true
        }
        _ => false,
    }));
    options
}

async fn run(config: Config) -> Result<()> {
    let mut view = View::new(TerminalWriter::stdout()?, config.animation_interval());
    view.tree_mut().set_style(style_lines);
    view.initialize(
        Header::new("vexline").with_subtitle(env!("CARGO_PKG_VERSION")),
        &config.prompt,
        Footer::new("inline prompt demo"),
    )?;

    let mut keys = StdinKeySource::spawn();
    let mut history = Vec::new();

    loop {
        let outcome = run_input_session(&mut view, &mut keys, history, session_options(&config)).await?;
        let text = match outcome {
            SessionOutcome::Submitted { text, history: kept } => {
                history = kept;
                text
            }
            SessionOutcome::Cancelled { history: kept } => {
                history = kept;
                break;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        history.push(text.clone());

        if text.trim() == "/clear" {
            view.clear_messages()?;
            continue;
        }
        view.add_user_message(&text)?;
        fake_reply(&mut view, &text).await?;
    }

    tracing::info!(entries = history.len(), "demo finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    let _log_guard = logging::init(config.log_path.as_deref());

    terminal::setup()?;
    let result = run(config).await;
    terminal::restore()?;
    println!();
    result
}
