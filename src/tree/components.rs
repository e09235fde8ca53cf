use crate::ui::input_metrics::{
    calculate_input_line_count, char_display_width, display_width, truncate_to_display_width,
    truncate_with_ellipsis,
};

/// Opaque styling hook: lines in, decorated lines out.
pub type StyleFn = fn(&[String], StyleTag) -> Vec<String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleTag {
    Default,
    User,
    Assistant,
    Gray,
    Error,
}

pub fn identity_style(lines: &[String], _tag: StyleTag) -> Vec<String> {
    lines.to_vec()
}

/// A leaf that knows how to draw itself at a given width.
pub trait Render {
    /// Content lines, without trailing spacing.
    fn render_lines(&self, width: usize) -> Vec<String>;

    /// Blank lines drawn after the content when the node stands on its own.
    fn spacing(&self) -> usize {
        0
    }

    fn style_tag(&self) -> StyleTag {
        StyleTag::Default
    }

    fn calculate_height(&self, width: usize) -> usize {
        self.render_lines(width).len() + self.spacing()
    }
}

pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const MESSAGE_MARKER: &str = "⏺";
const USER_MARKER: &str = ">";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    pub subtitle: Option<String>,
}

impl Header {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

impl Render for Header {
    fn render_lines(&self, width: usize) -> Vec<String> {
        let banner = match &self.subtitle {
            Some(subtitle) => format!("  {} · {}", self.title, subtitle),
            None => format!("  {}", self.title),
        };
        vec![truncate_with_ellipsis(&banner, width)]
    }

    fn spacing(&self) -> usize {
        1
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Footer {
    left_text: String,
    right_override: Option<String>,
    input_text: String,
    message_count: usize,
    showing_help: bool,
}

impl Footer {
    pub fn new(left_text: impl Into<String>) -> Self {
        Self {
            left_text: left_text.into(),
            ..Self::default()
        }
    }

    pub fn set_left_text(&mut self, text: impl Into<String>) {
        self.left_text = text.into();
    }

    /// Replace the computed right-hand text until cleared with `None`.
    pub fn set_right_text(&mut self, text: Option<String>) {
        self.right_override = text;
    }

    pub fn set_input_text(&mut self, text: &str) {
        if self.input_text != text {
            self.input_text = text.to_string();
        }
    }

    pub fn set_message_count(&mut self, count: usize) {
        self.message_count = count;
    }

    pub fn set_help(&mut self, visible: bool) {
        self.showing_help = visible;
    }

    pub fn showing_help(&self) -> bool {
        self.showing_help
    }

    pub fn left_text(&self) -> &str {
        &self.left_text
    }

    pub fn right_text(&self) -> String {
        if let Some(text) = &self.right_override {
            return text.clone();
        }
        match self.message_count {
            0 if !self.input_text.is_empty() => String::new(),
            0 => "? for shortcuts".to_string(),
            1 => "1 message".to_string(),
            n => format!("{n} messages"),
        }
    }
}

impl Render for Footer {
    fn render_lines(&self, width: usize) -> Vec<String> {
        if self.showing_help {
            let line1 = format!("  {:<25}{:<30}", "/ for commands", "double tap esc to clear input");
            let line2 = format!("  {:<25}{:<30}", "", "shift + ⏎ for newline");
            return vec![
                truncate_to_display_width(&line1, width),
                truncate_to_display_width(&line2, width),
            ];
        }

        let left = &self.left_text;
        let right = self.right_text();
        let padding = width.saturating_sub(display_width(left) + display_width(&right) + 4);
        let line = format!("  {left}{}{right}  ", " ".repeat(padding));
        vec![truncate_to_display_width(&line, width)]
    }

    fn style_tag(&self) -> StyleTag {
        StyleTag::Gray
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextStyle {
    #[default]
    Default,
    User,
    Assistant,
    Gray,
}

/// Word-wrapped paragraph with two columns of padding on each side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    content: String,
    style: TextStyle,
    compact: bool,
}

impl Text {
    pub fn new(content: impl Into<String>, style: TextStyle) -> Self {
        Self {
            content: content.into(),
            style,
            compact: false,
        }
    }

    /// Drop the trailing blank line.
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn append_content(&mut self, content: &str) {
        self.content.push_str(content);
    }

    pub fn style(&self) -> TextStyle {
        self.style
    }

    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
    }
}

impl Render for Text {
    fn render_lines(&self, width: usize) -> Vec<String> {
        let mut lines = wrap_text(&self.content, width);
        let marker = match self.style {
            TextStyle::User => Some(USER_MARKER),
            TextStyle::Assistant => Some(MESSAGE_MARKER),
            TextStyle::Default | TextStyle::Gray => None,
        };
        if let (Some(marker), Some(first)) = (marker, lines.first_mut()) {
            let rest: String = first.chars().skip(2).collect();
            *first = format!("{marker} {rest}");
        }
        lines
    }

    fn spacing(&self) -> usize {
        usize::from(!self.compact)
    }

    fn style_tag(&self) -> StyleTag {
        match self.style {
            TextStyle::Default => StyleTag::Default,
            TextStyle::User => StyleTag::User,
            TextStyle::Assistant => StyleTag::Assistant,
            TextStyle::Gray => StyleTag::Gray,
        }
    }
}

/// Wrap on spaces inside `width - 4` columns, padding each line with two
/// spaces on both sides. Words longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let max = width.saturating_sub(4).max(1);
    let pad = |line: &str| format!("  {}  ", line.trim_end());
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        if paragraph.is_empty() {
            lines.push("    ".to_string());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
            if display_width(word) > max {
                if !current.is_empty() {
                    lines.push(pad(&current));
                    current.clear();
                }
                let mut chunk = String::new();
                for ch in word.chars() {
                    if display_width(&chunk) + char_display_width(ch) > max && !chunk.is_empty() {
                        lines.push(pad(&chunk));
                        chunk.clear();
                    }
                    chunk.push(ch);
                }
                current = chunk;
                continue;
            }
            let candidate_width = if current.is_empty() {
                display_width(word)
            } else {
                display_width(&current) + 1 + display_width(word)
            };
            if candidate_width <= max {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            } else {
                lines.push(pad(&current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            lines.push(pad(&current));
        }
    }

    if lines.is_empty() {
        lines.push("    ".to_string());
    }
    lines
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolStatus {
    Running,
    Completed,
    Error,
}

/// One tool invocation: a status line plus a few lines of output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    title: String,
    status: ToolStatus,
    output: Vec<String>,
    frame: usize,
    max_output_lines: usize,
}

impl ToolCall {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: ToolStatus::Running,
            output: Vec::new(),
            frame: 0,
            max_output_lines: 3,
        }
    }

    pub fn status(&self) -> ToolStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status != ToolStatus::Running
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn complete(&mut self, output: &str) {
        self.status = ToolStatus::Completed;
        self.output = output.lines().map(str::to_string).collect();
    }

    pub fn fail(&mut self, error: &str) {
        self.status = ToolStatus::Error;
        self.output = error.lines().map(str::to_string).collect();
    }

    pub fn advance_animation(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }
}

impl Render for ToolCall {
    fn render_lines(&self, width: usize) -> Vec<String> {
        let marker = match self.status {
            // Blink while running.
            ToolStatus::Running if self.frame % 2 == 1 => " ",
            _ => MESSAGE_MARKER,
        };
        let mut lines = vec![truncate_with_ellipsis(
            &format!("{marker} {}", self.title),
            width,
        )];

        let shown = self.output.len().min(self.max_output_lines);
        for (idx, line) in self.output.iter().take(shown).enumerate() {
            let gutter = if idx == 0 { "  ⎿  " } else { "     " };
            lines.push(truncate_with_ellipsis(&format!("{gutter}{line}"), width));
        }
        let hidden = self.output.len() - shown;
        if hidden > 0 {
            lines.push(truncate_with_ellipsis(
                &format!("     … +{hidden} lines"),
                width,
            ));
        }
        lines
    }

    fn spacing(&self) -> usize {
        1
    }

    fn style_tag(&self) -> StyleTag {
        match self.status {
            ToolStatus::Error => StyleTag::Error,
            _ => StyleTag::Default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityIndicator {
    text: String,
    frame: usize,
}

impl ActivityIndicator {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            frame: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn advance_animation(&mut self) {
        self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
    }

    pub fn frame(&self) -> usize {
        self.frame
    }
}

impl Render for ActivityIndicator {
    fn render_lines(&self, width: usize) -> Vec<String> {
        let line = format!("{} {}", SPINNER_FRAMES[self.frame], self.text);
        vec![truncate_with_ellipsis(&line, width)]
    }

    fn spacing(&self) -> usize {
        1
    }

    fn style_tag(&self) -> StyleTag {
        StyleTag::Gray
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Empty {
    pub lines: usize,
}

impl Empty {
    pub fn new(lines: usize) -> Self {
        Self { lines }
    }
}

impl Render for Empty {
    fn render_lines(&self, _width: usize) -> Vec<String> {
        vec![String::new(); self.lines]
    }
}

/// Title plus a scrolling window of selectable items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Menu {
    title: String,
    items: Vec<String>,
    selected: usize,
    offset: usize,
    max_visible: usize,
}

impl Menu {
    pub fn new(title: impl Into<String>, items: Vec<String>, max_visible: usize) -> Self {
        Self {
            title: title.into(),
            items,
            selected: 0,
            offset: 0,
            max_visible: max_visible.max(1),
        }
    }

    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
        self.selected = 0;
        self.offset = 0;
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }

    pub fn select(&mut self, index: usize) {
        if self.items.is_empty() {
            return;
        }
        self.selected = index.min(self.items.len() - 1);
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + self.max_visible {
            self.offset = self.selected + 1 - self.max_visible;
        }
    }

    pub fn select_next(&mut self) {
        self.select(self.selected + 1);
    }

    pub fn select_previous(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }
}

impl Render for Menu {
    fn render_lines(&self, width: usize) -> Vec<String> {
        let mut lines = vec![truncate_with_ellipsis(&format!("  {}", self.title), width)];
        for (idx, item) in self
            .items
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.max_visible)
        {
            let marker = if idx == self.selected { "›" } else { " " };
            lines.push(truncate_with_ellipsis(&format!("  {marker} {item}"), width));
        }
        lines
    }
}

/// The prompt string followed by the rows the input below it occupies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    prompt: String,
    line_count: usize,
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PROMPT)
    }
}

impl Prompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            line_count: 1,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn prompt_width(&self) -> usize {
        display_width(&self.prompt)
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn set_line_count(&mut self, count: usize) {
        self.line_count = count.max(1);
    }

    pub fn calculate_input_line_count(&self, text: &str, width: usize) -> usize {
        calculate_input_line_count(self.prompt_width(), text, width)
    }
}

impl Render for Prompt {
    fn render_lines(&self, _width: usize) -> Vec<String> {
        let mut lines = vec![self.prompt.clone()];
        lines.extend(std::iter::repeat(String::new()).take(self.line_count - 1));
        lines
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Separator {
    pub ch: char,
}

impl Default for Separator {
    fn default() -> Self {
        Self { ch: '─' }
    }
}

impl Render for Separator {
    fn render_lines(&self, width: usize) -> Vec<String> {
        let cells = width / char_display_width(self.ch).max(1);
        vec![self.ch.to_string().repeat(cells)]
    }

    fn style_tag(&self) -> StyleTag {
        StyleTag::Gray
    }
}

/// Every node kind the tree can hold. Containers carry no data of their
/// own; their children hold the content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Component {
    Header(Header),
    Footer(Footer),
    Text(Text),
    ToolCall(ToolCall),
    Activity(ActivityIndicator),
    Empty(Empty),
    Menu(Menu),
    Prompt(Prompt),
    Separator(Separator),
    UserMessage,
    AssistantMessage,
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Header(_) => "header",
            Component::Footer(_) => "footer",
            Component::Text(_) => "text",
            Component::ToolCall(_) => "tool-call",
            Component::Activity(_) => "activity",
            Component::Empty(_) => "empty",
            Component::Menu(_) => "menu",
            Component::Prompt(_) => "prompt",
            Component::Separator(_) => "separator",
            Component::UserMessage => "user-message",
            Component::AssistantMessage => "assistant-message",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Component::UserMessage | Component::AssistantMessage)
    }

    pub fn as_render(&self) -> Option<&dyn Render> {
        match self {
            Component::Header(c) => Some(c),
            Component::Footer(c) => Some(c),
            Component::Text(c) => Some(c),
            Component::ToolCall(c) => Some(c),
            Component::Activity(c) => Some(c),
            Component::Empty(c) => Some(c),
            Component::Menu(c) => Some(c),
            Component::Prompt(c) => Some(c),
            Component::Separator(c) => Some(c),
            Component::UserMessage | Component::AssistantMessage => None,
        }
    }
}
