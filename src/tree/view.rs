use std::io::Write;
use std::time::Duration;

use super::animation::{AnimationControl, AnimationManager, AnimationTick};
use super::components::{
    ActivityIndicator, Component, Empty, Footer, Header, Menu, Prompt, Separator, Text,
    TextStyle, ToolCall,
};
use super::node::NodeId;
use super::ComponentTree;
use crate::config::DEFAULT_PROMPT;
use crate::error::RenderResult;
use crate::terminal::writer::TerminalWriter;
use crate::ui::input_metrics::{
    ensure_usable, offset_to_coordinate, visual_rows, Coordinate,
};

pub type AnimationCallback<W> =
    Box<dyn FnMut(&mut ComponentTree<W>) -> RenderResult<AnimationControl> + Send>;

pub const ACTIVITY_ANIMATION: &str = "activity";
pub const TOOLS_ANIMATION: &str = "tools";

#[derive(Debug, Default)]
struct InputLine {
    chars: Vec<char>,
    cursor: usize,
}

/// The conversation screen: header, messages, the live prompt and a status
/// footer, plus the timers that animate them.
///
/// Every operation leaves the terminal cursor at the input cursor.
pub struct View<W: Write> {
    tree: ComponentTree<W>,
    animations: AnimationManager<AnimationCallback<W>>,
    animation_interval: Duration,
    header: Option<NodeId>,
    spacer: Option<NodeId>,
    prompt: Option<NodeId>,
    footer: Option<NodeId>,
    activity: Option<NodeId>,
    message_count: usize,
    input: InputLine,
}

impl<W: Write + 'static> View<W> {
    pub fn new(writer: TerminalWriter<W>, animation_interval: Duration) -> Self {
        Self {
            tree: ComponentTree::new(writer),
            animations: AnimationManager::new(),
            animation_interval,
            header: None,
            spacer: None,
            prompt: None,
            footer: None,
            activity: None,
            message_count: 0,
            input: InputLine::default(),
        }
    }

    pub fn tree(&self) -> &ComponentTree<W> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ComponentTree<W> {
        &mut self.tree
    }

    pub fn writer_mut(&mut self) -> &mut TerminalWriter<W> {
        self.tree.writer_mut()
    }

    pub fn width(&self) -> usize {
        self.tree.width()
    }

    pub fn prompt_id(&self) -> Option<NodeId> {
        self.prompt
    }

    pub fn footer_id(&self) -> Option<NodeId> {
        self.footer
    }

    pub fn activity_id(&self) -> Option<NodeId> {
        self.activity
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// Build the fixed frame (header, spacer, prompt, footer) and draw it.
    pub fn initialize(&mut self, header: Header, prompt: &str, footer: Footer) -> RenderResult<()> {
        self.header = Some(self.tree.append_child(None, Component::Header(header)));
        self.spacer = Some(self.tree.append_child(None, Component::Empty(Empty::new(1))));
        self.prompt = Some(self.tree.append_child(None, Component::Prompt(Prompt::new(prompt))));
        self.footer = Some(self.tree.append_child(None, Component::Footer(footer)));
        self.tree.render_full()?;
        self.paint_input()
    }

    pub fn prompt_width(&self) -> usize {
        self.prompt_component()
            .map(Prompt::prompt_width)
            .unwrap_or(DEFAULT_PROMPT.len())
    }

    fn prompt_component(&self) -> Option<&Prompt> {
        match self.tree.find(self.prompt?)?.component() {
            Component::Prompt(prompt) => Some(prompt),
            _ => None,
        }
    }

    fn footer_mut(&mut self) -> Option<&mut Footer> {
        match self.tree.component_mut(self.footer?)? {
            Component::Footer(footer) => Some(footer),
            _ => None,
        }
    }

    fn footer(&self) -> Option<&Footer> {
        match self.tree.find(self.footer?)?.component() {
            Component::Footer(footer) => Some(footer),
            _ => None,
        }
    }

    /// New top-level node placed above the activity line and the prompt.
    fn insert_top(&mut self, component: Component) -> NodeId {
        match self.activity.or(self.prompt) {
            Some(anchor) => self.tree.insert_before(anchor, component),
            None => self.tree.append_child(None, component),
        }
    }

    /// Insert any component above the prompt and draw it.
    pub fn insert_component(&mut self, component: Component) -> RenderResult<NodeId> {
        let id = self.insert_top(component);
        self.tree.mount(id)?;
        self.paint_input()?;
        Ok(id)
    }

    pub fn add_separator(&mut self) -> RenderResult<NodeId> {
        self.insert_component(Component::Separator(Separator::default()))
    }

    /// Draw a selection menu above the prompt.
    pub fn show_menu(&mut self, menu: Menu) -> RenderResult<NodeId> {
        self.insert_component(Component::Menu(menu))
    }

    pub fn menu(&self, id: NodeId) -> Option<&Menu> {
        match self.tree.find(id)?.component() {
            Component::Menu(menu) => Some(menu),
            _ => None,
        }
    }

    /// Change the menu behind `id` and redraw its band.
    pub fn update_menu(&mut self, id: NodeId, change: impl FnOnce(&mut Menu)) -> RenderResult<()> {
        match self.tree.component_mut(id) {
            Some(Component::Menu(menu)) => change(menu),
            _ => return Ok(()),
        }
        self.tree.update_component(id)?;
        self.paint_input()
    }

    pub fn remove(&mut self, id: NodeId) -> RenderResult<()> {
        self.tree.remove_rendered(id)?;
        self.paint_input()
    }

    pub fn add_user_message(&mut self, content: &str) -> RenderResult<NodeId> {
        let id = self.insert_top(Component::UserMessage);
        self.tree.append_child(
            Some(id),
            Component::Text(Text::new(content, TextStyle::User)),
        );
        self.tree.mount(id)?;
        self.bump_message_count()?;
        Ok(id)
    }

    /// Empty assistant message; fill it with `append_assistant_text` and
    /// `add_tool_call`.
    pub fn add_assistant_message(&mut self) -> RenderResult<NodeId> {
        let id = self.insert_top(Component::AssistantMessage);
        self.tree.mount(id)?;
        self.bump_message_count()?;
        Ok(id)
    }

    fn bump_message_count(&mut self) -> RenderResult<()> {
        self.message_count += 1;
        let count = self.message_count;
        if let Some(footer) = self.footer_mut() {
            footer.set_message_count(count);
        }
        self.redraw_footer()
    }

    pub fn append_assistant_text(&mut self, message: NodeId, content: &str) -> RenderResult<NodeId> {
        let style = if self.tree.children(Some(message)).is_empty() {
            TextStyle::Assistant
        } else {
            TextStyle::Default
        };
        let id = self
            .tree
            .append_child(Some(message), Component::Text(Text::new(content, style)));
        self.tree.update_component(id)?;
        self.paint_input()?;
        Ok(id)
    }

    /// Append streamed text to an existing text node.
    pub fn append_to_text(&mut self, id: NodeId, chunk: &str) -> RenderResult<()> {
        if let Some(Component::Text(text)) = self.tree.component_mut(id) {
            text.append_content(chunk);
        }
        self.tree.update_component(id)?;
        self.paint_input()
    }

    pub fn set_text(&mut self, id: NodeId, content: &str) -> RenderResult<()> {
        if let Some(Component::Text(text)) = self.tree.component_mut(id) {
            text.set_content(content);
        }
        self.tree.update_component(id)?;
        self.paint_input()
    }

    pub fn add_tool_call(&mut self, message: NodeId, title: &str) -> RenderResult<NodeId> {
        let id = self
            .tree
            .append_child(Some(message), Component::ToolCall(ToolCall::new(title)));
        self.tree.update_component(id)?;
        self.paint_input()?;
        Ok(id)
    }

    pub fn complete_tool_call(&mut self, id: NodeId, output: &str) -> RenderResult<()> {
        if let Some(Component::ToolCall(tool)) = self.tree.component_mut(id) {
            tool.complete(output);
        }
        self.tree.update_component(id)?;
        self.paint_input()
    }

    pub fn fail_tool_call(&mut self, id: NodeId, error: &str) -> RenderResult<()> {
        if let Some(Component::ToolCall(tool)) = self.tree.component_mut(id) {
            tool.fail(error);
        }
        self.tree.update_component(id)?;
        self.paint_input()
    }

    // --- activity & animations ---------------------------------------------

    /// Show a spinner line above the prompt, replacing any previous one.
    /// Must be called inside a tokio runtime.
    pub fn show_activity(&mut self, text: &str) -> RenderResult<NodeId> {
        self.hide_activity()?;
        let component = Component::Activity(ActivityIndicator::new(text));
        let id = match self.prompt {
            Some(prompt) => self.tree.insert_before(prompt, component),
            None => self.tree.append_child(None, component),
        };
        self.activity = Some(id);
        self.tree.mount(id)?;

        let callback: AnimationCallback<W> = Box::new(move |tree: &mut ComponentTree<W>| {
            match tree.component_mut(id) {
                Some(Component::Activity(activity)) => activity.advance_animation(),
                _ => return Ok(AnimationControl::Stop),
            }
            tree.update_component(id)?;
            Ok(AnimationControl::Continue)
        });
        self.animations
            .start_animation(ACTIVITY_ANIMATION, self.animation_interval, callback);
        self.paint_input()?;
        Ok(id)
    }

    pub fn update_activity(&mut self, text: &str) -> RenderResult<()> {
        let Some(id) = self.activity else {
            return Ok(());
        };
        if let Some(Component::Activity(activity)) = self.tree.component_mut(id) {
            activity.set_text(text);
        }
        self.tree.update_component(id)?;
        self.paint_input()
    }

    pub fn hide_activity(&mut self) -> RenderResult<()> {
        self.animations.stop_animation(ACTIVITY_ANIMATION);
        let Some(id) = self.activity.take() else {
            return Ok(());
        };
        self.tree.remove_rendered(id)?;
        self.paint_input()
    }

    /// Blink the running tool calls of `message` until they all complete.
    pub fn start_tool_animations(&mut self, message: NodeId) {
        let callback: AnimationCallback<W> = Box::new(move |tree: &mut ComponentTree<W>| {
            let children = tree.children(Some(message)).to_vec();
            let mut running = false;
            for child in children {
                if let Some(Component::ToolCall(tool)) = tree.component_mut(child) {
                    if !tool.is_completed() {
                        tool.advance_animation();
                        running = true;
                    }
                }
            }
            if !tree.contains(message) {
                return Ok(AnimationControl::Stop);
            }
            tree.update_component(message)?;
            Ok(if running {
                AnimationControl::Continue
            } else {
                AnimationControl::Stop
            })
        });
        self.animations
            .start_animation(TOOLS_ANIMATION, self.animation_interval, callback);
    }

    pub fn stop_tool_animations(&mut self) {
        self.animations.stop_animation(TOOLS_ANIMATION);
    }

    pub fn has_animation(&self, id: &str) -> bool {
        self.animations.has_animation(id)
    }

    pub async fn next_tick(&mut self) -> AnimationTick {
        self.animations.next_tick().await
    }

    /// Run the callback behind `tick`; stale ticks are ignored.
    pub fn apply_tick(&mut self, tick: &AnimationTick) -> RenderResult<()> {
        let control = match self.animations.callback_for(tick) {
            Some(callback) => callback(&mut self.tree)?,
            None => return Ok(()),
        };
        if control == AnimationControl::Stop {
            self.animations.finish(tick);
        }
        self.paint_input()
    }

    /// Remove all messages, keeping the frame and the activity line.
    pub fn clear_messages(&mut self) -> RenderResult<()> {
        let keep = [self.header, self.spacer, self.prompt, self.footer, self.activity];
        let doomed: Vec<NodeId> = self
            .tree
            .children(None)
            .iter()
            .copied()
            .filter(|id| !keep.contains(&Some(*id)))
            .collect();
        for id in doomed {
            self.tree.remove_child(id);
        }
        self.message_count = 0;
        if let Some(footer) = self.footer_mut() {
            footer.set_message_count(0);
        }
        self.tree.render_full()?;
        self.paint_input()
    }

    // --- prompt & footer -----------------------------------------------------

    /// Resize the prompt band to fit `text`. Returns whether it changed.
    pub fn update_prompt_line_count(&mut self, text: &str) -> RenderResult<bool> {
        let width = self.tree.width();
        let count = match self.prompt_component() {
            Some(prompt) => prompt.calculate_input_line_count(text, width),
            None => return Ok(false),
        };
        self.set_prompt_line_count(count)
    }

    pub fn set_prompt_line_count(&mut self, count: usize) -> RenderResult<bool> {
        let Some(id) = self.prompt else {
            return Ok(false);
        };
        if self.prompt_component().map(Prompt::line_count) == Some(count.max(1)) {
            return Ok(false);
        }
        if let Some(Component::Prompt(prompt)) = self.tree.component_mut(id) {
            prompt.set_line_count(count);
        }
        self.tree.update_component(id)?;
        Ok(true)
    }

    pub fn set_footer_input_text(&mut self, text: &str) -> RenderResult<()> {
        let before = self.footer().map(Footer::right_text);
        if let Some(footer) = self.footer_mut() {
            footer.set_input_text(text);
        }
        if self.footer().map(Footer::right_text) != before {
            self.redraw_footer()?;
        }
        Ok(())
    }

    pub fn set_footer_right_text(&mut self, text: Option<String>) -> RenderResult<()> {
        if let Some(footer) = self.footer_mut() {
            footer.set_right_text(text);
        }
        self.redraw_footer()
    }

    pub fn set_footer_left_text(&mut self, text: &str) -> RenderResult<()> {
        if let Some(footer) = self.footer_mut() {
            footer.set_left_text(text);
        }
        self.redraw_footer()
    }

    pub fn set_footer_help(&mut self, visible: bool) -> RenderResult<()> {
        if self.footer_help_visible() == visible {
            return Ok(());
        }
        if let Some(footer) = self.footer_mut() {
            footer.set_help(visible);
        }
        self.redraw_footer()
    }

    pub fn footer_help_visible(&self) -> bool {
        self.footer().is_some_and(Footer::showing_help)
    }

    fn redraw_footer(&mut self) -> RenderResult<()> {
        if let Some(id) = self.footer {
            self.tree.update_component(id)?;
        }
        self.place_cursor()
    }

    // --- live input ----------------------------------------------------------

    /// Remember what the input shows. Call `paint_input` or `place_cursor`
    /// to put it on screen.
    pub fn set_input(&mut self, chars: &[char], cursor: usize) {
        self.input.chars.clear();
        self.input.chars.extend_from_slice(chars);
        self.input.cursor = cursor.min(chars.len());
    }

    pub fn clear_input(&mut self) -> RenderResult<()> {
        self.set_input(&[], 0);
        self.set_prompt_line_count(1)?;
        self.paint_input()
    }

    fn input_origin(&self) -> Option<(usize, usize)> {
        let band = self.tree.position(self.prompt?)?;
        Some((band.start_row, band.end_row()))
    }

    /// Redraw the input inside the prompt band and park the cursor.
    pub fn paint_input(&mut self) -> RenderResult<()> {
        let Some((start_row, end_row)) = self.input_origin() else {
            return Ok(());
        };
        let width = self.tree.width();
        ensure_usable(width, self.tree.height())?;
        let prompt_width = self.prompt_width();

        for doc_row in start_row..end_row {
            let Some(screen) = self.tree.screen_row(doc_row) else {
                continue;
            };
            let col = if doc_row == start_row { prompt_width + 1 } else { 1 };
            let writer = self.tree.writer_mut();
            writer.move_cursor_to(screen, col)?;
            writer.erase_line_from_cursor()?;
        }

        let start = Coordinate::new(start_row as isize, prompt_width);
        for row in visual_rows(start, &self.input.chars, width) {
            let doc_row = row.row as usize;
            if doc_row >= end_row {
                break;
            }
            if row.text.is_empty() {
                continue;
            }
            let Some(screen) = self.tree.screen_row(doc_row) else {
                continue;
            };
            let writer = self.tree.writer_mut();
            writer.move_cursor_to(screen, row.col + 1)?;
            writer.write_raw(&row.text)?;
        }
        self.place_cursor()
    }

    /// Move the terminal cursor to the input cursor without redrawing.
    pub fn place_cursor(&mut self) -> RenderResult<()> {
        let Some((start_row, end_row)) = self.input_origin() else {
            return Ok(());
        };
        let width = self.tree.width();
        let start = Coordinate::new(start_row as isize, self.prompt_width());
        let cursor = offset_to_coordinate(start, &self.input.chars, self.input.cursor, width);
        let doc_row = (cursor.row as usize).min(end_row.saturating_sub(1)).max(start_row);
        if let Some(screen) = self.tree.screen_row(doc_row) {
            self.tree
                .writer_mut()
                .move_cursor_to(screen, cursor.screen_col(width))?;
        }
        Ok(())
    }

    /// Screen position of the input cursor, 1-based.
    pub fn cursor_screen_position(&self) -> Option<(usize, usize)> {
        let (start_row, end_row) = self.input_origin()?;
        let width = self.tree.width();
        let start = Coordinate::new(start_row as isize, self.prompt_width());
        let cursor = offset_to_coordinate(start, &self.input.chars, self.input.cursor, width);
        let doc_row = (cursor.row as usize).min(end_row.saturating_sub(1)).max(start_row);
        Some((self.tree.screen_row(doc_row)?, cursor.screen_col(width)))
    }

    pub fn resize(&mut self, width: usize, height: usize) -> RenderResult<()> {
        self.tree.writer_mut().set_size(width, height);
        let text: String = self.input.chars.iter().collect();
        let count = self
            .prompt_component()
            .map(|prompt| prompt.calculate_input_line_count(&text, width));
        if let (Some(id), Some(count)) = (self.prompt, count) {
            if let Some(Component::Prompt(prompt)) = self.tree.component_mut(id) {
                prompt.set_line_count(count);
            }
        }
        self.tree.resize(width, height)?;
        self.paint_input()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::writer::BufferWriter;
    use crate::tree::Position;

    fn view(width: usize, height: usize) -> View<Vec<u8>> {
        let mut view = View::new(BufferWriter::buffer(width, height), Duration::from_millis(150));
        view.initialize(Header::new("vexline"), "> ", Footer::new("demo"))
            .expect("initialize");
        view
    }

    fn prompt_position(view: &View<Vec<u8>>) -> Position {
        view.tree()
            .position(view.prompt_id().expect("prompt"))
            .expect("positioned")
    }

    #[test]
    fn test_initialize_lays_out_frame() {
        let view = view(40, 20);
        // header (2) + spacer (1), then the prompt.
        assert_eq!(prompt_position(&view), Position { start_row: 4, height: 1 });
        assert_eq!(view.tree().children(None).len(), 4);
        assert_eq!(view.cursor_screen_position(), Some((4, 3)));
    }

    #[test]
    fn test_user_message_lands_above_prompt() {
        let mut view = view(40, 20);
        let message = view.add_user_message("hello").expect("add");
        let children = view.tree().children(None);
        assert_eq!(children[children.len() - 3], message);
        assert_eq!(view.tree().position(message), Some(Position { start_row: 4, height: 2 }));
        assert_eq!(prompt_position(&view).start_row, 6);
        assert_eq!(view.message_count(), 1);
        assert!(view.tree().positions().is_contiguous(view.tree().children(None)));
    }

    #[test]
    fn test_prompt_line_count_grows_and_shifts_footer() {
        let mut view = view(10, 20);
        let footer = view.footer_id().expect("footer");
        let footer_row = view.tree().position(footer).map(|p| p.start_row);
        // 2-column prompt + 9 characters overflows a 10-column row.
        assert!(view.update_prompt_line_count("abcdefghi").expect("update"));
        assert_eq!(prompt_position(&view).height, 2);
        assert_eq!(
            view.tree().position(footer).map(|p| p.start_row),
            footer_row.map(|row| row + 1)
        );
        assert!(!view.update_prompt_line_count("abcdefghi").expect("update"));
        assert!(view.update_prompt_line_count("").expect("update"));
        assert_eq!(prompt_position(&view).height, 1);
    }

    #[test]
    fn test_paint_input_writes_text_after_prompt() {
        let mut view = view(40, 20);
        view.writer_mut().take_contents();
        let chars: Vec<char> = "hi there".chars().collect();
        view.set_input(&chars, 2);
        view.paint_input().expect("paint");
        let out = view.writer_mut().take_contents();
        assert!(out.contains("hi there"));
        assert_eq!(view.cursor_screen_position(), Some((4, 5)));
    }

    #[test]
    fn test_footer_help_toggles_height() {
        let mut view = view(40, 20);
        let footer = view.footer_id().expect("footer");
        view.set_footer_help(true).expect("help");
        assert!(view.footer_help_visible());
        assert_eq!(view.tree().position(footer).map(|p| p.height), Some(2));
        view.set_footer_help(false).expect("help");
        assert_eq!(view.tree().position(footer).map(|p| p.height), Some(1));
    }

    #[test]
    fn test_footer_right_text_reacts_to_input() {
        let mut view = view(40, 20);
        view.writer_mut().take_contents();
        view.set_footer_input_text("x").expect("footer");
        let out = view.writer_mut().take_contents();
        assert!(!out.contains("? for shortcuts"));
        view.set_footer_input_text("").expect("footer");
        assert!(view.writer_mut().take_contents().contains("? for shortcuts"));
    }

    #[test]
    fn test_clear_messages_keeps_frame() {
        let mut view = view(40, 20);
        view.add_user_message("one").expect("add");
        let reply = view.add_assistant_message().expect("add");
        view.append_assistant_text(reply, "two").expect("text");
        view.add_separator().expect("separator");
        view.clear_messages().expect("clear");
        assert_eq!(view.tree().children(None).len(), 4);
        assert_eq!(view.message_count(), 0);
        assert_eq!(prompt_position(&view).start_row, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_spins_and_hides() {
        let mut view = view(40, 20);
        let id = view.show_activity("Thinking").expect("show");
        assert!(view.has_animation(ACTIVITY_ANIMATION));
        assert_eq!(prompt_position(&view).start_row, 6);

        let tick = view.next_tick().await;
        view.apply_tick(&tick).expect("tick");
        match view.tree().find(id).map(|node| node.component()) {
            Some(Component::Activity(activity)) => assert_eq!(activity.frame(), 1),
            other => panic!("unexpected node: {other:?}"),
        }

        view.hide_activity().expect("hide");
        assert!(!view.has_animation(ACTIVITY_ANIMATION));
        assert!(!view.tree().contains(id));
        assert_eq!(prompt_position(&view).start_row, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_activity_replaces_previous_indicator() {
        let mut view = view(40, 20);
        let first = view.show_activity("one").expect("show");
        let second = view.show_activity("two").expect("show");
        assert!(!view.tree().contains(first));
        assert_eq!(view.activity_id(), Some(second));
        assert_eq!(view.tree().children(None).len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_animation_stops_once_tools_complete() {
        let mut view = view(40, 20);
        let reply = view.add_assistant_message().expect("add");
        let tool = view.add_tool_call(reply, "ls").expect("tool");
        view.start_tool_animations(reply);

        let tick = view.next_tick().await;
        view.apply_tick(&tick).expect("tick");
        assert!(view.has_animation(TOOLS_ANIMATION));

        view.complete_tool_call(tool, "file.txt").expect("complete");
        let tick = view.next_tick().await;
        view.apply_tick(&tick).expect("tick");
        assert!(!view.has_animation(TOOLS_ANIMATION));
    }

    #[test]
    fn test_resize_rewraps_input() {
        let mut view = view(40, 20);
        let chars: Vec<char> = "a".repeat(30).chars().collect();
        view.set_input(&chars, chars.len());
        view.resize(20, 10).expect("resize");
        assert_eq!(prompt_position(&view).height, 2);
        assert_eq!(view.tree().width(), 20);
    }
}
