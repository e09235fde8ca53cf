//! Retained component tree drawn inline in the terminal.
//!
//! Every top-level node owns a contiguous band of document rows recorded in
//! a [`PositionTable`]. Updating one node redraws only its band: same height
//! repaints in place, growth opens lines below it, shrinkage deletes the
//! surplus. Nodes after it move by the height difference. Anything the
//! diff cannot express falls back to a full redraw.

pub mod animation;
pub mod components;
pub mod node;
pub mod positions;
pub mod view;

use std::collections::HashMap;
use std::io::Write;

use crate::error::RenderResult;
use crate::terminal::writer::TerminalWriter;
use crate::ui::input_metrics::ensure_usable;

pub use animation::{AnimationControl, AnimationManager, AnimationTick};
pub use components::{
    ActivityIndicator, Component, Empty, Footer, Header, Menu, Prompt, Render, Separator,
    StyleFn, StyleTag, Text, TextStyle, ToolCall, ToolStatus,
};
pub use node::{IdGenerator, Node, NodeId, SequentialIds};
pub use positions::{Position, PositionTable};
pub use view::View;

pub struct ComponentTree<W: Write> {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    positions: PositionTable,
    ids: Box<dyn IdGenerator>,
    writer: TerminalWriter<W>,
    style: StyleFn,
    /// Document row shown on screen row 1.
    viewport_top: usize,
}

impl<W: Write> ComponentTree<W> {
    pub fn new(writer: TerminalWriter<W>) -> Self {
        Self::with_id_generator(writer, Box::new(SequentialIds::default()))
    }

    pub fn with_id_generator(writer: TerminalWriter<W>, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            positions: PositionTable::default(),
            ids,
            writer,
            style: components::identity_style,
            viewport_top: 1,
        }
    }

    pub fn set_style(&mut self, style: StyleFn) {
        self.style = style;
    }

    pub fn writer(&self) -> &TerminalWriter<W> {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut TerminalWriter<W> {
        &mut self.writer
    }

    pub fn width(&self) -> usize {
        self.writer.width()
    }

    pub fn height(&self) -> usize {
        self.writer.height()
    }

    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.positions.get(id)
    }

    pub fn viewport_top(&self) -> usize {
        self.viewport_top
    }

    /// Screen row (1-based) of a document row, if it is on screen.
    pub fn screen_row(&self, doc_row: usize) -> Option<usize> {
        let bottom = self.viewport_top + self.height();
        (doc_row >= self.viewport_top && doc_row < bottom).then(|| doc_row - self.viewport_top + 1)
    }

    // --- structure -------------------------------------------------------

    /// Attach a new node as the last child of `parent` (or of the root).
    pub fn append_child(&mut self, parent: Option<NodeId>, component: Component) -> NodeId {
        let id = self.ids.next_id();
        let parent = parent.filter(|pid| self.nodes.contains_key(pid));
        match parent.and_then(|pid| self.nodes.get_mut(&pid)) {
            Some(parent_node) => {
                parent_node.children.push(id);
                parent_node.mark_dirty();
            }
            None => self.roots.push(id),
        }
        self.nodes.insert(id, Node::new(id, component, parent));
        id
    }

    /// Insert a new sibling right before `anchor`. Appends to the root when
    /// the anchor is unknown.
    pub fn insert_before(&mut self, anchor: NodeId, component: Component) -> NodeId {
        self.insert_sibling(anchor, component, 0)
    }

    pub fn insert_after(&mut self, anchor: NodeId, component: Component) -> NodeId {
        self.insert_sibling(anchor, component, 1)
    }

    fn insert_sibling(&mut self, anchor: NodeId, component: Component, offset: usize) -> NodeId {
        let Some(parent) = self.nodes.get(&anchor).map(|node| node.parent) else {
            return self.append_child(None, component);
        };
        let id = self.ids.next_id();
        let siblings = match parent {
            Some(pid) => match self.nodes.get_mut(&pid) {
                Some(parent_node) => {
                    parent_node.mark_dirty();
                    &mut parent_node.children
                }
                None => &mut self.roots,
            },
            None => &mut self.roots,
        };
        let idx = siblings
            .iter()
            .position(|sibling| *sibling == anchor)
            .map_or(siblings.len(), |idx| idx + offset);
        siblings.insert(idx, id);
        self.nodes.insert(id, Node::new(id, component, parent));
        id
    }

    /// Detach `id` and its subtree. Nothing is redrawn; see
    /// [`ComponentTree::remove_rendered`].
    pub fn remove_child(&mut self, id: NodeId) -> Option<Component> {
        let node = self.nodes.remove(&id)?;
        match node.parent.and_then(|pid| self.nodes.get_mut(&pid)) {
            Some(parent) => {
                parent.children.retain(|child| *child != id);
                parent.mark_dirty();
            }
            None => self.roots.retain(|root| *root != id),
        }
        self.positions.remove(id);
        let mut stack = node.children;
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                stack.extend(removed.children);
            }
        }
        Some(node.component)
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Mutable component access; marks the node dirty.
    pub fn component_mut(&mut self, id: NodeId) -> Option<&mut Component> {
        self.nodes.get_mut(&id).map(Node::component_mut)
    }

    /// Children of `parent`, or the top-level nodes for `None`.
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(pid) => self
                .nodes
                .get(&pid)
                .map(|node| node.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn top_level_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.nodes.get(&current)?.parent {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }

    // --- rendering -------------------------------------------------------

    /// Lines for `id` and its subtree. Nested nodes leave spacing to their
    /// container.
    pub fn render_node(&self, id: NodeId, width: usize) -> Vec<String> {
        self.render_inner(id, width, false)
    }

    fn render_inner(&self, id: NodeId, width: usize, nested: bool) -> Vec<String> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        match &node.component {
            Component::UserMessage => {
                let mut lines: Vec<String> = node
                    .children
                    .iter()
                    .flat_map(|child| self.render_inner(*child, width, true))
                    .collect();
                if !lines.is_empty() && !nested {
                    lines.push(String::new());
                }
                lines
            }
            Component::AssistantMessage => {
                let mut lines = Vec::new();
                for (idx, child) in node.children.iter().enumerate() {
                    if idx > 0 {
                        lines.push(String::new());
                    }
                    lines.extend(self.render_inner(*child, width, true));
                }
                if !lines.is_empty() && !nested {
                    lines.push(String::new());
                }
                lines
            }
            component => match component.as_render() {
                Some(leaf) => {
                    let mut lines = (self.style)(&leaf.render_lines(width), leaf.style_tag());
                    if !nested {
                        lines.extend(std::iter::repeat(String::new()).take(leaf.spacing()));
                    }
                    lines
                }
                None => Vec::new(),
            },
        }
    }

    pub fn calculate_height(&self, id: NodeId, width: usize) -> usize {
        self.render_node(id, width).len()
    }

    /// Clear the screen and draw every top-level node from row 1.
    pub fn render_full(&mut self) -> RenderResult<()> {
        let width = self.width();
        let height = self.height();
        ensure_usable(width, height)?;

        self.writer.clear_screen()?;
        self.positions.clear();

        let mut row = 1;
        let mut first = true;
        for id in self.roots.clone() {
            let lines = self.render_node(id, width);
            for line in &lines {
                if !first {
                    self.writer.write_raw("\r\n")?;
                }
                first = false;
                self.writer.write_raw(line)?;
            }
            self.positions.insert(
                id,
                Position {
                    start_row: row,
                    height: lines.len(),
                },
            );
            row += lines.len();
            self.mark_clean(id, lines.len());
        }

        let total = row - 1;
        self.viewport_top = total.saturating_sub(height).saturating_add(1);
        tracing::debug!(rows = total, viewport_top = self.viewport_top, "full render");
        Ok(())
    }

    /// Redraw the top-level band containing `id`.
    pub fn update_component(&mut self, id: NodeId) -> RenderResult<()> {
        let Some(top) = self.top_level_of(id) else {
            return Ok(());
        };
        let Some(position) = self.positions.get(top) else {
            tracing::trace!(node = %top, "node not positioned; full render");
            return self.render_full();
        };

        let width = self.width();
        ensure_usable(width, self.height())?;
        let lines = self.render_node(top, width);
        let old = position.height;
        let new = lines.len();

        if new != old && position.start_row < self.viewport_top {
            tracing::trace!(node = %top, "band scrolled off; full render");
            return self.render_full();
        }

        if new > old {
            self.grow(position, new - old)?;
        } else if new < old {
            self.shrink(position, old - new)?;
        }
        // `grow` may have scrolled the viewport; recompute against it.
        self.paint_rows(position.start_row, &lines, old.max(new))?;

        self.positions.set_height(top, new);
        self.positions
            .shift_after(&self.roots, top, new as isize - old as isize);
        self.mark_clean(top, new);
        tracing::trace!(node = %top, old, new, "component updated");
        Ok(())
    }

    /// Position a freshly added top-level node between its neighbours and
    /// draw it by growing from zero rows.
    pub fn mount(&mut self, id: NodeId) -> RenderResult<()> {
        let Some(top) = self.top_level_of(id) else {
            return Ok(());
        };
        if !self.positions.contains(top) {
            let start_row = self.next_start_row(top);
            if start_row < self.viewport_top {
                return self.render_full();
            }
            self.positions.insert(top, Position { start_row, height: 0 });
        }
        self.update_component(top)
    }

    /// Remove a node and close the rows its band occupied.
    pub fn remove_rendered(&mut self, id: NodeId) -> RenderResult<()> {
        let top = self.top_level_of(id);
        if top != Some(id) {
            // Nested: detach and redraw the band that held it.
            self.remove_child(id);
            return match top {
                Some(top) => self.update_component(top),
                None => Ok(()),
            };
        }

        let position = self.positions.get(id);
        let order = self.roots.clone();
        self.remove_child(id);
        let Some(position) = position else {
            return Ok(());
        };
        if position.height == 0 {
            return Ok(());
        }
        if position.start_row < self.viewport_top {
            return self.render_full();
        }

        if let Some(screen) = self.screen_row(position.start_row) {
            self.writer.move_cursor_to(screen, 1)?;
            self.writer.scroll_region_up(position.height)?;
        }
        // `order` still holds the removed id, so its followers shift.
        self.positions
            .shift_after(&order, id, -(position.height as isize));
        Ok(())
    }

    /// Re-layout after a terminal resize.
    pub fn resize(&mut self, width: usize, height: usize) -> RenderResult<()> {
        self.writer.set_size(width, height);
        for node in self.nodes.values_mut() {
            node.mark_dirty();
        }
        self.render_full()
    }

    fn next_start_row(&self, id: NodeId) -> usize {
        let idx = self.roots.iter().position(|root| *root == id).unwrap_or(0);
        self.roots[idx + 1..]
            .iter()
            .find_map(|later| self.positions.get(*later))
            .map(|position| position.start_row)
            .unwrap_or_else(|| self.positions.bottom() + 1)
    }

    /// Open `delta` blank rows right after `position`'s band.
    fn grow(&mut self, position: Position, delta: usize) -> RenderResult<()> {
        let height = self.height();
        let new_bottom = self.positions.bottom() + delta;
        let screen_bottom = self.viewport_top + height - 1;
        if new_bottom > screen_bottom {
            // Scroll the viewport so the grown document still ends on screen.
            let needed = new_bottom - screen_bottom;
            self.writer.move_cursor_to(height, 1)?;
            self.writer.newlines(needed)?;
            self.viewport_top += needed;
        }

        // A band ending above the viewport has nothing visible to push down.
        if let Some(screen) = self.screen_row(position.end_row()) {
            self.writer.move_cursor_to(screen, 1)?;
            self.writer.scroll_region_down(delta)?;
        }
        Ok(())
    }

    /// Delete the `delta` rows at the end of `position`'s band.
    fn shrink(&mut self, position: Position, delta: usize) -> RenderResult<()> {
        let first_removed = position.end_row() - delta;
        if let Some(screen) = self.screen_row(first_removed) {
            self.writer.move_cursor_to(screen, 1)?;
            self.writer.scroll_region_up(delta)?;
        }
        Ok(())
    }

    fn paint_rows(&mut self, start_row: usize, lines: &[String], rows: usize) -> RenderResult<()> {
        for offset in 0..rows.min(lines.len()) {
            let Some(screen) = self.screen_row(start_row + offset) else {
                continue;
            };
            self.writer.move_cursor_to(screen, 1)?;
            self.writer.erase_line()?;
            self.writer.write_raw(&lines[offset])?;
        }
        Ok(())
    }

    fn mark_clean(&mut self, id: NodeId, height: usize) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&current) {
                node.dirty = false;
                node.cached_height = None;
                stack.extend(node.children.iter().copied());
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.cached_height = Some(height);
        }
    }
}
