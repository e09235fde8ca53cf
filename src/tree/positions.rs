use std::collections::HashMap;

use super::node::NodeId;

/// Where a top-level node was last drawn, in document rows (1-based,
/// counted from the first row the tree ever drew).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub start_row: usize,
    pub height: usize,
}

impl Position {
    pub fn end_row(&self) -> usize {
        self.start_row + self.height
    }
}

#[derive(Clone, Debug, Default)]
pub struct PositionTable {
    entries: HashMap<NodeId, Position>,
}

impl PositionTable {
    pub fn get(&self, id: NodeId) -> Option<Position> {
        self.entries.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn insert(&mut self, id: NodeId, position: Position) {
        self.entries.insert(id, position);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Position> {
        self.entries.remove(&id)
    }

    pub fn set_height(&mut self, id: NodeId, height: usize) {
        if let Some(position) = self.entries.get_mut(&id) {
            position.height = height;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move every positioned node after `changed` in `order` by `delta` rows.
    pub fn shift_after(&mut self, order: &[NodeId], changed: NodeId, delta: isize) {
        if delta == 0 {
            return;
        }
        let Some(idx) = order.iter().position(|id| *id == changed) else {
            return;
        };
        for id in &order[idx + 1..] {
            if let Some(position) = self.entries.get_mut(id) {
                position.start_row = position.start_row.saturating_add_signed(delta).max(1);
            }
        }
    }

    /// Last row covered by any positioned node, 0 when nothing is drawn.
    pub fn bottom(&self) -> usize {
        self.entries
            .values()
            .map(|position| position.end_row().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    /// True when the positioned nodes in `order` tile the rows from 1 with
    /// no gaps or overlaps.
    pub fn is_contiguous(&self, order: &[NodeId]) -> bool {
        let mut next = 1;
        for id in order {
            let Some(position) = self.get(*id) else {
                continue;
            };
            if position.start_row != next {
                return false;
            }
            next = position.end_row();
        }
        true
    }
}
