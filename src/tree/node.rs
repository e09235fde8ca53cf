use std::fmt;

use super::components::Component;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Source of fresh node ids. Ids are never reused within one tree.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> NodeId;
}

#[derive(Debug, Default)]
pub struct SequentialIds {
    last: u64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> NodeId {
        self.last += 1;
        NodeId(self.last)
    }
}

#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) component: Component,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) dirty: bool,
    pub(crate) cached_height: Option<usize>,
}

impl Node {
    pub(crate) fn new(id: NodeId, component: Component, parent: Option<NodeId>) -> Self {
        Self {
            id,
            component,
            parent,
            children: Vec::new(),
            dirty: true,
            cached_height: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Mutable access marks the node for redraw.
    pub fn component_mut(&mut self) -> &mut Component {
        self.dirty = true;
        self.cached_height = None;
        &mut self.component
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Height at the last render, if nothing changed since.
    pub fn cached_height(&self) -> Option<usize> {
        self.cached_height
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.cached_height = None;
    }
}
