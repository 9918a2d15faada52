//! Shared scene-node state.
//!
//! Layers, widgets and features embed a [`SceneNode`] instead of inheriting
//! from a common base: it holds the children, the modified flag with its
//! generation counter, and the event handlers registered on the node.

use super::events::{EventArgs, EventEmitter, GeoEvent, Subscription};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a node attached to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Children, dirty tracking and event handlers for one node.
#[derive(Debug)]
pub struct SceneNode<C> {
    children: Vec<C>,
    /// Bumped on every `modified()` call
    generation: u64,
    dirty: bool,
    events: EventEmitter,
}

impl<C> Default for SceneNode<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> SceneNode<C> {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            generation: 0,
            dirty: false,
            events: EventEmitter::new(),
        }
    }

    pub fn children(&self) -> &[C] {
        &self.children
    }

    pub fn add_child(&mut self, child: C) {
        self.children.push(child);
    }

    /// Removes the first child matching the predicate.
    pub fn remove_child_where(&mut self, mut predicate: impl FnMut(&C) -> bool) -> Option<C> {
        let pos = self.children.iter().position(|c| predicate(c))?;
        Some(self.children.remove(pos))
    }

    /// Removes and returns all children.
    pub fn take_children(&mut self) -> Vec<C> {
        std::mem::take(&mut self.children)
    }

    /// Marks the node as needing a redraw.
    pub fn modified(&mut self) {
        self.generation += 1;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag, returning whether it was set.
    pub fn clear_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn on(&mut self, event: GeoEvent, handler: impl Fn(&EventArgs) + 'static) -> Subscription {
        self.events.on(event, handler)
    }

    pub fn off(&mut self, subscription: Subscription) -> bool {
        self.events.off(subscription)
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Drops children and handlers. Dirty generation is kept.
    pub fn reset(&mut self) {
        self.children.clear();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_bumps_generation() {
        let mut node: SceneNode<u32> = SceneNode::new();
        assert!(!node.is_dirty());

        node.modified();
        node.modified();
        assert!(node.is_dirty());
        assert_eq!(node.generation(), 2);

        assert!(node.clear_dirty());
        assert!(!node.clear_dirty());
        assert_eq!(node.generation(), 2);
    }

    #[test]
    fn test_remove_child_where() {
        let mut node = SceneNode::new();
        node.add_child(1);
        node.add_child(2);
        node.add_child(3);

        assert_eq!(node.remove_child_where(|c| *c == 2), Some(2));
        assert_eq!(node.remove_child_where(|c| *c == 7), None);
        assert_eq!(node.children(), &[1, 3]);

        assert_eq!(node.take_children(), vec![1, 3]);
        assert!(node.children().is_empty());
    }
}
