//! Jolt DOM - Render Tree
//!
//! Arena-backed node tree that the component runtime renders into.
//! Handles are generational, so a released node can never be reached
//! through a stale id even after its slot is reused.

mod document;
mod events;
mod forms;
mod interner;
mod node;
mod operations;
mod reactions;
mod tree;
mod tree_walker;

pub use document::Document;
pub use events::{Event, EventHandler, Listener};
pub use forms::{ControlState, InputType};
pub use interner::{InternedString, StringInterner};
pub use node::{Attribute, ElementData, Node, NodeData, NodeKind, QualName};
pub use operations::{DomError, DomResult};
pub use reactions::{
    is_custom_element_name, is_valid_custom_element_name, LifecycleCallback, Reaction,
    ReactionQueue,
};
pub use tree::{AttrSnapshot, DomTree};
pub use tree_walker::{TreeWalker, WhatToShow};

/// HTML namespace URI
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Node identifier (generational index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Null handle
    pub const NONE: NodeId = NodeId {
        index: u32::MAX,
        generation: 0,
    };

    /// Document root of every tree
    pub const ROOT: NodeId = NodeId {
        index: 0,
        generation: 0,
    };

    /// Whether this handle points anywhere
    #[inline]
    pub fn is_valid(self) -> bool {
        self.index != u32::MAX
    }

    /// Slot index (diagnostics only)
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    pub(crate) fn option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
