//! Custom Element Reactions
//!
//! The tree records connect/disconnect/attribute-change reactions for
//! elements with a hyphenated tag name. The component runtime drains the
//! queue and drives its lifecycle state machines from it.

use std::collections::VecDeque;

use crate::NodeId;

/// Custom element lifecycle callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCallback {
    Connected,
    Disconnected,
    AttributeChanged,
}

/// Pending reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub callback: LifecycleCallback,
    pub element: NodeId,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl Reaction {
    pub fn connected(element: NodeId) -> Self {
        Self {
            callback: LifecycleCallback::Connected,
            element,
            attribute_name: None,
            old_value: None,
            new_value: None,
        }
    }

    pub fn disconnected(element: NodeId) -> Self {
        Self {
            callback: LifecycleCallback::Disconnected,
            ..Self::connected(element)
        }
    }

    pub fn attribute_changed(
        element: NodeId,
        name: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            callback: LifecycleCallback::AttributeChanged,
            element,
            attribute_name: Some(name.to_string()),
            old_value,
            new_value,
        }
    }
}

/// FIFO reaction queue
#[derive(Debug, Default)]
pub struct ReactionQueue {
    pending: VecDeque<Reaction>,
}

impl ReactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, reaction: Reaction) {
        self.pending.push_back(reaction);
    }

    pub fn drain(&mut self) -> Vec<Reaction> {
        self.pending.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Whether a tag name denotes a custom element (contains a hyphen)
#[inline]
pub fn is_custom_element_name(name: &str) -> bool {
    name.contains('-')
}

/// Validate a custom element name for registration
pub fn is_valid_custom_element_name(name: &str) -> bool {
    if !is_custom_element_name(name) {
        return false;
    }

    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return false;
    }

    if name.chars().any(|c| c.is_ascii_uppercase() || c.is_whitespace() || c == '/' || c == '>') {
        return false;
    }

    const RESERVED: &[&str] = &[
        "annotation-xml",
        "color-profile",
        "font-face",
        "font-face-src",
        "font-face-uri",
        "font-face-format",
        "font-face-name",
        "missing-glyph",
    ];
    !RESERVED.contains(&name)
}
