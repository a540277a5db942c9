//! Attribute Observer
//!
//! Watches one host element for attribute changes. The tree reports
//! changes as `AttributeChanged` reactions; the observer keeps the ones
//! aimed at its target while it is observing and hands them out as
//! records.

use jolt_dom::{LifecycleCallback, NodeId, Reaction};

/// Observed attribute change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub target: NodeId,
    pub name: String,
    pub old_value: Option<String>,
    /// `None` when the attribute was removed
    pub value: Option<String>,
}

/// Attribute observer bound to a single element
#[derive(Debug)]
pub struct AttributeObserver {
    target: NodeId,
    observing: bool,
    attribute_filter: Option<Vec<String>>,
    pending: Vec<AttributeRecord>,
}

impl AttributeObserver {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            observing: false,
            attribute_filter: None,
            pending: Vec::new(),
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Start recording changes to every attribute
    pub fn observe(&mut self) {
        self.observing = true;
    }

    /// Only record changes to the named attributes
    pub fn with_filter<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.attribute_filter = Some(names.iter().map(|n| n.as_ref().to_string()).collect());
        self
    }

    /// Stop observing and drop pending records
    pub fn disconnect(&mut self) {
        self.observing = false;
        self.pending.clear();
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Record a reaction if it is an attribute change this observer wants
    pub fn queue(&mut self, reaction: &Reaction) -> bool {
        if !self.observing
            || reaction.callback != LifecycleCallback::AttributeChanged
            || reaction.element != self.target
        {
            return false;
        }
        let Some(name) = &reaction.attribute_name else {
            return false;
        };
        if let Some(filter) = &self.attribute_filter {
            if !filter.contains(name) {
                return false;
            }
        }

        self.pending.push(AttributeRecord {
            target: reaction.element,
            name: name.clone(),
            old_value: reaction.old_value.clone(),
            value: reaction.new_value.clone(),
        });
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take pending records
    pub fn take_records(&mut self) -> Vec<AttributeRecord> {
        std::mem::take(&mut self.pending)
    }
}
