//! DOM Node - Compact representation
//!
//! Links are `NodeId` handles into the arena rather than pointers, so a node
//! can be moved between parents by rewriting five fields.

use crate::forms::ControlState;
use crate::{InternedString, NodeId};

/// Qualified name (namespace + local name), both interned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QualName {
    pub ns: InternedString,
    pub local: InternedString,
}

impl QualName {
    pub fn new(ns: InternedString, local: InternedString) -> Self {
        Self { ns, local }
    }

    /// Name without a namespace
    pub fn local(local: InternedString) -> Self {
        Self {
            ns: InternedString::EMPTY,
            local,
        }
    }

    /// Whether this name carries a namespace
    #[inline]
    pub fn is_namespaced(&self) -> bool {
        !self.ns.is_empty()
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    pub(crate) fn with_data(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Node kind
    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Fragment => NodeKind::Fragment,
            NodeData::ShadowRoot { .. } => NodeKind::ShadowRoot,
            NodeData::Doctype { .. } => NodeKind::Doctype,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
        }
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Character data of text and comment nodes
    #[inline]
    pub fn character_data(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(s) | NodeData::Comment(s) => Some(s),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// Detached container produced by template materialization
    Fragment,
    /// Shadow root attached to `host` (not a child of it)
    ShadowRoot { host: NodeId },
    /// DOCTYPE
    Doctype { name: String },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Coarse node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Fragment,
    ShadowRoot,
    Doctype,
    Element,
    Text,
    Comment,
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    /// Tag name (qualified)
    pub name: QualName,
    /// Attributes in document order
    pub attrs: Vec<Attribute>,
    /// Attached shadow root, if any
    pub shadow_root: NodeId,
    /// Live form-control properties
    pub controls: ControlState,
}

impl ElementData {
    pub fn new(name: QualName) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            shadow_root: NodeId::NONE,
            controls: ControlState::default(),
        }
    }

    /// Find an attribute by qualified name
    pub fn attr(&self, name: QualName) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Set an attribute, returning the previous value
    pub fn set_attr(&mut self, name: QualName, value: String) -> Option<String> {
        for attr in self.attrs.iter_mut() {
            if attr.name == name {
                return Some(std::mem::replace(&mut attr.value, value));
            }
        }
        self.attrs.push(Attribute { name, value });
        None
    }

    /// Remove an attribute, returning its value
    pub fn remove_attr(&mut self, name: QualName) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_replaces_in_place() {
        let name = QualName::local(InternedString(7));
        let other = QualName::local(InternedString(8));
        let mut elem = ElementData::new(QualName::local(InternedString(3)));

        assert_eq!(elem.set_attr(name, "a".into()), None);
        elem.set_attr(other, "b".into());
        assert_eq!(elem.set_attr(name, "c".into()), Some("a".into()));

        // Order is preserved on overwrite
        assert_eq!(elem.attrs[0].value, "c");
        assert_eq!(elem.attrs[1].value, "b");
    }

    #[test]
    fn test_remove_attr() {
        let name = QualName::local(InternedString(7));
        let mut elem = ElementData::new(QualName::local(InternedString(3)));
        elem.set_attr(name, "x".into());

        assert_eq!(elem.remove_attr(name), Some("x".into()));
        assert_eq!(elem.remove_attr(name), None);
    }

    #[test]
    fn test_namespaced_name() {
        assert!(!QualName::local(InternedString(1)).is_namespaced());
        assert!(QualName::new(InternedString(2), InternedString(1)).is_namespaced());
    }
}
