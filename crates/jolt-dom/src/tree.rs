//! DOM Tree (generational arena)
//!
//! Every node of a document lives in one arena: the mounted tree, detached
//! fragments produced by template materialization, and shadow trees. Nodes
//! move between them by relinking, which is what lets the reconciler adopt
//! freshly materialized nodes into the live tree.

use std::collections::HashMap;

use crate::events::Listener;
use crate::reactions::{is_custom_element_name, LifecycleCallback, Reaction, ReactionQueue};
use crate::{
    DomError, DomResult, ElementData, InternedString, Node, NodeData, NodeId, NodeKind, QualName,
    StringInterner, HTML_NAMESPACE,
};

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Owned copy of one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSnapshot {
    /// Namespace URI, empty for plain attributes
    pub namespace: String,
    pub name: String,
    pub value: String,
}

impl AttrSnapshot {
    #[inline]
    pub fn is_namespaced(&self) -> bool {
        !self.namespace.is_empty()
    }
}

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    interner: StringInterner,
    html_ns: InternedString,
    pub(crate) listeners: HashMap<NodeId, Vec<Listener>>,
    reactions: ReactionQueue,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        let mut interner = StringInterner::new();
        let html_ns = interner.intern(HTML_NAMESPACE);
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            interner,
            html_ns,
            listeners: HashMap::new(),
            reactions: ReactionQueue::new(),
        };
        tree.alloc(NodeData::Document);
        tree
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.live += 1;
        let node = Node::with_data(data);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub(crate) fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound(id))
    }

    pub(crate) fn element(&self, id: NodeId) -> DomResult<&ElementData> {
        self.node(id)?.as_element().ok_or(DomError::NotAnElement(id))
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    /// Whether a handle still resolves
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if the tree holds nothing but the document
    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    /// Access the string interner
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut StringInterner {
        &mut self.interner
    }

    /// Resolve an interned string
    #[inline]
    pub fn resolve(&self, s: InternedString) -> &str {
        self.interner.get(s)
    }

    /// Approximate memory footprint in bytes
    pub fn memory_usage(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Slot>() + self.interner.memory_usage()
    }

    // --- Creation ---

    /// Create a detached HTML element
    pub fn create_element(&mut self, local: &str) -> NodeId {
        let local = self.interner.intern(&local.to_ascii_lowercase());
        let name = QualName::new(self.html_ns, local);
        self.alloc(NodeData::Element(ElementData::new(name)))
    }

    /// Create a detached element in the given namespace
    pub fn create_element_ns(&mut self, ns: &str, local: &str) -> NodeId {
        let name = QualName::new(self.interner.intern(ns), self.interner.intern(local));
        self.alloc(NodeData::Element(ElementData::new(name)))
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Text(content.to_string()))
    }

    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Comment(content.to_string()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::Fragment)
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::Doctype {
            name: name.to_string(),
        })
    }

    /// Attach a shadow root to an element
    pub fn attach_shadow(&mut self, host: NodeId) -> DomResult<NodeId> {
        if self.element(host)?.shadow_root.is_valid() {
            return Err(DomError::ShadowRootExists(host));
        }
        let shadow = self.alloc(NodeData::ShadowRoot { host });
        self.element_mut(host)?.shadow_root = shadow;
        Ok(shadow)
    }

    /// Shadow root of an element
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.get(host)?.as_element()?.shadow_root.option()
    }

    // --- Navigation ---

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent.option()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child.option()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last_child.option()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling.option()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling.option()
    }

    /// Iterate over the children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Child at a position
    pub fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.children(parent).nth(index)
    }

    pub fn child_count(&self, parent: NodeId) -> usize {
        self.children(parent).count()
    }

    /// Node kind
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// `nodeName`: tag for elements, `#text`/`#comment`/... otherwise
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get(id)?;
        Some(match &node.data {
            NodeData::Element(elem) => self.interner.get(elem.name.local),
            NodeData::Text(_) => "#text",
            NodeData::Comment(_) => "#comment",
            NodeData::Fragment => "#document-fragment",
            NodeData::ShadowRoot { .. } => "#shadow-root",
            NodeData::Document => "#document",
            NodeData::Doctype { .. } => "#doctype",
        })
    }

    /// Local tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        let elem = self.get(id)?.as_element()?;
        Some(self.interner.get(elem.name.local))
    }

    /// Whether the node is an element with a hyphenated tag
    pub fn is_custom_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some_and(is_custom_element_name)
    }

    /// Non-empty `id` attribute of an element
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get_attribute(id, "id").filter(|v| !v.is_empty())
    }

    /// Whether the node's root is the document (crossing shadow roots)
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(node) = self.get(current) {
            current = match node.data {
                NodeData::Document => return true,
                NodeData::ShadowRoot { host } => host,
                _ => node.parent,
            };
        }
        false
    }

    /// Whether `ancestor` is `id` or contains it (crossing shadow roots)
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = id;
        while let Some(node) = self.get(current) {
            if current == ancestor {
                return true;
            }
            current = match node.data {
                NodeData::ShadowRoot { host } => host,
                _ => node.parent,
            };
        }
        false
    }

    // --- Mutation ---

    /// Append a child, moving it out of its current parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        let parent_kind = self.node(parent)?.kind();
        let child_kind = self.node(child)?.kind();
        let accepts_children = matches!(
            parent_kind,
            NodeKind::Document | NodeKind::Fragment | NodeKind::ShadowRoot | NodeKind::Element
        );
        if !accepts_children
            || matches!(child_kind, NodeKind::Document | NodeKind::ShadowRoot)
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let mut reference = reference;
        if let Some(r) = reference {
            if self.node(r)?.parent != parent {
                return Err(DomError::NotAChild { parent, child: r });
            }
            if r == child {
                reference = self.next_sibling(child);
            }
        }

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }

        self.link(parent, child, reference)?;
        if self.is_connected(parent) {
            self.enqueue_lifecycle(child, LifecycleCallback::Connected);
        }
        Ok(child)
    }

    /// Remove a child from its parent (the child stays allocated)
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.node(child)?.parent != parent {
            return Err(DomError::NotAChild { parent, child });
        }
        let was_connected = self.is_connected(parent);
        self.unlink(child)?;
        if was_connected {
            self.enqueue_lifecycle(child, LifecycleCallback::Disconnected);
        }
        Ok(child)
    }

    /// Replace `old` with `new`, returning `old`
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> DomResult<NodeId> {
        if self.node(old)?.parent != parent {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(old);
        }
        self.insert_before(parent, new, Some(old))?;
        self.remove_child(parent, old)
    }

    /// Release a detached subtree, including shadow trees and listeners
    pub fn discard(&mut self, id: NodeId) -> DomResult<()> {
        let node = self.node(id)?;
        let detached = !node.parent.is_valid()
            && !matches!(node.data, NodeData::Document | NodeData::ShadowRoot { .. });
        if !detached {
            return Err(DomError::StillAttached(id));
        }

        let mut stack = vec![id];
        let mut released = 0usize;
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            stack.extend(self.children(current));
            if let Some(shadow) = node.as_element().and_then(|e| e.shadow_root.option()) {
                stack.push(shadow);
            }
            self.release(current);
            released += 1;
        }

        tracing::trace!("discarded {} nodes under {}", released, id);
        Ok(())
    }

    fn release(&mut self, id: NodeId) {
        self.listeners.remove(&id);
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
            }
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        let prev = match reference {
            Some(r) => self.node(r)?.prev_sibling,
            None => self.node(parent)?.last_child,
        };
        let next = reference.unwrap_or(NodeId::NONE);

        {
            let node = self.node_mut(child)?;
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }

        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = child;
        } else {
            self.node_mut(parent)?.first_child = child;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = child;
        } else {
            self.node_mut(parent)?.last_child = child;
        }
        Ok(())
    }

    fn unlink(&mut self, child: NodeId) -> DomResult<()> {
        let (parent, prev, next) = {
            let node = self.node(child)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return Ok(());
        }

        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = next;
        } else {
            self.node_mut(parent)?.first_child = next;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = prev;
        } else {
            self.node_mut(parent)?.last_child = prev;
        }

        let node = self.node_mut(child)?;
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
        Ok(())
    }

    /// Queue a reaction for every custom element in a subtree, in tree order
    fn enqueue_lifecycle(&mut self, root: NodeId, callback: LifecycleCallback) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.contains(id) {
                continue;
            }
            let shadow = self.shadow_root(id).unwrap_or(NodeId::NONE);
            if self.is_custom_element(id) {
                self.reactions.enqueue(match callback {
                    LifecycleCallback::Disconnected => Reaction::disconnected(id),
                    _ => Reaction::connected(id),
                });
            }

            let mut children: Vec<NodeId> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
            if shadow.is_valid() {
                stack.push(shadow);
            }
        }
    }

    /// Drain pending custom element reactions
    pub fn take_reactions(&mut self) -> Vec<Reaction> {
        self.reactions.drain()
    }

    pub fn has_pending_reactions(&self) -> bool {
        !self.reactions.is_empty()
    }

    // --- Attributes ---

    fn lookup_name(&self, ns: &str, local: &str) -> Option<QualName> {
        let ns = if ns.is_empty() {
            InternedString::EMPTY
        } else {
            self.interner.lookup(ns)?
        };
        Some(QualName::new(ns, self.interner.lookup(local)?))
    }

    /// Get a non-namespaced attribute
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get_attribute_ns(id, "", name)
    }

    /// Get an attribute by namespace and local name
    pub fn get_attribute_ns(&self, id: NodeId, ns: &str, name: &str) -> Option<&str> {
        let qname = self.lookup_name(ns, name)?;
        let elem = self.get(id)?.as_element()?;
        elem.attr(qname).map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    pub fn has_attribute_ns(&self, id: NodeId, ns: &str, name: &str) -> bool {
        self.get_attribute_ns(id, ns, name).is_some()
    }

    /// Set a non-namespaced attribute
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.set_attribute_ns(id, "", name, value)
    }

    /// Set an attribute by namespace and local name
    pub fn set_attribute_ns(&mut self, id: NodeId, ns: &str, name: &str, value: &str) -> DomResult<()> {
        self.element(id)?;
        let ns_id = if ns.is_empty() {
            InternedString::EMPTY
        } else {
            self.interner.intern(ns)
        };
        let qname = QualName::new(ns_id, self.interner.intern(name));
        let old = self.element_mut(id)?.set_attr(qname, value.to_string());
        self.notify_attribute(id, name, old, Some(value.to_string()));
        Ok(())
    }

    /// Remove a non-namespaced attribute, returning its value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        self.remove_attribute_ns(id, "", name)
    }

    pub fn remove_attribute_ns(&mut self, id: NodeId, ns: &str, name: &str) -> DomResult<Option<String>> {
        self.element(id)?;
        let Some(qname) = self.lookup_name(ns, name) else {
            return Ok(None);
        };
        let old = self.element_mut(id)?.remove_attr(qname);
        if old.is_some() {
            self.notify_attribute(id, name, old.clone(), None);
        }
        Ok(old)
    }

    fn notify_attribute(&mut self, id: NodeId, name: &str, old: Option<String>, new: Option<String>) {
        if self.is_custom_element(id) && self.is_connected(id) {
            self.reactions
                .enqueue(Reaction::attribute_changed(id, name, old, new));
        }
    }

    /// Owned snapshot of an element's attributes in document order
    pub fn attributes(&self, id: NodeId) -> Vec<AttrSnapshot> {
        let Some(elem) = self.get(id).and_then(Node::as_element) else {
            return Vec::new();
        };
        elem.attrs
            .iter()
            .map(|a| AttrSnapshot {
                namespace: self.interner.get(a.name.ns).to_string(),
                name: self.interner.get(a.name.local).to_string(),
                value: a.value.clone(),
            })
            .collect()
    }

    // --- Character data ---

    /// Value of a text or comment node
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.character_data()
    }

    /// Overwrite the value of a text or comment node (no-op otherwise)
    pub fn set_node_value(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(s) | NodeData::Comment(s) => {
                s.clear();
                s.push_str(value);
            }
            _ => {}
        }
        Ok(())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(s) => out.push_str(s),
            NodeData::Comment(_) | NodeData::Doctype { .. } => {}
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over child handles
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
