//! TreeWalker
//!
//! Pre-order traversal of a subtree with a node-kind filter. Shadow trees
//! are not entered; walk a shadow root explicitly to visit its contents.

use crate::{DomTree, NodeId, NodeKind};

/// What kinds of nodes to yield
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhatToShow(u32);

impl WhatToShow {
    pub const ALL: WhatToShow = WhatToShow(0xFFFFFFFF);
    pub const ELEMENT: WhatToShow = WhatToShow(0x1);
    pub const TEXT: WhatToShow = WhatToShow(0x4);
    pub const COMMENT: WhatToShow = WhatToShow(0x80);
    pub const DOCUMENT: WhatToShow = WhatToShow(0x100);
    pub const DOCUMENT_TYPE: WhatToShow = WhatToShow(0x200);
    pub const DOCUMENT_FRAGMENT: WhatToShow = WhatToShow(0x400);

    /// Check if a node kind is shown
    pub fn includes(self, kind: NodeKind) -> bool {
        let flag = match kind {
            NodeKind::Element => Self::ELEMENT.0,
            NodeKind::Text => Self::TEXT.0,
            NodeKind::Comment => Self::COMMENT.0,
            NodeKind::Document => Self::DOCUMENT.0,
            NodeKind::Doctype => Self::DOCUMENT_TYPE.0,
            NodeKind::Fragment | NodeKind::ShadowRoot => Self::DOCUMENT_FRAGMENT.0,
        };
        (self.0 & flag) != 0
    }

    /// Union of two filters
    pub fn or(self, other: WhatToShow) -> WhatToShow {
        WhatToShow(self.0 | other.0)
    }
}

impl Default for WhatToShow {
    fn default() -> Self {
        Self::ALL
    }
}

/// Pre-order walker over the subtree rooted at `root` (root included)
pub struct TreeWalker<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
    what_to_show: WhatToShow,
}

impl<'a> TreeWalker<'a> {
    pub fn new(tree: &'a DomTree, root: NodeId, what_to_show: WhatToShow) -> Self {
        Self {
            tree,
            root,
            next: tree.contains(root).then_some(root),
            what_to_show,
        }
    }

    /// Walker that yields only elements
    pub fn elements(tree: &'a DomTree, root: NodeId) -> Self {
        Self::new(tree, root, WhatToShow::ELEMENT)
    }

    fn following(&self, id: NodeId) -> Option<NodeId> {
        if let Some(child) = self.tree.first_child(id) {
            return Some(child);
        }
        let mut current = id;
        while current != self.root {
            if let Some(sibling) = self.tree.next_sibling(current) {
                return Some(sibling);
            }
            current = self.tree.parent(current)?;
        }
        None
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(current) = self.next {
            self.next = self.following(current);
            if self
                .tree
                .kind(current)
                .is_some_and(|kind| self.what_to_show.includes(kind))
            {
                return Some(current);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preorder_elements() {
        let mut tree = DomTree::new();
        let root = tree.create_fragment();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        let text = tree.create_text("x");
        let p = tree.create_element("p");
        tree.append_child(root, div).unwrap();
        tree.append_child(div, span).unwrap();
        tree.append_child(span, text).unwrap();
        tree.append_child(root, p).unwrap();

        let visited: Vec<_> = TreeWalker::elements(&tree, root).collect();
        assert_eq!(visited, vec![div, span, p]);

        let all: Vec<_> = TreeWalker::new(&tree, root, WhatToShow::ALL).collect();
        assert_eq!(all, vec![root, div, span, text, p]);
    }

    #[test]
    fn test_walk_stays_inside_root() {
        let mut tree = DomTree::new();
        let parent = tree.create_element("div");
        let first = tree.create_element("section");
        let inner = tree.create_element("b");
        let second = tree.create_element("section");
        tree.append_child(parent, first).unwrap();
        tree.append_child(first, inner).unwrap();
        tree.append_child(parent, second).unwrap();

        let visited: Vec<_> = TreeWalker::elements(&tree, first).collect();
        assert_eq!(visited, vec![first, inner]);
    }

    #[test]
    fn test_filter_union() {
        let show = WhatToShow::TEXT.or(WhatToShow::COMMENT);
        assert!(show.includes(NodeKind::Comment));
        assert!(!show.includes(NodeKind::Element));
    }
}
