//! Document - High-level document API

use crate::{DomTree, NodeId, TreeWalker};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
}

impl Document {
    /// Create a document with `html > head + body`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes cannot violate the hierarchy
        let root = tree.root();
        let _ = tree.append_child(root, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Wrap an existing tree, locating `html`, `head` and `body` in it
    pub fn from_tree(tree: DomTree, url: &str) -> Self {
        let find = |parent: Option<NodeId>, tag: &str| {
            parent.and_then(|p| tree.children(p).find(|&c| tree.tag_name(c) == Some(tag)))
        };
        let html = find(Some(tree.root()), "html");
        let head = find(html, "head");
        let body = find(html, "body");

        Self {
            url: url.to_string(),
            html_element: html.unwrap_or(NodeId::NONE),
            head_element: head.unwrap_or(NodeId::NONE),
            body_element: body.unwrap_or(NodeId::NONE),
            tree,
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Text of the first `<title>` in `<head>`
    pub fn title(&self) -> String {
        self.tree
            .children(self.head_element)
            .find(|&c| self.tree.tag_name(c) == Some("title"))
            .map(|t| self.tree.text_content(t))
            .unwrap_or_default()
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// First connected element (tree order) with the given id
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        TreeWalker::elements(&self.tree, self.tree.root())
            .find(|&node| self.tree.element_id(node) == Some(id))
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.tree.memory_usage() + self.url.capacity()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_structure() {
        let doc = Document::new("https://example.com/");
        let tree = doc.tree();
        assert_eq!(tree.parent(doc.document_element()), Some(tree.root()));
        assert_eq!(tree.parent(doc.body()), Some(doc.document_element()));
        assert!(tree.is_connected(doc.body()));
        assert_eq!(doc.url(), "https://example.com/");
    }

    #[test]
    fn test_get_element_by_id() {
        let mut doc = Document::default();
        let body = doc.body();
        let tree = doc.tree_mut();
        let app = tree.create_element("div");
        tree.set_attribute(app, "id", "app").unwrap();
        tree.append_child(body, app).unwrap();

        assert_eq!(doc.get_element_by_id("app"), Some(app));
        assert_eq!(doc.get_element_by_id("missing"), None);
    }

    #[test]
    fn test_title() {
        let mut doc = Document::default();
        let head = doc.head();
        let tree = doc.tree_mut();
        let title = tree.create_element("title");
        let text = tree.create_text("Counter");
        tree.append_child(title, text).unwrap();
        tree.append_child(head, title).unwrap();
        assert_eq!(doc.title(), "Counter");
    }
}
