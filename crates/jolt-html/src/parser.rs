//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it into the arena. Fragments are
//! parsed as the contents of a `<template>` element so rows, cells and
//! options are accepted at the top level.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use jolt_dom::{Document, DomTree, NodeId};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = Self::read(html)?;
        let mut tree = DomTree::new();
        let root = tree.root();
        for child in dom.document.children.borrow().iter() {
            self.convert_node(child, &mut tree, root)?;
        }

        let document = Document::from_tree(tree, url);
        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Parse `source` as template contents into a new detached fragment
    pub fn parse_fragment(&self, tree: &mut DomTree, source: &str) -> Result<NodeId, ParseError> {
        let wrapped = format!("<template>{source}</template>");
        let dom = Self::read(&wrapped)?;

        let template = find_template(&dom.document).ok_or(ParseError::MissingTemplate)?;
        let contents = match &template.data {
            RcNodeData::Element {
                template_contents, ..
            } => template_contents.borrow().clone(),
            _ => None,
        };
        let contents = contents.ok_or(ParseError::MissingTemplate)?;

        let fragment = tree.create_fragment();
        for child in contents.children.borrow().iter() {
            self.convert_node(child, tree, fragment)?;
        }
        tracing::trace!("Parsed fragment with {} top-level nodes", tree.child_count(fragment));
        Ok(fragment)
    }

    fn read(html: &str) -> Result<RcDom, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(dom)
    }

    /// Convert an RcDom node (and its subtree) into `parent`
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) -> Result<(), ParseError> {
        match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent)?;
                }
            }
            RcNodeData::Doctype { name, .. } => {
                let id = tree.create_doctype(name);
                tree.append_child(parent, id)?;
            }
            RcNodeData::Text { contents } => {
                let id = tree.create_text(&contents.borrow());
                tree.append_child(parent, id)?;
            }
            RcNodeData::Comment { contents } => {
                let id = tree.create_comment(contents);
                tree.append_child(parent, id)?;
            }
            RcNodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let id = tree.create_element_ns(&name.ns, &name.local);
                for attr in attrs.borrow().iter() {
                    tree.set_attribute_ns(id, &attr.name.ns, &attr.name.local, &attr.value)?;
                }
                tree.append_child(parent, id)?;

                // Template contents become ordinary children
                if let Some(contents) = template_contents.borrow().as_ref() {
                    for child in contents.children.borrow().iter() {
                        self.convert_node(child, tree, id)?;
                    }
                }
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id)?;
                }
            }
            RcNodeData::ProcessingInstruction { .. } => {}
        }
        Ok(())
    }
}

/// First `<template>` element in tree order
fn find_template(handle: &Handle) -> Option<Handle> {
    if let RcNodeData::Element { name, .. } = &handle.data {
        if &*name.local == "template" {
            return Some(handle.clone());
        }
    }
    handle.children.borrow().iter().find_map(find_template)
}
