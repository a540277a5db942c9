//! Jolt HTML
//!
//! HTML5 parsing built on html5ever, converted into the jolt-dom arena,
//! plus a serializer for markup snapshots of rendered trees.

mod parser;
mod serializer;

pub use parser::HtmlParser;
pub use serializer::HtmlSerializer;

use jolt_dom::{Document, DomTree, NodeId};

/// Parse a whole HTML document
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse markup with template-content rules into a detached fragment
pub fn parse_fragment(tree: &mut DomTree, source: &str) -> Result<NodeId, ParseError> {
    HtmlParser::new().parse_fragment(tree, source)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read markup: {0}")]
    Io(#[from] std::io::Error),

    #[error("template wrapper missing from parsed markup")]
    MissingTemplate,

    #[error(transparent)]
    Dom(#[from] jolt_dom::DomError),
}
