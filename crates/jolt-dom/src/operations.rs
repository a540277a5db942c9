//! DOM Node Operation Errors
//!
//! Failures of appendChild, insertBefore, removeChild, replaceChild and
//! friends. The reconciler does not catch these; they reach its caller.

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Handle does not resolve (never existed or already released)
    #[error("node {0} not found")]
    NotFound(NodeId),

    /// Insertion would create a cycle or place a root inside a tree
    #[error("hierarchy request error: cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// Reference or old child is not a child of the given parent
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Operation requires an element
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Operation requires a detached node
    #[error("node {0} is still attached")]
    StillAttached(NodeId),

    /// Element already hosts a shadow root
    #[error("element {0} already has a shadow root")]
    ShadowRootExists(NodeId),
}
