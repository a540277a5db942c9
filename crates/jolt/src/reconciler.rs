//! Reconciler
//!
//! Diffs a freshly materialized fragment against a live subtree and
//! mutates the live subtree in place. Nothing is diffed through an
//! intermediate representation: the walk reads both trees directly and
//! writes into the old one as it goes.
//!
//! Children are matched in a single forward pass. `offset` counts new
//! children that were adopted into the live tree (and so left the
//! fragment), which keeps `new[i - offset]` aligned with `old[i]`.

use jolt_dom::{is_custom_element_name, DomError, DomTree, InputType, NodeId, NodeKind};

use crate::template::{Template, TemplateEngine, TemplateError};

/// Mutations applied by one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub attributes_set: usize,
    pub attributes_removed: usize,
    pub text_updates: usize,
    pub property_updates: usize,
    pub inserted: usize,
    pub removed: usize,
    pub replaced: usize,
    pub moved: usize,
    /// Invocations of `diff_children` (not a mutation)
    pub diff_children_calls: usize,
}

impl ReconcileStats {
    /// Total number of tree mutations
    pub fn mutations(&self) -> usize {
        self.attributes_set
            + self.attributes_removed
            + self.text_updates
            + self.property_updates
            + self.inserted
            + self.removed
            + self.replaced
            + self.moved
    }

    pub fn merge(&mut self, other: &ReconcileStats) {
        self.attributes_set += other.attributes_set;
        self.attributes_removed += other.attributes_removed;
        self.text_updates += other.text_updates;
        self.property_updates += other.property_updates;
        self.inserted += other.inserted;
        self.removed += other.removed;
        self.replaced += other.replaced;
        self.moved += other.moved;
        self.diff_children_calls += other.diff_children_calls;
    }
}

/// Reconciliation errors
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("tree mutation failed: {0}")]
    Dom(#[from] DomError),
}

/// Boolean control properties mirrored into attributes
#[derive(Debug, Clone, Copy)]
enum Flag {
    Checked,
    Disabled,
    Selected,
}

impl Flag {
    fn name(self) -> &'static str {
        match self {
            Flag::Checked => "checked",
            Flag::Disabled => "disabled",
            Flag::Selected => "selected",
        }
    }
}

/// In-place tree differ
pub struct Reconciler<'t> {
    tree: &'t mut DomTree,
    stats: ReconcileStats,
    /// Old nodes unlinked during the pass, released at the end
    released: Vec<NodeId>,
}

impl<'t> Reconciler<'t> {
    pub fn new(tree: &'t mut DomTree) -> Self {
        Self {
            tree,
            stats: ReconcileStats::default(),
            released: Vec::new(),
        }
    }

    /// Materialize `template` and patch `container`'s children to match it
    pub fn reconcile(
        tree: &mut DomTree,
        template: &Template,
        container: NodeId,
    ) -> Result<ReconcileStats, ReconcileError> {
        let fragment = TemplateEngine::process_template(tree, template)?;

        let mut reconciler = Reconciler::new(tree);
        reconciler.release(fragment);
        let patched = reconciler
            .diff(fragment, container)
            .and_then(|()| reconciler.diff_children(fragment, container));
        // Unlinked nodes are released on failure too
        let stats = reconciler.finish();
        patched?;

        tracing::trace!(
            "reconciled {}: {} mutations, {} child diffs",
            container,
            stats.mutations(),
            stats.diff_children_calls
        );
        Ok(stats)
    }

    /// Release unlinked nodes and return the statistics
    pub fn finish(self) -> ReconcileStats {
        for id in self.released {
            if self.tree.contains(id) && self.tree.parent(id).is_none() {
                // Only detached nodes are queued, so this cannot fail
                let _ = self.tree.discard(id);
            }
        }
        self.stats
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    fn release(&mut self, id: NodeId) {
        self.released.push(id);
    }

    /// Morph `old` towards `new`.
    ///
    /// Returns the node that should occupy the position: `new` for an
    /// insertion or a kind/tag change, `old` when it was patched in place,
    /// `None` for a removal.
    pub fn walk(
        &mut self,
        new: Option<NodeId>,
        old: Option<NodeId>,
    ) -> Result<Option<NodeId>, ReconcileError> {
        let (new, old) = match (new, old) {
            (new, None) => return Ok(new),
            (None, Some(_)) => return Ok(None),
            (Some(new), Some(old)) => (new, old),
        };

        if self.tree.node_name(new) != self.tree.node_name(old) {
            return Ok(Some(new));
        }

        self.diff(new, old)?;
        if let Some(custom) = self.tree.tag_name(new).map(is_custom_element_name) {
            // Custom elements own their subtree once attached
            if !custom {
                self.diff_children(new, old)?;
            }
            let listeners = self.tree.take_listeners(new);
            self.tree.replace_listeners(old, listeners)?;
        }
        Ok(Some(old))
    }

    /// Patch the node itself: attributes, character data, control state
    pub fn diff(&mut self, new: NodeId, old: NodeId) -> Result<(), ReconcileError> {
        match self.tree.kind(new) {
            Some(NodeKind::Element) => self.diff_attributes(new, old)?,
            Some(NodeKind::Text | NodeKind::Comment) => {
                let value = self.tree.node_value(new).unwrap_or_default().to_string();
                if self.tree.node_value(old) != Some(value.as_str()) {
                    self.tree.set_node_value(old, &value)?;
                    self.stats.text_updates += 1;
                }
            }
            _ => {}
        }

        match self.tree.tag_name(new) {
            Some("input") => self.update_input(new, old)?,
            Some("option") => self.update_flag(new, old, Flag::Selected)?,
            Some("textarea") => self.update_textarea(new, old)?,
            _ => {}
        }
        Ok(())
    }

    /// Make `old`'s attribute set equal to `new`'s
    pub fn diff_attributes(&mut self, new: NodeId, old: NodeId) -> Result<(), ReconcileError> {
        for attr in self.tree.attributes(new) {
            if attr.is_namespaced() {
                let current = self.tree.get_attribute_ns(old, &attr.namespace, &attr.name);
                if current != Some(attr.value.as_str()) {
                    self.tree
                        .set_attribute_ns(old, &attr.namespace, &attr.name, &attr.value)?;
                    self.stats.attributes_set += 1;
                }
                continue;
            }

            let unchanged = self
                .tree
                .get_attribute(old, &attr.name)
                .map(|current| current == attr.value);
            match unchanged {
                None => {
                    self.tree.set_attribute(old, &attr.name, &attr.value)?;
                    self.stats.attributes_set += 1;
                }
                Some(false) => {
                    if attr.value == "null" || attr.value == "undefined" {
                        self.tree.remove_attribute(old, &attr.name)?;
                        self.stats.attributes_removed += 1;
                    } else {
                        self.tree.set_attribute(old, &attr.name, &attr.value)?;
                        self.stats.attributes_set += 1;
                    }
                }
                Some(true) => {}
            }
        }

        for attr in self.tree.attributes(old) {
            let kept = self.tree.has_attribute_ns(new, &attr.namespace, &attr.name);
            if !kept
                && self
                    .tree
                    .remove_attribute_ns(old, &attr.namespace, &attr.name)?
                    .is_some()
            {
                self.stats.attributes_removed += 1;
            }
        }
        Ok(())
    }

    /// Patch the children of `old_parent` to match `new_parent`'s
    pub fn diff_children(&mut self, new_parent: NodeId, old_parent: NodeId) -> Result<(), ReconcileError> {
        self.stats.diff_children_calls += 1;

        let mut offset = 0usize;
        let mut i = 0usize;
        loop {
            let old_child = self.tree.child_at(old_parent, i);
            let new_child = i
                .checked_sub(offset)
                .and_then(|index| self.tree.child_at(new_parent, index));

            let (new, old) = match (new_child, old_child) {
                (None, None) => break,
                (None, Some(old)) => {
                    self.tree.remove_child(old_parent, old)?;
                    self.release(old);
                    self.stats.removed += 1;
                    // Same index now holds the next old child
                    continue;
                }
                (Some(new), None) => {
                    self.tree.append_child(old_parent, new)?;
                    self.stats.inserted += 1;
                    offset += 1;
                    i += 1;
                    continue;
                }
                (Some(new), Some(old)) => (new, old),
            };

            if Self::is_same_node(self.tree, new, old) {
                self.replace_if_morphed(old_parent, new, old, &mut offset)?;
                i += 1;
                continue;
            }

            let tree = &*self.tree;
            let old_match = tree
                .children(old_parent)
                .skip(i)
                .find(|&candidate| Self::is_same_node(tree, candidate, new));

            if let Some(matched) = old_match {
                let morphed = self.walk(Some(new), Some(matched))?;
                if morphed != Some(matched) {
                    offset += 1;
                }
                if let Some(node) = morphed {
                    self.tree.insert_before(old_parent, node, Some(old))?;
                    if node == matched {
                        self.stats.moved += 1;
                    } else {
                        self.stats.inserted += 1;
                    }
                }
            } else if self.tree.element_id(new).is_none() && self.tree.element_id(old).is_none() {
                self.replace_if_morphed(old_parent, new, old, &mut offset)?;
            } else {
                // Leaves the unmatched old sibling in place; a later
                // iteration removes it if the new list runs out first.
                self.tree.insert_before(old_parent, new, Some(old))?;
                self.stats.inserted += 1;
                offset += 1;
            }
            i += 1;
        }
        Ok(())
    }

    fn replace_if_morphed(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
        offset: &mut usize,
    ) -> Result<(), ReconcileError> {
        if let Some(morphed) = self.walk(Some(new), Some(old))?.filter(|&m| m != old) {
            self.tree.replace_child(parent, morphed, old)?;
            self.release(old);
            self.stats.replaced += 1;
            *offset += 1;
        }
        Ok(())
    }

    /// Identity heuristic: equal ids, else equal text for text nodes
    pub fn is_same_node(tree: &DomTree, a: NodeId, b: NodeId) -> bool {
        match (tree.element_id(a), tree.element_id(b)) {
            (Some(x), Some(y)) => return x == y,
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        if tree.node_name(a) != tree.node_name(b) {
            return false;
        }
        if tree.kind(a) == Some(NodeKind::Text) {
            return tree.node_value(a) == tree.node_value(b);
        }
        false
    }

    fn flag(&self, id: NodeId, flag: Flag) -> Result<bool, DomError> {
        match flag {
            Flag::Checked => self.tree.checked(id),
            Flag::Disabled => self.tree.disabled(id),
            Flag::Selected => self.tree.selected(id),
        }
    }

    /// Mirror a boolean property, reflecting it into its attribute
    fn update_flag(&mut self, new: NodeId, old: NodeId, flag: Flag) -> Result<(), ReconcileError> {
        let wanted = self.flag(new, flag)?;
        if wanted == self.flag(old, flag)? {
            return Ok(());
        }

        match flag {
            Flag::Checked => self.tree.set_checked(old, wanted)?,
            Flag::Disabled => self.tree.set_disabled(old, wanted)?,
            Flag::Selected => self.tree.set_selected(old, wanted)?,
        }
        if wanted {
            self.tree.set_attribute(old, flag.name(), "")?;
        } else {
            self.tree.remove_attribute(old, flag.name())?;
        }
        self.stats.property_updates += 1;
        Ok(())
    }

    fn update_input(&mut self, new: NodeId, old: NodeId) -> Result<(), ReconcileError> {
        let new_value = self.tree.input_value(new)?;
        let old_value = self.tree.input_value(old)?;

        self.update_flag(new, old, Flag::Checked)?;
        self.update_flag(new, old, Flag::Disabled)?;

        let indeterminate = self.tree.indeterminate(new)?;
        if indeterminate != self.tree.indeterminate(old)? {
            self.tree.set_indeterminate(old, indeterminate)?;
            self.stats.property_updates += 1;
        }

        let input_type = self.tree.input_type(old);
        if input_type == InputType::File {
            return Ok(());
        }

        if new_value != old_value {
            self.tree.set_attribute(old, "value", &new_value)?;
            self.tree.set_input_value(old, &new_value)?;
            self.stats.property_updates += 1;
        }

        if new_value == "null" {
            self.tree.set_input_value(old, "")?;
            if self.tree.remove_attribute(old, "value")?.is_some() {
                self.stats.attributes_removed += 1;
            }
        }

        if !self.tree.has_attribute(new, "value") {
            if self.tree.remove_attribute(old, "value")?.is_some() {
                self.stats.attributes_removed += 1;
            }
        } else if input_type == InputType::Range {
            // Range inputs clamp on assignment, so the value is always re-applied
            if self.tree.input_value(old)? != new_value {
                self.stats.property_updates += 1;
            }
            self.tree.set_input_value(old, &new_value)?;
        }
        Ok(())
    }

    fn update_textarea(&mut self, new: NodeId, old: NodeId) -> Result<(), ReconcileError> {
        let new_value = self.tree.textarea_value(new)?;

        if new_value != self.tree.textarea_value(old)? {
            self.tree.set_textarea_value(old, &new_value)?;
            self.stats.property_updates += 1;
        }

        if let Some(first) = self.tree.first_child(old) {
            let stale = self
                .tree
                .node_value(first)
                .is_some_and(|value| value != new_value);
            if stale {
                self.tree.set_node_value(first, &new_value)?;
                self.stats.text_updates += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolt_html::parse_fragment;

    fn fragment(tree: &mut DomTree, markup: &str) -> NodeId {
        parse_fragment(tree, markup).unwrap()
    }

    #[test]
    fn test_walk_edge_cases() {
        let mut tree = DomTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("span");
        let mut r = Reconciler::new(&mut tree);

        assert_eq!(r.walk(Some(a), None).unwrap(), Some(a));
        assert_eq!(r.walk(None, Some(a)).unwrap(), None);
        assert_eq!(r.walk(Some(b), Some(a)).unwrap(), Some(b));
    }

    #[test]
    fn test_failed_reconcile_releases_fragment() {
        let mut tree = DomTree::new();
        let container = tree.create_text("not a parent");
        let live = tree.len();

        let template = Template::new("<p>a</p><p>b</p>");
        let err = Reconciler::reconcile(&mut tree, &template, container).unwrap_err();
        assert!(matches!(err, ReconcileError::Dom(DomError::HierarchyRequest { .. })));
        assert_eq!(tree.len(), live);
    }

    #[test]
    fn test_walk_retains_same_tag() {
        let mut tree = DomTree::new();
        let new = tree.create_element("div");
        let old = tree.create_element("div");
        tree.set_attribute(new, "class", "on").unwrap();

        let mut r = Reconciler::new(&mut tree);
        assert_eq!(r.walk(Some(new), Some(old)).unwrap(), Some(old));
        assert_eq!(r.stats().attributes_set, 1);
        assert_eq!(tree.get_attribute(old, "class"), Some("on"));
    }

    #[test]
    fn test_text_and_comment_do_not_morph() {
        let mut tree = DomTree::new();
        let text = tree.create_text("x");
        let comment = tree.create_comment("x");
        let mut r = Reconciler::new(&mut tree);
        assert_eq!(r.walk(Some(text), Some(comment)).unwrap(), Some(text));
    }

    #[test]
    fn test_is_same_node() {
        let mut tree = DomTree::new();
        let a = tree.create_element("li");
        let b = tree.create_element("li");
        assert!(!Reconciler::is_same_node(&tree, a, b));

        tree.set_attribute(a, "id", "k").unwrap();
        assert!(!Reconciler::is_same_node(&tree, a, b));
        tree.set_attribute(b, "id", "k").unwrap();
        assert!(Reconciler::is_same_node(&tree, a, b));

        let t1 = tree.create_text("same");
        let t2 = tree.create_text("same");
        let t3 = tree.create_text("other");
        assert!(Reconciler::is_same_node(&tree, t1, t2));
        assert!(!Reconciler::is_same_node(&tree, t1, t3));
    }

    #[test]
    fn test_attribute_set_becomes_exact() {
        let mut tree = DomTree::new();
        let new_frag = fragment(&mut tree, r#"<p b="2" c="3"></p>"#);
        let old_frag = fragment(&mut tree, r#"<p a="1" b="1"></p>"#);
        let new = tree.first_child(new_frag).unwrap();
        let old = tree.first_child(old_frag).unwrap();

        let mut r = Reconciler::new(&mut tree);
        r.diff_attributes(new, old).unwrap();
        let stats = *r.stats();
        assert_eq!(stats.attributes_set, 2);
        assert_eq!(stats.attributes_removed, 1);

        let names: Vec<_> = tree.attributes(old).into_iter().map(|a| (a.name, a.value)).collect();
        assert_eq!(names, vec![("b".into(), "2".into()), ("c".into(), "3".into())]);
    }

    #[test]
    fn test_null_value_removes_present_attribute() {
        let mut tree = DomTree::new();
        let new = tree.create_element("p");
        let old = tree.create_element("p");
        tree.set_attribute(old, "x", "1").unwrap();
        tree.set_attribute(new, "x", "undefined").unwrap();

        Reconciler::new(&mut tree).diff_attributes(new, old).unwrap();
        assert!(!tree.has_attribute(old, "x"));
    }

    #[test]
    fn test_null_value_is_set_when_absent() {
        let mut tree = DomTree::new();
        let new = tree.create_element("p");
        let old = tree.create_element("p");
        tree.set_attribute(new, "x", "null").unwrap();

        Reconciler::new(&mut tree).diff_attributes(new, old).unwrap();
        assert_eq!(tree.get_attribute(old, "x"), Some("null"));
    }

    #[test]
    fn test_namespaced_attribute_only_set_when_different() {
        let xlink = "http://www.w3.org/1999/xlink";
        let mut tree = DomTree::new();
        let new = tree.create_element("use");
        let old = tree.create_element("use");
        tree.set_attribute_ns(new, xlink, "href", "#a").unwrap();
        tree.set_attribute_ns(old, xlink, "href", "#a").unwrap();

        let mut r = Reconciler::new(&mut tree);
        r.diff_attributes(new, old).unwrap();
        assert_eq!(r.stats().mutations(), 0);

        tree.set_attribute_ns(new, xlink, "href", "#b").unwrap();
        Reconciler::new(&mut tree).diff_attributes(new, old).unwrap();
        assert_eq!(tree.get_attribute_ns(old, xlink, "href"), Some("#b"));
    }

    #[test]
    fn test_removal_of_surplus_children() {
        let mut tree = DomTree::new();
        let new = fragment(&mut tree, "<b>1</b>");
        let old = fragment(&mut tree, "<b>1</b><i>2</i><u>3</u>");

        let mut r = Reconciler::new(&mut tree);
        r.diff_children(new, old).unwrap();
        let stats = r.finish();
        assert_eq!(stats.removed, 2);
        assert_eq!(tree.child_count(old), 1);
    }

    #[test]
    fn test_positional_replace_on_tag_change() {
        let mut tree = DomTree::new();
        let new = fragment(&mut tree, "<em>x</em>");
        let old = fragment(&mut tree, "<b>x</b>");
        let old_b = tree.first_child(old).unwrap();

        let mut r = Reconciler::new(&mut tree);
        r.diff_children(new, old).unwrap();
        let stats = r.finish();
        assert_eq!(stats.replaced, 1);
        assert_eq!(tree.tag_name(tree.first_child(old).unwrap()), Some("em"));
        assert!(!tree.contains(old_b));
    }

    #[test]
    fn test_unmatched_keyed_insert_keeps_old_sibling() {
        let mut tree = DomTree::new();
        let new = fragment(&mut tree, r#"<p id="b"></p>"#);
        let old = fragment(&mut tree, r#"<p id="a"></p>"#);

        let mut r = Reconciler::new(&mut tree);
        r.diff_children(new, old).unwrap();
        let stats = r.finish();

        // Inserted before, then the stranded sibling is removed once the
        // new list is exhausted
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.removed, 1);
        let ids: Vec<_> = tree
            .children(old)
            .map(|c| tree.element_id(c).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_checkbox_checked_restored() {
        let mut tree = DomTree::new();
        let new = fragment(&mut tree, r#"<input type="checkbox" checked>"#);
        let old = fragment(&mut tree, r#"<input type="checkbox" checked>"#);
        let new_input = tree.first_child(new).unwrap();
        let old_input = tree.first_child(old).unwrap();
        tree.set_checked(old_input, false).unwrap();

        let mut r = Reconciler::new(&mut tree);
        r.diff(new_input, old_input).unwrap();
        assert_eq!(r.stats().property_updates, 1);
        assert!(tree.checked(old_input).unwrap());
    }

    #[test]
    fn test_input_value_synced_except_file() {
        let mut tree = DomTree::new();
        let new = tree.create_element("input");
        let old = tree.create_element("input");
        tree.set_attribute(new, "value", "fresh").unwrap();
        tree.set_input_value(old, "typed").unwrap();

        Reconciler::new(&mut tree).diff(new, old).unwrap();
        assert_eq!(tree.input_value(old).unwrap(), "fresh");

        let new_file = tree.create_element("input");
        let old_file = tree.create_element("input");
        tree.set_attribute(new_file, "type", "file").unwrap();
        tree.set_attribute(old_file, "type", "file").unwrap();
        tree.set_input_value(old_file, "C:\\fakepath\\a.txt").unwrap();
        Reconciler::new(&mut tree).diff(new_file, old_file).unwrap();
        assert_eq!(tree.input_value(old_file).unwrap(), "C:\\fakepath\\a.txt");
    }

    #[test]
    fn test_textarea_value_and_text() {
        let mut tree = DomTree::new();
        let new = fragment(&mut tree, "<textarea>new</textarea>");
        let old = fragment(&mut tree, "<textarea>old</textarea>");
        let new_area = tree.first_child(new).unwrap();
        let old_area = tree.first_child(old).unwrap();

        Reconciler::new(&mut tree).diff(new_area, old_area).unwrap();
        assert_eq!(tree.textarea_value(old_area).unwrap(), "new");
        assert_eq!(tree.text_content(old_area), "new");
    }

    #[test]
    fn test_option_selected() {
        let mut tree = DomTree::new();
        let new = tree.create_element("option");
        let old = tree.create_element("option");
        tree.set_attribute(old, "selected", "").unwrap();

        Reconciler::new(&mut tree).diff(new, old).unwrap();
        assert!(!tree.selected(old).unwrap());
        assert!(!tree.has_attribute(old, "selected"));
    }
}
