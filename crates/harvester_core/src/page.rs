//! Host-owned document model the discovery engine reads from.
//!
//! The tree is an arena (`ego_tree`) so node handles are cheap `Copy` ids with
//! identity semantics, which is what container deduplication relies on.
use ego_tree::{NodeRef, Tree};

pub use ego_tree::NodeId;

/// Attributes whose changes the host reports as [`TreeChange::AttributeChanged`].
pub const WATCHED_ATTRIBUTES: &[&str] = &["src", "data-src", "data-test-id"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageNode {
    Document,
    Element(PageElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    tag: String,
    attrs: Vec<(String, String)>,
}

impl PageElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Sets or replaces an attribute. Returns `true` when the value changed.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) if *existing == value => false,
            Some((_, existing)) => {
                *existing = value;
                true
            }
            None => {
                self.attrs.push((name, value));
                true
            }
        }
    }
}

/// One batch entry delivered by the host's tree-change event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    ChildrenAdded(Vec<NodeId>),
    AttributeChanged { node: NodeId, name: String },
}

#[derive(Debug, Clone)]
pub struct PageTree {
    tree: Tree<PageNode>,
}

impl Default for PageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTree {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(PageNode::Document),
        }
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    /// First `<body>` element, or the document root when there is none.
    pub fn body(&self) -> NodeId {
        self.tree
            .root()
            .descendants()
            .find(|node| matches!(node.value(), PageNode::Element(el) if el.tag() == "body"))
            .map(|node| node.id())
            .unwrap_or_else(|| self.root())
    }

    pub fn append_element(&mut self, parent: NodeId, element: PageElement) -> Option<NodeId> {
        let mut parent = self.tree.get_mut(parent)?;
        Some(parent.append(PageNode::Element(element)).id())
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> Option<NodeId> {
        let mut parent = self.tree.get_mut(parent)?;
        Some(parent.append(PageNode::Text(text.into())).id())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some()
    }

    pub fn element(&self, id: NodeId) -> Option<&PageElement> {
        match self.tree.get(id)?.value() {
            PageNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Returns `true` when the attribute value actually changed.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        let Some(mut node) = self.tree.get_mut(id) else {
            return false;
        };
        match node.value() {
            PageNode::Element(el) => el.set_attr(name, value),
            _ => false,
        }
    }

    /// Element ids under `id`, including `id` itself, in document order.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| {
                node.descendants()
                    .filter(|n| matches!(n.value(), PageNode::Element(_)))
                    .map(|n| n.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nearest element, starting at `id` itself, for which `pred` holds.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&PageElement) -> bool) -> Option<NodeId> {
        let node = self.tree.get(id)?;
        std::iter::once(node)
            .chain(node.ancestors())
            .find(|n| matches!(n.value(), PageNode::Element(el) if pred(el)))
            .map(|n| n.id())
    }

    pub fn has_ancestor_within(&self, id: NodeId, boundary: NodeId, tag: &str) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        for ancestor in node.ancestors() {
            if matches!(ancestor.value(), PageNode::Element(el) if el.tag() == tag) {
                return true;
            }
            if ancestor.id() == boundary {
                break;
            }
        }
        false
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.tree
            .get(id)
            .map(|node| collect_text(node))
            .unwrap_or_default()
    }

    pub fn element_count(&self) -> usize {
        self.tree
            .root()
            .descendants()
            .filter(|n| matches!(n.value(), PageNode::Element(_)))
            .count()
    }
}

fn collect_text(node: NodeRef<'_, PageNode>) -> String {
    node.descendants()
        .filter_map(|n| match n.value() {
            PageNode::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_attr_reports_changes_only() {
        let mut tree = PageTree::new();
        let img = tree
            .append_element(tree.root(), PageElement::new("IMG"))
            .unwrap();
        assert!(tree.set_attr(img, "src", "a"));
        assert!(!tree.set_attr(img, "SRC", "a"));
        assert_eq!(tree.element(img).unwrap().attr("src"), Some("a"));
        assert_eq!(tree.element(img).unwrap().tag(), "img");
    }

    #[test]
    fn closest_includes_self() {
        let mut tree = PageTree::new();
        let div = tree
            .append_element(tree.root(), PageElement::new("div").with_attr("class", "pinWrapper x"))
            .unwrap();
        let img = tree.append_element(div, PageElement::new("img")).unwrap();
        assert_eq!(tree.closest(img, |el| el.has_class("pinWrapper")), Some(div));
        assert_eq!(tree.closest(div, |el| el.has_class("pinWrapper")), Some(div));
        assert_eq!(tree.closest(img, |el| el.tag() == "section"), None);
    }
}
