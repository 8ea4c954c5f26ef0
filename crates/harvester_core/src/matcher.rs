//! Structural patterns with ordered fallbacks.
//!
//! The host site's markup changes between UI versions, so containers are
//! recognised by trying several patterns in a fixed priority order.
use crate::page::{NodeId, PageElement, PageTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPattern {
    tag: Option<&'static str>,
    /// Attribute name and the exact value it must carry.
    attr: Option<(&'static str, &'static str)>,
    classes: &'static [&'static str],
}

impl ElementPattern {
    pub const fn attr_equals(name: &'static str, value: &'static str) -> Self {
        Self {
            tag: None,
            attr: Some((name, value)),
            classes: &[],
        }
    }

    pub const fn tag_with_attr(tag: &'static str, name: &'static str, value: &'static str) -> Self {
        Self {
            tag: Some(tag),
            attr: Some((name, value)),
            classes: &[],
        }
    }

    pub const fn classes(classes: &'static [&'static str]) -> Self {
        Self {
            tag: None,
            attr: None,
            classes,
        }
    }

    pub fn matches(&self, element: &PageElement) -> bool {
        if let Some(tag) = self.tag {
            if element.tag() != tag {
                return false;
            }
        }
        if let Some((name, expected)) = self.attr {
            if element.attr(name) != Some(expected) {
                return false;
            }
        }
        self.classes.iter().all(|class| element.has_class(class))
    }
}

/// Patterns tried in priority order; the first match wins.
#[derive(Debug, Clone, Copy)]
pub struct PatternSet {
    patterns: &'static [ElementPattern],
}

impl PatternSet {
    pub const fn new(patterns: &'static [ElementPattern]) -> Self {
        Self { patterns }
    }

    /// Index of the first pattern matching `element`.
    pub fn first_match(&self, element: &PageElement) -> Option<usize> {
        self.patterns.iter().position(|p| p.matches(element))
    }

    pub fn matches(&self, element: &PageElement) -> bool {
        self.first_match(element).is_some()
    }

    /// All matching elements within or equal to `scope`, ordered by pattern
    /// priority first and document order second, without duplicates.
    pub fn find_all(&self, tree: &PageTree, scope: NodeId) -> Vec<NodeId> {
        let candidates: Vec<(usize, NodeId)> = tree
            .descendant_elements(scope)
            .into_iter()
            .filter_map(|id| {
                let element = tree.element(id)?;
                self.first_match(element).map(|rank| (rank, id))
            })
            .collect();

        let mut found = Vec::with_capacity(candidates.len());
        for rank in 0..self.patterns.len() {
            found.extend(
                candidates
                    .iter()
                    .filter(|(r, _)| *r == rank)
                    .map(|(_, id)| *id),
            );
        }
        found
    }

    pub fn closest(&self, tree: &PageTree, node: NodeId) -> Option<NodeId> {
        tree.closest(node, |el| self.matches(el))
    }
}

/// A discoverable item ("pin").
pub const PIN_PATTERNS: PatternSet = PatternSet::new(&[
    ElementPattern::attr_equals("data-test-id", "pin"),
    ElementPattern::attr_equals("data-test-id", "pinRepPresentation"),
    ElementPattern::tag_with_attr("div", "role", "listitem"),
    ElementPattern::classes(&["Pin", "zoomable"]),
    ElementPattern::classes(&["pinWrapper"]),
]);

/// The element carrying the collection (board) title.
pub const BOARD_PATTERNS: PatternSet = PatternSet::new(&[
    ElementPattern::attr_equals("data-test-id", "board-name"),
    ElementPattern::attr_equals("data-test-id", "boardRepPresentation"),
    ElementPattern::classes(&["boardName"]),
    ElementPattern::classes(&["board-header"]),
]);
