//! Incremental discovery of pin media as the document grows.
use engine_logging::{engine_debug, engine_error, engine_trace};

use crate::canonical::{accept, ASSET_DOMAIN};
use crate::collection::CollectionStore;
use crate::matcher::{BOARD_PATTERNS, PIN_PATTERNS};
use crate::page::{NodeId, PageTree, TreeChange, WATCHED_ATTRIBUTES};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("container {0:?} is no longer part of the document")]
    StaleContainer(NodeId),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
}

/// What one batch (or one visibility callback) contributed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryReport {
    /// Newly registered containers.
    pub registered: usize,
    /// Canonical URLs accepted into the store, in acceptance order.
    pub accepted: Vec<String>,
    /// Raw URLs that failed validation.
    pub rejected: usize,
    /// Containers whose extraction failed.
    pub failures: usize,
}

impl DiscoveryReport {
    pub fn is_empty(&self) -> bool {
        self.registered == 0 && self.accepted.is_empty()
    }

    fn merge(&mut self, other: DiscoveryReport) {
        self.registered += other.registered;
        self.accepted.extend(other.accepted);
        self.rejected += other.rejected;
        self.failures += other.failures;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Accepted,
    Duplicate,
    Rejected,
    /// Discovery is disconnected.
    Ignored,
}

/// Reacts to tree-change batches, visibility callbacks and network-observed
/// URLs, feeding everything into one [`CollectionStore`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryEngine {
    connected: bool,
    /// Containers awaiting their first visibility callback.
    watched: Vec<NodeId>,
    collection_title: Option<String>,
}

impl DiscoveryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self) {
        self.connected = true;
    }

    /// Stops reacting to events and drops all visibility watches.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.watched.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn watched(&self) -> &[NodeId] {
        &self.watched
    }

    pub fn collection_title(&self) -> Option<&str> {
        self.collection_title.as_deref()
    }

    pub fn on_document_changed(
        &mut self,
        tree: &PageTree,
        changes: &[TreeChange],
        store: &mut CollectionStore,
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        if !self.connected {
            return report;
        }
        for change in changes {
            match change {
                TreeChange::ChildrenAdded(nodes) => {
                    for node in nodes {
                        self.process_added(tree, *node, store, &mut report);
                    }
                }
                TreeChange::AttributeChanged { node, name } => {
                    if !WATCHED_ATTRIBUTES.contains(&name.as_str()) {
                        continue;
                    }
                    let Some(container) = PIN_PATTERNS.closest(tree, *node) else {
                        continue;
                    };
                    if store.has_container(container) {
                        self.extract_into(tree, container, store, &mut report);
                    } else {
                        self.register_container(tree, container, store, &mut report);
                    }
                }
            }
        }
        if !report.is_empty() {
            engine_debug!(
                "discovery batch: {} new containers, {} new urls, {} rejected, {} failures",
                report.registered,
                report.accepted.len(),
                report.rejected,
                report.failures
            );
        }
        report
    }

    /// A watched container entered the (expanded) viewport.
    pub fn on_visible(
        &mut self,
        tree: &mut PageTree,
        container: NodeId,
        store: &mut CollectionStore,
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        if !self.connected {
            return report;
        }
        let Some(pos) = self.watched.iter().position(|id| *id == container) else {
            return report;
        };
        self.watched.remove(pos);
        let promoted = promote_deferred_sources(tree, container);
        if promoted > 0 {
            engine_trace!("promoted {promoted} deferred sources in {container:?}");
        }
        self.extract_into(tree, container, store, &mut report);
        report
    }

    /// Every watched container is reported visible at once.
    pub fn on_all_visible(&mut self, tree: &mut PageTree, store: &mut CollectionStore) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        for container in self.watched.clone() {
            report.merge(self.on_visible(tree, container, store));
        }
        report
    }

    /// A URL observed in network traffic rather than in markup.
    pub fn on_network_url(&mut self, raw: &str, store: &mut CollectionStore) -> Recorded {
        if !self.connected {
            return Recorded::Ignored;
        }
        record(raw, store)
    }

    fn process_added(
        &mut self,
        tree: &PageTree,
        node: NodeId,
        store: &mut CollectionStore,
        report: &mut DiscoveryReport,
    ) {
        // Text nodes carry no elements; the document root does.
        if tree.descendant_elements(node).is_empty() {
            return;
        }
        self.note_title(tree, node);

        for container in PIN_PATTERNS.find_all(tree, node) {
            self.register_container(tree, container, store, report);
        }

        for id in tree.descendant_elements(node) {
            let is_media = tree
                .element(id)
                .map(|el| matches!(el.tag(), "img" | "video"))
                .unwrap_or(false);
            if !is_media {
                continue;
            }
            if let Some(container) = PIN_PATTERNS.closest(tree, id) {
                self.register_container(tree, container, store, report);
            }
        }
    }

    /// Registers a container once; later calls are no-ops.
    pub fn register_container(
        &mut self,
        tree: &PageTree,
        container: NodeId,
        store: &mut CollectionStore,
        report: &mut DiscoveryReport,
    ) -> bool {
        if !store.add_container(container) {
            return false;
        }
        report.registered += 1;
        self.watched.push(container);
        self.extract_into(tree, container, store, report);
        true
    }

    fn extract_into(
        &self,
        tree: &PageTree,
        container: NodeId,
        store: &mut CollectionStore,
        report: &mut DiscoveryReport,
    ) {
        match extract_raw_url(tree, container) {
            Ok(Some(raw)) => match record(&raw, store) {
                Recorded::Accepted => {
                    if let Some(last) = store.log().last() {
                        report.accepted.push(last.url.clone());
                    }
                }
                Recorded::Rejected => report.rejected += 1,
                Recorded::Duplicate | Recorded::Ignored => {}
            },
            Ok(None) => engine_trace!("no media yet in {container:?}"),
            Err(err) => {
                engine_error!("pin media processing error: {err}");
                report.failures += 1;
            }
        }
    }

    fn note_title(&mut self, tree: &PageTree, scope: NodeId) {
        if self.collection_title.is_some() {
            return;
        }
        self.collection_title = BOARD_PATTERNS
            .find_all(tree, scope)
            .into_iter()
            .map(|id| tree.text_content(id).trim().to_string())
            .find(|text| !text.is_empty());
    }
}

/// Canonicalizes, validates and stores one raw URL.
pub fn record(raw: &str, store: &mut CollectionStore) -> Recorded {
    if store.has_url(raw) {
        return Recorded::Duplicate;
    }
    let Some(canonical) = accept(raw) else {
        engine_debug!("rejected media url {raw}");
        return Recorded::Rejected;
    };
    if store.add_url(canonical) {
        Recorded::Accepted
    } else {
        Recorded::Duplicate
    }
}

/// Best raw URL of the first asset-bearing media element in `container`.
pub fn extract_raw_url(tree: &PageTree, container: NodeId) -> Result<Option<String>, ExtractionError> {
    if !tree.contains(container) {
        return Err(ExtractionError::StaleContainer(container));
    }
    if tree.element(container).is_none() {
        return Err(ExtractionError::NotAnElement(container));
    }
    let Some(media) = find_media(tree, container) else {
        return Ok(None);
    };
    Ok(raw_source(tree, media))
}

fn references_assets(value: Option<&str>) -> bool {
    value.map(|v| v.contains(ASSET_DOMAIN)).unwrap_or(false)
}

fn find_media(tree: &PageTree, container: NodeId) -> Option<NodeId> {
    tree.descendant_elements(container)
        .into_iter()
        .skip(1)
        .find(|id| is_media_candidate(tree, *id, container))
}

fn is_media_candidate(tree: &PageTree, id: NodeId, container: NodeId) -> bool {
    let Some(el) = tree.element(id) else {
        return false;
    };
    match el.tag() {
        "img" => references_assets(el.attr("src")) || references_assets(el.attr("data-src")),
        "video" => references_assets(el.attr("src")) || nested_source(tree, id).is_some(),
        "source" => {
            references_assets(el.attr("src")) && tree.has_ancestor_within(id, container, "video")
        }
        _ => false,
    }
}

fn nested_source(tree: &PageTree, media: NodeId) -> Option<String> {
    tree.descendant_elements(media)
        .into_iter()
        .skip(1)
        .filter_map(|id| tree.element(id))
        .filter(|el| el.tag() == "source")
        .filter_map(|el| el.attr("src"))
        .find(|src| src.contains(ASSET_DOMAIN))
        .map(str::to_string)
}

/// Live source first, then the deferred one, then a nested `<source>`.
fn raw_source(tree: &PageTree, media: NodeId) -> Option<String> {
    let el = tree.element(media)?;
    let usable = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.starts_with("data:"))
            .map(str::to_string)
    };
    usable(el.attr("src"))
        .or_else(|| usable(el.attr("data-src")))
        .or_else(|| nested_source(tree, media))
}

/// Copies `data-src` into `src` for media inside `container`.
fn promote_deferred_sources(tree: &mut PageTree, container: NodeId) -> usize {
    let mut promoted = 0;
    for id in tree.descendant_elements(container) {
        let deferred = tree
            .element(id)
            .filter(|el| matches!(el.tag(), "img" | "video"))
            .and_then(|el| el.attr("data-src"))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if let Some(deferred) = deferred {
            if tree.set_attr(id, "src", &deferred) {
                promoted += 1;
            }
        }
    }
    promoted
}
