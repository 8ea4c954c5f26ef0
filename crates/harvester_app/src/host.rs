//! Stands in for the browser page: each snapshot is the board as it looked
//! after one more scroll, and its body content is appended to the live tree.
use std::collections::VecDeque;

use anyhow::Result;
use engine_logging::engine_info;
use harvester_core::{PageTree, TreeChange};
use harvester_engine::{graft_document, scan_asset_urls};

/// One scroll step worth of new content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reveal {
    pub changes: Vec<TreeChange>,
    /// URLs the page's own scripts would have requested.
    pub network_urls: Vec<String>,
}

pub struct SnapshotHost {
    tree: PageTree,
    pending: VecDeque<String>,
    revealed: usize,
}

impl SnapshotHost {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            tree: PageTree::new(),
            pending: sources.into(),
            revealed: 0,
        }
    }

    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut PageTree {
        &mut self.tree
    }

    pub fn has_more(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Loads the next snapshot with `load` and grafts it into the page.
    /// Returns `Ok(None)` once every snapshot has been shown.
    pub fn reveal_next(
        &mut self,
        load: &mut dyn FnMut(&str) -> Result<String>,
    ) -> Result<Option<Reveal>> {
        let Some(source) = self.pending.pop_front() else {
            return Ok(None);
        };
        let html = load(&source)?;
        let parent = self.tree.body();
        let outcome = graft_document(&mut self.tree, parent, &html);
        self.revealed += 1;
        engine_info!(
            "snapshot {} ({source}): {} new nodes, {} scripts",
            self.revealed,
            outcome.added.len(),
            outcome.scripts.len()
        );

        let network_urls = outcome
            .scripts
            .iter()
            .flat_map(|script| scan_asset_urls(script))
            .collect();
        Ok(Some(Reveal {
            changes: vec![TreeChange::ChildrenAdded(outcome.added)],
            network_urls,
        }))
    }
}
