//! Single source of truth for what discovery has found in a page session.
use std::collections::HashSet;

use crate::canonical::{CanonicalUrl, MediaKind, ResolutionTier};
use crate::page::NodeId;

/// One accepted URL as shown in the review log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedUrl {
    pub url: String,
    pub kind: MediaKind,
    pub tier: ResolutionTier,
}

impl From<CanonicalUrl> for AcceptedUrl {
    fn from(value: CanonicalUrl) -> Self {
        Self {
            url: value.url,
            kind: value.kind,
            tier: value.tier,
        }
    }
}

/// Registered containers plus accepted URLs in acceptance order.
///
/// Containers survive [`CollectionStore::clear`]; URLs do not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionStore {
    containers: HashSet<NodeId>,
    urls: HashSet<String>,
    log: Vec<AcceptedUrl>,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_container(&self, id: NodeId) -> bool {
        self.containers.contains(&id)
    }

    /// Returns `false` if the container was already registered.
    pub fn add_container(&mut self, id: NodeId) -> bool {
        self.containers.insert(id)
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn has_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Records a canonical URL. Returns `false` for a duplicate, in which
    /// case neither the set nor the log changes.
    pub fn add_url(&mut self, canonical: CanonicalUrl) -> bool {
        if !self.urls.insert(canonical.url.clone()) {
            return false;
        }
        self.log.push(canonical.into());
        true
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn log(&self) -> &[AcceptedUrl] {
        &self.log
    }

    /// URLs in acceptance order; the index becomes the archive entry index.
    pub fn snapshot(&self) -> Vec<String> {
        self.log.iter().map(|entry| entry.url.clone()).collect()
    }

    /// Starts a fresh review: forgets URLs, keeps container registrations.
    pub fn clear(&mut self) {
        self.urls.clear();
        self.log.clear();
    }
}
