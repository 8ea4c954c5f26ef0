use crate::collection::CollectionStore;

/// Container count at which the auto-scroll bar reads 100%.
pub const SCROLL_TARGET_CONTAINERS: usize = 500;

/// `round(processed / total * 100)`, clamped to 100; 0 for an empty job.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (processed as f64 / total as f64 * 100.0).round();
    value.clamp(0.0, 100.0) as u8
}

pub fn discovery_count(store: &CollectionStore) -> usize {
    store.len()
}

pub fn scroll_percent(containers: usize) -> u8 {
    percent(containers.min(SCROLL_TARGET_CONTAINERS), SCROLL_TARGET_CONTAINERS)
}
