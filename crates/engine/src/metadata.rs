use std::collections::HashSet;

use seeker_core::{
    model::ContentId, traits::MetadataStore, validate::contains_ignore_case, SearchError,
};
use tracing::debug;

/// Resolves a keyword to the distinct owners of matching metadata values.
pub struct MetadataMatcher<'a, M> {
    store: &'a M,
}

impl<'a, M: MetadataStore> MetadataMatcher<'a, M> {
    pub fn new(store: &'a M) -> Self {
        Self { store }
    }

    /// Owner ids in first-seen order, one per item however many of its
    /// entries match. Entries with an empty key are ignored.
    pub fn match_metadata(&self, keyword: &str) -> Result<Vec<ContentId>, SearchError> {
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let entries = self
            .store
            .scan_entries_matching(keyword)
            .map_err(SearchError::metadata_store)?;
        let scanned = entries.len();
        let mut seen = HashSet::new();
        let ids: Vec<ContentId> = entries
            .into_iter()
            .filter(|e| !e.key.is_empty() && contains_ignore_case(&e.value, keyword))
            .filter_map(|e| seen.insert(e.owner).then_some(e.owner))
            .collect();
        debug!(scanned, owners = ids.len(), "metadata matcher finished");
        Ok(ids)
    }
}
