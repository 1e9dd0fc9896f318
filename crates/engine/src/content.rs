use seeker_core::{model::ContentItem, traits::ContentStore, SearchError};
use tracing::debug;

/// Finds content items of the configured types whose text matches a keyword.
pub struct ContentMatcher<'a, C> {
    store: &'a C,
    types: &'a [String],
}

impl<'a, C: ContentStore> ContentMatcher<'a, C> {
    pub fn new(store: &'a C, types: &'a [String]) -> Self {
        Self { store, types }
    }

    /// Every matching item, unpaginated. Ordering is whatever the store returns.
    pub fn match_content(&self, keyword: &str) -> Result<Vec<ContentItem>, SearchError> {
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let items = self
            .store
            .search_by_text(keyword, self.types)
            .map_err(SearchError::content_store)?;
        debug!(matched = items.len(), types = ?self.types, "content matcher finished");
        Ok(items)
    }
}
