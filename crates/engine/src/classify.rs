use seeker_core::{
    model::{ContentId, Field, MatchSource},
    traits::ContentStore,
    validate::contains_ignore_case,
    SearchError,
};

/// Labels a content-matched item by where the keyword occurs.
///
/// The body is fetched fresh from the store and searched case-insensitively.
/// A hit yields [`MatchSource::Content`]; anything else (title-only match,
/// item gone since the content query) yields [`MatchSource::Unknown`].
/// Never returns [`MatchSource::Meta`]: metadata rows are labelled by the
/// aggregator directly.
pub struct SourceClassifier<'a, C> {
    store: &'a C,
}

impl<'a, C: ContentStore> SourceClassifier<'a, C> {
    pub fn new(store: &'a C) -> Self {
        Self { store }
    }

    pub fn classify(&self, id: ContentId, keyword: &str) -> Result<MatchSource, SearchError> {
        let body = self
            .store
            .get_field(id, Field::Body)
            .map_err(SearchError::content_store)?;
        Ok(match body {
            Some(text) if contains_ignore_case(&text, keyword) => MatchSource::Content,
            _ => MatchSource::Unknown,
        })
    }
}
