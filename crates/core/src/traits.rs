use crate::model::{ContentId, ContentItem, Field, MetadataEntry};

/// Read side of a content repository.
/// No async in core; callers should use spawn_blocking when invoking from async contexts.
pub trait ContentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Items of the given types whose title or body contains `keyword`,
    /// compared case-insensitively. An empty `types` slice means every type.
    fn search_by_text(
        &self,
        keyword: &str,
        types: &[String],
    ) -> Result<Vec<ContentItem>, Self::Error>;

    fn get_by_id(&self, id: ContentId) -> Result<Option<ContentItem>, Self::Error>;

    fn get_field(&self, id: ContentId, field: Field) -> Result<Option<String>, Self::Error>;
}

/// Key-value annotations stored apart from content bodies.
pub trait MetadataStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Entries whose value contains `needle`, compared case-insensitively.
    fn scan_entries_matching(&self, needle: &str) -> Result<Vec<MetadataEntry>, Self::Error>;
}

/// Write side used by importers and tooling. The search path never calls it.
pub trait ContentRepository: ContentStore + MetadataStore {
    fn put_item(&self, item: &ContentItem) -> Result<(), <Self as ContentStore>::Error>;

    fn put_metadata(&self, entry: &MetadataEntry) -> Result<(), <Self as MetadataStore>::Error>;

    fn count(&self) -> Result<usize, <Self as ContentStore>::Error>;
}
