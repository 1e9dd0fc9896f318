use std::collections::BTreeMap;

use parking_lot::RwLock;
use seeker_core::{
    model::{ContentId, ContentItem, Field, MetadataEntry},
    traits::{ContentRepository, ContentStore, MetadataStore},
    validate::contains_ignore_case,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemeralError {
    #[error("invalid metadata entry for {0}: key must not be empty")]
    EmptyKey(ContentId),
}

/// In-memory content and metadata store. Items are kept ordered by id;
/// metadata entries keep insertion order.
pub struct EphemeralStore {
    items: RwLock<BTreeMap<ContentId, ContentItem>>,
    metadata: RwLock<Vec<MetadataEntry>>,
}

impl EphemeralStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(items: Vec<ContentItem>, metadata: Vec<MetadataEntry>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|i| (i.id, i)).collect()),
            metadata: RwLock::new(metadata),
        }
    }

    pub fn remove_item(&self, id: ContentId) -> bool {
        self.items.write().remove(&id).is_some()
    }

    pub fn metadata_for(&self, owner: ContentId) -> Vec<MetadataEntry> {
        self.metadata
            .read()
            .iter()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect()
    }
}

impl Default for EphemeralStore {
    fn default() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            metadata: RwLock::new(Vec::new()),
        }
    }
}

impl ContentStore for EphemeralStore {
    type Error = EphemeralError;

    fn search_by_text(
        &self,
        keyword: &str,
        types: &[String],
    ) -> Result<Vec<ContentItem>, Self::Error> {
        let items = self.items.read();
        Ok(items
            .values()
            .filter(|item| {
                types.is_empty() || types.iter().any(|t| t.eq_ignore_ascii_case(&item.content_type))
            })
            .filter(|item| {
                contains_ignore_case(&item.title, keyword)
                    || contains_ignore_case(&item.body, keyword)
            })
            .cloned()
            .collect())
    }

    fn get_by_id(&self, id: ContentId) -> Result<Option<ContentItem>, Self::Error> {
        Ok(self.items.read().get(&id).cloned())
    }

    fn get_field(&self, id: ContentId, field: Field) -> Result<Option<String>, Self::Error> {
        Ok(self
            .items
            .read()
            .get(&id)
            .map(|item| item.field(field).to_owned()))
    }
}

impl MetadataStore for EphemeralStore {
    type Error = EphemeralError;

    fn scan_entries_matching(&self, needle: &str) -> Result<Vec<MetadataEntry>, Self::Error> {
        Ok(self
            .metadata
            .read()
            .iter()
            .filter(|e| contains_ignore_case(&e.value, needle))
            .cloned()
            .collect())
    }
}

impl ContentRepository for EphemeralStore {
    fn put_item(&self, item: &ContentItem) -> Result<(), EphemeralError> {
        self.items.write().insert(item.id, item.clone());
        Ok(())
    }

    fn put_metadata(&self, entry: &MetadataEntry) -> Result<(), EphemeralError> {
        if entry.key.is_empty() {
            return Err(EphemeralError::EmptyKey(entry.owner));
        }
        self.metadata.write().push(entry.clone());
        Ok(())
    }

    fn count(&self) -> Result<usize, EphemeralError> {
        Ok(self.items.read().len())
    }
}
