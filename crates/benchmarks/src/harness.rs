use seeker_core::model::{ContentItem, MetadataEntry, SearchOptions};
use seeker_core::traits::{ContentRepository, ContentStore, MetadataStore};
use seeker_engine::Seeker;
use seeker_storage_ephemeral::EphemeralStore;
use seeker_storage_local::LocalStore;
use std::sync::Arc;
use std::time::Instant;

use crate::datasets::Corpus;

pub struct EphemeralStack {
    pub store: Arc<EphemeralStore>,
}

impl EphemeralStack {
    pub fn new() -> Self {
        Self {
            store: Arc::new(EphemeralStore::new()),
        }
    }

    pub fn load(&self, corpus: &Corpus) {
        save_all(self.store.as_ref(), &corpus.items, &corpus.metadata);
    }

    pub fn seeker(&self, options: SearchOptions) -> Seeker<EphemeralStore, EphemeralStore> {
        Seeker::with_options(Arc::clone(&self.store), Arc::clone(&self.store), options)
    }
}

impl Default for EphemeralStack {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LocalStack {
    pub store: Arc<LocalStore>,
    pub root: tempfile::TempDir,
}

impl LocalStack {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create local bench dir");
        let store = Arc::new(LocalStore::new(root.path()));
        Self { store, root }
    }

    pub fn load(&self, corpus: &Corpus) {
        save_all(self.store.as_ref(), &corpus.items, &corpus.metadata);
    }

    pub fn seeker(&self, options: SearchOptions) -> Seeker<LocalStore, LocalStore> {
        Seeker::with_options(Arc::clone(&self.store), Arc::clone(&self.store), options)
    }
}

impl Default for LocalStack {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_all<R>(repo: &R, items: &[ContentItem], metadata: &[MetadataEntry])
where
    R: ContentRepository,
{
    for item in items {
        repo.put_item(item).expect("put item");
    }
    for entry in metadata {
        repo.put_metadata(entry).expect("put metadata");
    }
}

pub fn measure_search<C, M>(seeker: &Seeker<C, M>, keyword: &str) -> usize
where
    C: ContentStore,
    M: MetadataStore,
{
    seeker.search(keyword).expect("search").len()
}

pub fn search_with_timing<C, M>(seeker: &Seeker<C, M>, keyword: &str) -> (usize, u128)
where
    C: ContentStore,
    M: MetadataStore,
{
    let start = Instant::now();
    let hits = measure_search(seeker, keyword);
    (hits, start.elapsed().as_micros())
}
