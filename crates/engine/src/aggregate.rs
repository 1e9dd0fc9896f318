use std::collections::HashSet;
use std::sync::Arc;

use seeker_core::{
    model::{ContentId, ContentItem, DedupPolicy, MatchSource, SearchOptions, SearchResult},
    traits::{ContentStore, MetadataStore},
    validate::normalize_content_types,
    SearchError,
};
use tracing::{debug, warn};

use crate::{ContentMatcher, MetadataMatcher, SourceClassifier};

/// Result aggregator. Owns both stores and answers one keyword at a time.
pub struct Seeker<C, M> {
    content: Arc<C>,
    metadata: Arc<M>,
    options: SearchOptions,
}

impl<C, M> Clone for Seeker<C, M> {
    fn clone(&self) -> Self {
        Self {
            content: Arc::clone(&self.content),
            metadata: Arc::clone(&self.metadata),
            options: self.options.clone(),
        }
    }
}

impl<C, M> Seeker<C, M>
where
    C: ContentStore,
    M: MetadataStore,
{
    #[must_use]
    pub fn new(content: C, metadata: M) -> Self {
        Self::with_options(Arc::new(content), Arc::new(metadata), SearchOptions::default())
    }

    #[must_use]
    pub fn with_options(content: Arc<C>, metadata: Arc<M>, options: SearchOptions) -> Self {
        Self {
            content,
            metadata,
            options,
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Content-matched rows first, then metadata-matched rows.
    ///
    /// An invalid configured content type is rejected before any store call.
    /// A content store failure aborts before the metadata store is queried.
    /// A metadata store failure aborts too; no partial results are returned.
    pub fn search(&self, keyword: &str) -> Result<Vec<SearchResult>, SearchError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let types = normalize_content_types(&self.options.content_types)?;
        let content_items = ContentMatcher::new(&*self.content, &types).match_content(keyword)?;
        let classifier = SourceClassifier::new(&*self.content);
        let mut results = Vec::with_capacity(content_items.len());
        for item in &content_items {
            let source = classifier.classify(item.id, keyword)?;
            results.push(SearchResult::from_item(item, source));
        }
        let content_hits = results.len();

        let owner_ids = MetadataMatcher::new(&*self.metadata).match_metadata(keyword)?;
        for id in owner_ids {
            match self.resolve(id) {
                Ok(item) => results.push(SearchResult::from_item(&item, MatchSource::Meta)),
                Err(miss) => warn!(error = %miss, "skipping metadata match"),
            }
        }
        let meta_hits = results.len() - content_hits;

        if self.options.dedup == DedupPolicy::FirstSeen {
            let mut seen = HashSet::new();
            results.retain(|r| seen.insert(r.content_item_id));
        }

        debug!(
            keyword_len = keyword.chars().count(),
            content_hits,
            meta_hits,
            returned = results.len(),
            dedup = ?self.options.dedup,
            "search completed"
        );
        Ok(results)
    }

    fn resolve(&self, id: ContentId) -> Result<ContentItem, SearchError> {
        match self.content.get_by_id(id) {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(SearchError::ResolutionMiss(id)),
            Err(e) => {
                debug!(content_id = id, error = %e, "content lookup failed");
                Err(SearchError::ResolutionMiss(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seeker_core::{
        model::{Field, MetadataEntry},
        traits::ContentRepository,
    };
    use seeker_storage_ephemeral::EphemeralStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scenario_store() -> Arc<EphemeralStore> {
        let store = EphemeralStore::new();
        store
            .put_item(&ContentItem::new(1, "post", "Alpha", "the Seeker plugin").with_urls(
                "https://example.org/?p=1",
                "https://example.org/wp-admin/post.php?post=1&action=edit",
            ))
            .unwrap();
        store
            .put_metadata(&MetadataEntry::new(1, "tag", "seeker-related"))
            .unwrap();
        Arc::new(store)
    }

    fn seeker(store: Arc<EphemeralStore>, dedup: DedupPolicy) -> Seeker<EphemeralStore, EphemeralStore> {
        let options = SearchOptions {
            dedup,
            ..SearchOptions::default()
        };
        Seeker::with_options(Arc::clone(&store), store, options)
    }

    fn sources(results: &[SearchResult]) -> Vec<(u64, MatchSource)> {
        results
            .iter()
            .map(|r| (r.content_item_id, r.source))
            .collect()
    }

    #[test]
    fn empty_and_blank_keywords_return_nothing() {
        let s = seeker(scenario_store(), DedupPolicy::KeepAll);
        assert!(s.search("").unwrap().is_empty());
        assert!(s.search("   \t ").unwrap().is_empty());
    }

    #[test]
    fn keep_all_reports_both_sources() {
        let s = seeker(scenario_store(), DedupPolicy::KeepAll);
        let results = s.search("seeker").unwrap();
        assert_eq!(
            sources(&results),
            vec![(1, MatchSource::Content), (1, MatchSource::Meta)]
        );
        assert_eq!(results[0].title, "Alpha");
        assert_eq!(results[0].view_url, "https://example.org/?p=1");
        assert_eq!(
            results[1].edit_url,
            "https://example.org/wp-admin/post.php?post=1&action=edit"
        );
    }

    #[test]
    fn first_seen_keeps_content_label() {
        let s = seeker(scenario_store(), DedupPolicy::FirstSeen);
        let results = s.search("SEEKER").unwrap();
        assert_eq!(sources(&results), vec![(1, MatchSource::Content)]);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let s = seeker(scenario_store(), DedupPolicy::KeepAll);
        assert!(s.search("zzz-nomatch-zzz").unwrap().is_empty());
    }

    #[test]
    fn metadata_only_match_is_meta() {
        let store = scenario_store();
        store
            .put_item(&ContentItem::new(2, "page", "Beta", "no keyword here"))
            .unwrap();
        store
            .put_metadata(&MetadataEntry::new(2, "colour", "Ultramarine"))
            .unwrap();
        store
            .put_metadata(&MetadataEntry::new(2, "shade", "ultramarine deep"))
            .unwrap();
        let s = seeker(store, DedupPolicy::KeepAll);
        assert_eq!(
            sources(&s.search("ultramarine").unwrap()),
            vec![(2, MatchSource::Meta)]
        );
    }

    #[test]
    fn title_only_match_is_unknown() {
        let store = scenario_store();
        store
            .put_item(&ContentItem::new(3, "post", "Zebra facts", "stripes"))
            .unwrap();
        let s = seeker(store, DedupPolicy::KeepAll);
        assert_eq!(
            sources(&s.search("zebra").unwrap()),
            vec![(3, MatchSource::Unknown)]
        );
    }

    #[test]
    fn unresolvable_metadata_owner_is_skipped() {
        let store = scenario_store();
        store
            .put_metadata(&MetadataEntry::new(404, "tag", "seeker orphan"))
            .unwrap();
        let s = seeker(store, DedupPolicy::KeepAll);
        let ids: Vec<u64> = s
            .search("seeker")
            .unwrap()
            .iter()
            .map(|r| r.content_item_id)
            .collect();
        assert_eq!(ids, vec![1, 1]);
    }

    #[test]
    fn content_rows_precede_metadata_rows() {
        let store = scenario_store();
        store
            .put_item(&ContentItem::new(9, "post", "Omega", "nothing"))
            .unwrap();
        store
            .put_metadata(&MetadataEntry::new(9, "note", "seeker"))
            .unwrap();
        store
            .put_item(&ContentItem::new(20, "page", "Later", "seeker again"))
            .unwrap();
        let s = seeker(store, DedupPolicy::KeepAll);
        assert_eq!(
            sources(&s.search("seeker").unwrap()),
            vec![
                (1, MatchSource::Content),
                (20, MatchSource::Content),
                (1, MatchSource::Meta),
                (9, MatchSource::Meta),
            ]
        );
    }

    #[derive(Debug)]
    struct Down;

    impl std::fmt::Display for Down {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl std::error::Error for Down {}

    struct BrokenContent;

    impl ContentStore for BrokenContent {
        type Error = Down;

        fn search_by_text(&self, _: &str, _: &[String]) -> Result<Vec<ContentItem>, Self::Error> {
            Err(Down)
        }

        fn get_by_id(&self, _: ContentId) -> Result<Option<ContentItem>, Self::Error> {
            Err(Down)
        }

        fn get_field(&self, _: ContentId, _: Field) -> Result<Option<String>, Self::Error> {
            Err(Down)
        }
    }

    #[derive(Default)]
    struct CountingMetadata {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MetadataStore for CountingMetadata {
        type Error = Down;

        fn scan_entries_matching(&self, _: &str) -> Result<Vec<MetadataEntry>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Down)
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[test]
    fn content_failure_is_fatal_and_fails_fast() {
        let metadata = Arc::new(CountingMetadata::default());
        let s = Seeker::with_options(
            Arc::new(BrokenContent),
            Arc::clone(&metadata),
            SearchOptions::default(),
        );
        let err = s.search("seeker").unwrap_err();
        assert!(matches!(
            err,
            SearchError::StoreUnavailable { store: "content", .. }
        ));
        assert_eq!(metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_content_type_is_rejected_before_store_calls() {
        let metadata = Arc::new(CountingMetadata::default());
        let options = SearchOptions {
            content_types: vec!["not a type".into()],
            ..SearchOptions::default()
        };
        let s = Seeker::with_options(scenario_store(), Arc::clone(&metadata), options);
        let err = s.search("seeker").unwrap_err();
        assert!(matches!(
            err,
            SearchError::InvalidInput(seeker_core::ValidationError::InvalidContentType(_))
        ));
        assert_eq!(err.code(), "E_VALIDATION");
        assert_eq!(metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn configured_types_are_normalized() {
        let options = SearchOptions {
            content_types: vec![" POST ".into()],
            ..SearchOptions::default()
        };
        let s = Seeker::with_options(scenario_store(), scenario_store(), options);
        assert_eq!(s.search("seeker").unwrap().len(), 2);
    }

    #[test]
    fn metadata_failure_is_fatal() {
        let metadata = Arc::new(CountingMetadata {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let s = Seeker::with_options(scenario_store(), metadata, SearchOptions::default());
        let err = s.search("seeker").unwrap_err();
        assert!(matches!(
            err,
            SearchError::StoreUnavailable { store: "metadata", .. }
        ));
    }

    #[test]
    fn unreachable_store_during_resolution_skips_item() {
        struct OneMeta;
        impl MetadataStore for OneMeta {
            type Error = Down;
            fn scan_entries_matching(&self, _: &str) -> Result<Vec<MetadataEntry>, Self::Error> {
                Ok(vec![MetadataEntry::new(5, "k", "seeker")])
            }
        }
        struct EmptyButBrokenLookup;
        impl ContentStore for EmptyButBrokenLookup {
            type Error = Down;
            fn search_by_text(&self, _: &str, _: &[String]) -> Result<Vec<ContentItem>, Self::Error> {
                Ok(Vec::new())
            }
            fn get_by_id(&self, _: ContentId) -> Result<Option<ContentItem>, Self::Error> {
                Err(Down)
            }
            fn get_field(&self, _: ContentId, _: Field) -> Result<Option<String>, Self::Error> {
                Err(Down)
            }
        }
        let s = Seeker::new(EmptyButBrokenLookup, OneMeta);
        assert!(s.search("seeker").unwrap().is_empty());
    }
}
