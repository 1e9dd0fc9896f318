#[cfg(test)]
mod tests {
    use seeker_compat::{import_content_from_path, SiteUrls};
    use seeker_core::{
        model::{ContentItem, DedupPolicy, MatchSource, MetadataEntry, SearchOptions},
        traits::ContentRepository,
    };
    use seeker_engine::Seeker;
    use seeker_storage_ephemeral::EphemeralStore;
    use seeker_storage_local::LocalStore;
    use std::{fs, sync::Arc};
    use tempfile::tempdir;

    fn seed<R: ContentRepository>(repo: &R)
    where
        <R as seeker_core::traits::ContentStore>::Error: std::fmt::Debug,
        <R as seeker_core::traits::MetadataStore>::Error: std::fmt::Debug,
    {
        repo.put_item(&ContentItem::new(1, "post", "Alpha", "the Seeker plugin"))
            .unwrap();
        repo.put_item(&ContentItem::new(2, "page", "Beta", "nothing to see"))
            .unwrap();
        repo.put_item(&ContentItem::new(3, "attachment", "Gamma", "seeker in an attachment"))
            .unwrap();
        repo.put_metadata(&MetadataEntry::new(1, "tag", "seeker-related"))
            .unwrap();
        repo.put_metadata(&MetadataEntry::new(2, "subtitle", "Seeker guide"))
            .unwrap();
        repo.put_metadata(&MetadataEntry::new(2, "alt", "another SEEKER mention"))
            .unwrap();
    }

    fn rows(results: &[seeker_core::model::SearchResult]) -> Vec<(u64, MatchSource)> {
        results.iter().map(|r| (r.content_item_id, r.source)).collect()
    }

    #[test]
    fn local_and_ephemeral_backends_agree() {
        let dir = tempdir().unwrap();
        let local = LocalStore::new(dir.path());
        seed(&local);
        let memory = EphemeralStore::new();
        seed(&memory);

        let expected = vec![
            (1, MatchSource::Content),
            (1, MatchSource::Meta),
            (2, MatchSource::Meta),
        ];
        let from_local = Seeker::new(local, LocalStore::new(dir.path()))
            .search("seeker")
            .unwrap();
        assert_eq!(rows(&from_local), expected);

        let memory = Arc::new(memory);
        let from_memory =
            Seeker::with_options(Arc::clone(&memory), memory, SearchOptions::default())
                .search("seeker")
                .unwrap();
        assert_eq!(rows(&from_memory), expected);
    }

    #[test]
    fn first_seen_collapses_on_disk_results() {
        let dir = tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        seed(store.as_ref());
        let options = SearchOptions {
            dedup: DedupPolicy::FirstSeen,
            ..SearchOptions::default()
        };
        let seeker = Seeker::with_options(Arc::clone(&store), store, options);
        assert_eq!(
            rows(&seeker.search("SEEKER").unwrap()),
            vec![(1, MatchSource::Content), (2, MatchSource::Meta)]
        );
    }

    #[test]
    fn imported_dump_is_searchable_with_derived_links() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("dump.json");
        fs::write(
            &dump,
            r#"[
  {"id": 10, "type": "page", "title": "About", "content": "We build the Seeker.", "meta": {"seo_title": "About Seeker"}},
  {"id": 11, "type": "post", "title": "News", "content": "unrelated"}
]"#,
        )
        .unwrap();
        let site = SiteUrls::parse("https://example.org").unwrap();
        let batch = import_content_from_path(&dump, Some(&site)).unwrap();

        let store = Arc::new(LocalStore::new(dir.path().join("repo")));
        for item in &batch.items {
            store.put_item(item).unwrap();
        }
        for entry in &batch.metadata {
            store.put_metadata(entry).unwrap();
        }
        let seeker = Seeker::with_options(Arc::clone(&store), store, SearchOptions::default());
        let results = seeker.search("seeker").unwrap();
        assert_eq!(
            rows(&results),
            vec![(10, MatchSource::Content), (10, MatchSource::Meta)]
        );
        assert_eq!(results[0].view_url, "https://example.org/?p=10");
        assert_eq!(
            results[0].edit_url,
            "https://example.org/wp-admin/post.php?post=10&action=edit"
        );
    }

    #[test]
    fn mixed_case_types_stay_searchable_after_import() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("dump.jsonl");
        fs::write(
            &dump,
            "{\"id\":1,\"type\":\"Page\",\"title\":\"About\",\"content\":\"seeker here\"}\n",
        )
        .unwrap();
        let batch = import_content_from_path(&dump, None).unwrap();
        let store = Arc::new(LocalStore::new(dir.path().join("repo")));
        for item in &batch.items {
            store.put_item(item).unwrap();
        }
        let seeker = Seeker::with_options(Arc::clone(&store), store, SearchOptions::default());
        assert_eq!(
            rows(&seeker.search("seeker").unwrap()),
            vec![(1, MatchSource::Content)]
        );
    }

    #[tokio::test]
    async fn server_over_local_store() {
        let dir = tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        seed(store.as_ref());
        let server = seeker_server::Server::new_with_options(
            Arc::clone(&store),
            store,
            seeker_server::ServerOptions::default(),
        );
        let results = server.search("\tseeker\u{7}").await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(server.search("   ").await.unwrap().is_empty());
    }
}
