use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};
use seeker_core::model::{ContentId, ContentItem, MetadataEntry};
use std::fs::File;
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;

const TITLE_PREFIX: &str = "Synthetic Page ";
const BODY_SENTENCE: &str =
    "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Vestibulum facilisis.";
const TYPES: [&str; 4] = ["post", "page", "custom_post_type", "attachment"];
/// Planted in roughly one body in ten and one metadata value in twenty.
pub const NEEDLE: &str = "seeker";

pub struct Corpus {
    pub items: Vec<ContentItem>,
    pub metadata: Vec<MetadataEntry>,
}

pub fn generate_corpus(count: usize, seed: u64) -> Corpus {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut items = Vec::with_capacity(count);
    let mut metadata = Vec::with_capacity(count * 2);
    for idx in 0..count {
        let id = idx as ContentId + 1;
        let title = format!("{TITLE_PREFIX}{idx:05}");
        let planted = if rng.gen_ratio(1, 10) { NEEDLE } else { "" };
        let body = format!(
            "{BODY_SENTENCE}\n{} {planted}\n{}",
            random_suffix(&mut rng),
            random_suffix(&mut rng)
        );
        let mut item = ContentItem::new(id, TYPES[idx % TYPES.len()], &title, &body);
        item.sticky = rng.gen_ratio(1, 50);
        items.push(item);

        metadata.push(MetadataEntry::new(id, "seo_title", &title));
        let value = if rng.gen_ratio(1, 20) {
            format!("{} {NEEDLE}", random_suffix(&mut rng))
        } else {
            random_suffix(&mut rng)
        };
        metadata.push(MetadataEntry::new(id, "subtitle", &value));
    }
    Corpus { items, metadata }
}

fn random_suffix(rng: &mut StdRng) -> String {
    (0..32).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Write the corpus as a JSONL content dump with embedded `meta` objects.
pub fn write_jsonl_dump(corpus: &Corpus) -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp dataset file");
    let mut writer = BufWriter::new(File::create(file.path()).expect("open dataset file"));
    for item in &corpus.items {
        let meta: serde_json::Map<String, serde_json::Value> = corpus
            .metadata
            .iter()
            .filter(|m| m.owner == item.id)
            .map(|m| (m.key.clone(), serde_json::Value::String(m.value.clone())))
            .collect();
        let value = serde_json::json!({
            "id": item.id,
            "type": item.content_type,
            "title": item.title,
            "content": item.body,
            "sticky": item.sticky,
            "meta": meta,
        });
        let line = serde_json::to_string(&value).expect("serialize jsonl record");
        writeln!(writer, "{line}").expect("write dataset row");
    }
    writer.flush().expect("flush dataset writer");
    file
}
