//! Importers for content repository dumps and link derivation.

use chrono::{DateTime, Utc};
use seeker_core::model::{ContentId, ContentItem, MetadataEntry};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};
use url::Url;

/// One exported content item. Unknown fields are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: ContentId,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "content")]
    pub body: String,
    #[serde(default, alias = "permalink")]
    pub url: Option<String>,
    #[serde(default, alias = "edit_link")]
    pub edit_url: Option<String>,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default)]
pub struct ImportBatch {
    pub items: Vec<ContentItem>,
    pub metadata: Vec<MetadataEntry>,
}

/// Builds view and edit links for items that were exported without them.
#[derive(Clone, Debug)]
pub struct SiteUrls {
    base: Url,
}

impl SiteUrls {
    pub fn parse(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    pub fn permalink(&self, id: ContentId) -> String {
        let mut u = self.base.clone();
        u.query_pairs_mut().append_pair("p", &id.to_string());
        u.to_string()
    }

    pub fn edit_link(&self, id: ContentId) -> String {
        let mut u = self
            .base
            .join("wp-admin/post.php")
            .unwrap_or_else(|_| self.base.clone());
        u.query_pairs_mut()
            .append_pair("post", &id.to_string())
            .append_pair("action", "edit");
        u.to_string()
    }
}

fn meta_value_to_string(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn from_record(rec: ContentRecord, site: Option<&SiteUrls>) -> (ContentItem, Vec<MetadataEntry>) {
    let id = rec.id;
    let content_type = rec
        .content_type
        .as_deref()
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "post".to_string());
    let mut item = ContentItem::new(
        id,
        &content_type,
        rec.title.as_deref().unwrap_or(""),
        &rec.body,
    );
    item.sticky = rec.sticky;
    item.modified_at = rec.modified_at;
    item.url = match (rec.url, site) {
        (Some(u), _) if !u.is_empty() => u,
        (_, Some(site)) => site.permalink(id),
        _ => String::new(),
    };
    item.edit_url = match (rec.edit_url, site) {
        (Some(u), _) if !u.is_empty() => u,
        (_, Some(site)) => site.edit_link(id),
        _ => String::new(),
    };
    let meta = rec
        .meta
        .into_iter()
        .filter(|(k, _)| !k.is_empty())
        .map(|(key, value)| MetadataEntry {
            owner: id,
            key,
            value: meta_value_to_string(value),
        })
        .collect();
    (item, meta)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    JsonArray,
    Jsonl,
}

pub fn detect_format<P: AsRef<Path>>(path: P) -> std::io::Result<DumpFormat> {
    let mut f = File::open(path)?;
    let mut buf = [0u8; 64];
    let n = f.read(&mut buf)?;
    let first = buf[..n].iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'[') {
        Ok(DumpFormat::JsonArray)
    } else {
        Ok(DumpFormat::Jsonl)
    }
}

fn read_records<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> std::io::Result<Vec<T>> {
    match detect_format(&path)? {
        DumpFormat::JsonArray => {
            let mut s = String::new();
            File::open(path)?.read_to_string(&mut s)?;
            serde_json::from_str(&s)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        }
        DumpFormat::Jsonl => {
            let reader = BufReader::new(File::open(path)?);
            let mut out = Vec::new();
            for line in reader.lines() {
                let l = line?;
                if l.trim().is_empty() {
                    continue;
                }
                let rec: T = serde_json::from_str(&l)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                out.push(rec);
            }
            Ok(out)
        }
    }
}

/// Read a content dump. Metadata embedded under each record's `meta` object
/// is returned alongside the items.
pub fn import_content_from_path<P: AsRef<Path>>(
    path: P,
    site: Option<&SiteUrls>,
) -> std::io::Result<ImportBatch> {
    let records: Vec<ContentRecord> = read_records(path)?;
    let mut batch = ImportBatch::default();
    for rec in records {
        let (item, meta) = from_record(rec, site);
        batch.items.push(item);
        batch.metadata.extend(meta);
    }
    Ok(batch)
}

/// Read a standalone metadata dump of `{owner, key, value}` records.
/// Entries with an empty key are dropped.
pub fn import_metadata_from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<MetadataEntry>> {
    let mut entries: Vec<MetadataEntry> = read_records(path)?;
    entries.retain(|e| !e.key.is_empty());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn site_urls_build_links() {
        let site = SiteUrls::parse("https://example.org/blog").unwrap();
        assert_eq!(site.permalink(7), "https://example.org/blog/?p=7");
        assert_eq!(
            site.edit_link(7),
            "https://example.org/blog/wp-admin/post.php?post=7&action=edit"
        );
        assert!(SiteUrls::parse("not a url").is_err());
    }

    #[test]
    fn detect_and_import_jsonl_with_embedded_meta() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("content.jsonl");
        let content = r#"{"id":1,"title":"Alpha","content":"the Seeker plugin","meta":{"tag":"seeker-related","rating":5,"":"dropped"}}
{"id":2,"type":"page","title":"Beta","body":"x","url":"https://other/beta"}
"#;
        fs::write(&p, content).unwrap();
        assert_eq!(detect_format(&p).unwrap(), DumpFormat::Jsonl);
        let site = SiteUrls::parse("https://example.org").unwrap();
        let batch = import_content_from_path(&p, Some(&site)).unwrap();
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].content_type, "post");
        assert_eq!(batch.items[0].body, "the Seeker plugin");
        assert_eq!(batch.items[0].url, "https://example.org/?p=1");
        assert_eq!(batch.items[1].url, "https://other/beta");
        assert_eq!(
            batch.items[1].edit_url,
            "https://example.org/wp-admin/post.php?post=2&action=edit"
        );
        assert_eq!(
            batch.metadata,
            vec![
                MetadataEntry::new(1, "rating", "5"),
                MetadataEntry::new(1, "tag", "seeker-related"),
            ]
        );
    }

    #[test]
    fn detect_and_import_json_array_metadata() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("meta.json");
        let content = r#"
  [
    {"owner": 1, "key": "tag", "value": "a"},
    {"owner": 2, "key": "", "value": "b"}
  ]"#;
        fs::write(&p, content).unwrap();
        assert_eq!(detect_format(&p).unwrap(), DumpFormat::JsonArray);
        let entries = import_metadata_from_path(&p).unwrap();
        assert_eq!(entries, vec![MetadataEntry::new(1, "tag", "a")]);
    }

    #[test]
    fn record_type_is_lowercased() {
        let rec: ContentRecord =
            serde_json::from_value(serde_json::json!({"id": 4, "type": "Page", "content": "x"}))
                .unwrap();
        let (item, _) = from_record(rec, None);
        assert_eq!(item.content_type, "page");

        let rec: ContentRecord =
            serde_json::from_value(serde_json::json!({"id": 5, "type": "  "})).unwrap();
        assert_eq!(from_record(rec, None).0.content_type, "post");
    }

    #[test]
    fn malformed_line_is_invalid_data() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("bad.jsonl");
        fs::write(&p, "{\"id\":1}\n{oops}\n").unwrap();
        let err = import_content_from_path(&p, None).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
