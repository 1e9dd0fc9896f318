//! On-disk content repository.
//!
//! Layout under the root directory:
//!
//! ```text
//! content/<type>/<id>.json   one ContentItem per file
//! meta/metadata.jsonl        one MetadataEntry per line, append-only
//! meta/MANIFEST.json         id -> relative path of its content file
//! meta/LOCK                  exclusive writer lock
//! ```

use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Read, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use parking_lot::RwLock;
use seeker_core::{
    model::{ContentId, ContentItem, Field, MetadataEntry},
    traits::{ContentRepository, ContentStore, MetadataStore},
    validate::{contains_ignore_case, is_valid_content_type},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serde error: {0}")]
    Serde(String),
    #[error("invalid record: {0}")]
    Invalid(String),
}

#[derive(Default, Serialize, Deserialize, Clone)]
struct Manifest {
    ids: BTreeMap<ContentId, String>, // id -> relative path under root
    #[serde(default, rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct ReindexReport {
    pub scanned: usize,
    pub indexed: usize,
    pub skipped: usize,
}

pub struct LocalStore {
    root: PathBuf,
    manifest: RwLock<Option<Manifest>>,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let _ = fs::create_dir_all(root.join("content"));
        let _ = fs::create_dir_all(root.join("meta"));
        Self {
            root,
            manifest: RwLock::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("meta").join("MANIFEST.json")
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join("meta").join("metadata.jsonl")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("meta").join("LOCK")
    }

    fn ensure_dirs(&self) -> Result<(), LocalError> {
        fs::create_dir_all(self.root.join("content")).map_err(|e| LocalError::Io(e.to_string()))?;
        fs::create_dir_all(self.root.join("meta")).map_err(|e| LocalError::Io(e.to_string()))?;
        Ok(())
    }

    fn rel_path_for(item: &ContentItem) -> String {
        format!("content/{}/{}.json", item.content_type, item.id)
    }

    fn load_manifest(path: &Path) -> Result<Manifest, LocalError> {
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let mut s = String::new();
        File::open(path)
            .map_err(|e| LocalError::Io(e.to_string()))?
            .read_to_string(&mut s)
            .map_err(|e| LocalError::Io(e.to_string()))?;
        serde_json::from_str(&s).map_err(|e| LocalError::Serde(e.to_string()))
    }

    fn save_manifest(&self, m: &Manifest) -> Result<(), LocalError> {
        let path = self.manifest_path();
        let tmp = self.root.join("meta").join(format!(
            ".tmp-manifest-{}-{}.json",
            std::process::id(),
            unique_suffix()
        ));
        let data = serde_json::to_vec_pretty(m).map_err(|e| LocalError::Serde(e.to_string()))?;
        write_atomic(&tmp, &path, &data)
    }

    fn manifest_snapshot(&self) -> Result<Manifest, LocalError> {
        if let Some(m) = self.manifest.read().as_ref() {
            return Ok(m.clone());
        }
        let loaded = Self::load_manifest(&self.manifest_path())?;
        let mut guard = self.manifest.write();
        Ok(guard.get_or_insert(loaded).clone())
    }

    fn read_item(&self, rel: &str) -> Result<Option<ContentItem>, LocalError> {
        let path = self.root.join(rel);
        let mut s = String::new();
        match File::open(&path) {
            Ok(mut f) => {
                f.read_to_string(&mut s)
                    .map_err(|e| LocalError::Io(e.to_string()))?;
                let item: ContentItem =
                    serde_json::from_str(&s).map_err(|e| LocalError::Serde(e.to_string()))?;
                Ok(Some(item))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(rel_path = %rel, "local read miss: file vanished");
                Ok(None)
            }
            Err(e) => Err(LocalError::Io(e.to_string())),
        }
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T, LocalError>) -> Result<T, LocalError> {
        self.ensure_dirs()?;
        let lockf = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| LocalError::Io(e.to_string()))?;
        fs4::FileExt::lock_exclusive(&lockf).map_err(|e| LocalError::Io(e.to_string()))?;
        let res = f();
        let _ = fs4::FileExt::unlock(&lockf);
        res
    }

    /// Rebuild the manifest from the files under `content/`.
    pub fn reindex(&self) -> Result<ReindexReport, LocalError> {
        self.with_lock(|| {
            let mut report = ReindexReport::default();
            let mut manifest = Manifest::default();
            for entry in WalkDir::new(self.root.join("content"))
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                report.scanned += 1;
                let rel = match path.strip_prefix(&self.root) {
                    Ok(p) => p.to_string_lossy().replace('\\', "/"),
                    Err(_) => continue,
                };
                match self.read_item(&rel) {
                    Ok(Some(item)) => {
                        if let Some(prev) = manifest.ids.insert(item.id, rel.clone()) {
                            warn!(content_id = item.id, previous = %prev, current = %rel, "duplicate content id during reindex");
                        }
                        report.indexed += 1;
                    }
                    Ok(None) => report.skipped += 1,
                    Err(e) => {
                        warn!(rel_path = %rel, error = %e, "skipping unreadable content file");
                        report.skipped += 1;
                    }
                }
            }
            manifest.updated_at = Some(Utc::now());
            self.save_manifest(&manifest)?;
            *self.manifest.write() = Some(manifest);
            debug!(scanned = report.scanned, indexed = report.indexed, "local reindex committed");
            Ok(report)
        })
    }

    /// Every stored metadata entry, in append order.
    pub fn metadata_entries(&self) -> Result<Vec<MetadataEntry>, LocalError> {
        self.read_metadata()
    }

    fn read_metadata(&self) -> Result<Vec<MetadataEntry>, LocalError> {
        let path = self.metadata_path();
        let f = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LocalError::Io(e.to_string())),
        };
        let mut out = Vec::new();
        for line in BufReader::new(f).lines() {
            let l = line.map_err(|e| LocalError::Io(e.to_string()))?;
            if l.trim().is_empty() {
                continue;
            }
            let entry: MetadataEntry =
                serde_json::from_str(&l).map_err(|e| LocalError::Serde(e.to_string()))?;
            out.push(entry);
        }
        Ok(out)
    }
}

impl ContentStore for LocalStore {
    type Error = LocalError;

    fn search_by_text(
        &self,
        keyword: &str,
        types: &[String],
    ) -> Result<Vec<ContentItem>, Self::Error> {
        let manifest = self.manifest_snapshot()?;
        let mut out = Vec::new();
        for (id, rel) in &manifest.ids {
            let Some(item) = self.read_item(rel)? else {
                debug!(content_id = id, "manifest entry without file");
                continue;
            };
            let type_matches = types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&item.content_type));
            if !types.is_empty() && !type_matches {
                continue;
            }
            if contains_ignore_case(&item.title, keyword) || contains_ignore_case(&item.body, keyword)
            {
                out.push(item);
            }
        }
        debug!(scanned = manifest.ids.len(), matched = out.len(), "local text search");
        Ok(out)
    }

    fn get_by_id(&self, id: ContentId) -> Result<Option<ContentItem>, Self::Error> {
        let rel = match self.manifest_snapshot()?.ids.get(&id) {
            Some(r) => r.clone(),
            None => return Ok(None),
        };
        self.read_item(&rel)
    }

    fn get_field(&self, id: ContentId, field: Field) -> Result<Option<String>, Self::Error> {
        Ok(self.get_by_id(id)?.map(|item| item.field(field).to_owned()))
    }
}

impl MetadataStore for LocalStore {
    type Error = LocalError;

    fn scan_entries_matching(&self, needle: &str) -> Result<Vec<MetadataEntry>, Self::Error> {
        let mut entries = self.read_metadata()?;
        entries.retain(|e| contains_ignore_case(&e.value, needle));
        Ok(entries)
    }
}

impl ContentRepository for LocalStore {
    fn put_item(&self, item: &ContentItem) -> Result<(), LocalError> {
        let mut item = item.clone();
        item.content_type = item.content_type.trim().to_ascii_lowercase();
        if !is_valid_content_type(&item.content_type) {
            return Err(LocalError::Invalid(format!(
                "content type '{}' for item {}",
                item.content_type, item.id
            )));
        }
        let item = &item;
        self.with_lock(|| {
            let rel = Self::rel_path_for(item);
            let path = self.root.join(&rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| LocalError::Io(e.to_string()))?;
            }
            let data =
                serde_json::to_vec_pretty(item).map_err(|e| LocalError::Serde(e.to_string()))?;
            let tmp = path
                .parent()
                .ok_or_else(|| LocalError::Io(format!("no parent for {}", path.display())))?
                .join(format!(".tmp-{}-{}.json", item.id, unique_suffix()));
            write_atomic(&tmp, &path, &data)?;

            let mut manifest = self.manifest_snapshot()?;
            if let Some(prev) = manifest.ids.insert(item.id, rel.clone()) {
                if prev != rel {
                    // content type changed; drop the stale file
                    let _ = fs::remove_file(self.root.join(&prev));
                }
            }
            manifest.updated_at = Some(Utc::now());
            self.save_manifest(&manifest)?;
            *self.manifest.write() = Some(manifest);
            debug!(content_id = item.id, rel_path = %rel, "local put committed");
            Ok(())
        })
    }

    fn put_metadata(&self, entry: &MetadataEntry) -> Result<(), LocalError> {
        if entry.key.is_empty() {
            return Err(LocalError::Invalid(format!(
                "metadata for {} has an empty key",
                entry.owner
            )));
        }
        self.with_lock(|| {
            let mut line =
                serde_json::to_string(entry).map_err(|e| LocalError::Serde(e.to_string()))?;
            line.push('\n');
            let mut f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.metadata_path())
                .map_err(|e| LocalError::Io(e.to_string()))?;
            f.write_all(line.as_bytes())
                .map_err(|e| LocalError::Io(e.to_string()))?;
            f.sync_all().map_err(|e| LocalError::Io(e.to_string()))?;
            Ok(())
        })
    }

    fn count(&self) -> Result<usize, LocalError> {
        Ok(self.manifest_snapshot()?.ids.len())
    }
}

fn write_atomic(tmp: &Path, final_path: &Path, data: &[u8]) -> Result<(), LocalError> {
    {
        let mut f = File::create(tmp).map_err(|e| LocalError::Io(e.to_string()))?;
        f.write_all(data)
            .map_err(|e| LocalError::Io(e.to_string()))?;
        f.sync_all().map_err(|e| LocalError::Io(e.to_string()))?;
    }
    fs::rename(tmp, final_path).map_err(|e| LocalError::Io(e.to_string()))?;
    if let Some(dir) = final_path.parent() {
        let dir_file = File::open(dir).map_err(|e| LocalError::Io(e.to_string()))?;
        dir_file
            .sync_all()
            .map_err(|e| LocalError::Io(e.to_string()))?;
    }
    Ok(())
}

fn unique_suffix() -> u128 {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_nanos()
}
