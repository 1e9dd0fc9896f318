use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validate::{DEFAULT_CONTENT_TYPES, DEFAULT_MAX_KEYWORD_CHARS};

pub type ContentId = u64;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: ContentId,
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub edit_url: String,
    /// Pinned hint carried over from the source repository. Never affects ordering.
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    pub fn new(id: ContentId, content_type: &str, title: &str, body: &str) -> Self {
        Self {
            id,
            content_type: content_type.to_owned(),
            title: title.to_owned(),
            body: body.to_owned(),
            url: String::new(),
            edit_url: String::new(),
            sticky: false,
            modified_at: None,
        }
    }

    pub fn with_urls(mut self, url: impl Into<String>, edit_url: impl Into<String>) -> Self {
        self.url = url.into();
        self.edit_url = edit_url.into();
        self
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Body => &self.body,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MetadataEntry {
    pub owner: ContentId,
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(owner: ContentId, key: &str, value: &str) -> Self {
        Self {
            owner,
            key: key.to_owned(),
            value: value.to_owned(),
        }
    }
}

/// Text fields a content store can hand out by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Body,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchSource {
    Content,
    Meta,
    /// Content-matched item whose body does not contain the keyword.
    Unknown,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "Content",
            Self::Meta => "Meta",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub content_item_id: ContentId,
    pub title: String,
    pub view_url: String,
    pub edit_url: String,
    pub source: MatchSource,
}

impl SearchResult {
    pub fn from_item(item: &ContentItem, source: MatchSource) -> Self {
        Self {
            content_item_id: item.id,
            title: item.title.clone(),
            view_url: item.url.clone(),
            edit_url: item.edit_url.clone(),
            source,
        }
    }
}

/// How rows for an item matched by both content and metadata are merged.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// One row per matcher hit; an item can appear twice.
    #[default]
    KeepAll,
    /// At most one row per content id, keeping the first label produced.
    FirstSeen,
}

impl DedupPolicy {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().replace('-', "_").as_str() {
            "keep_all" | "none" => Some(Self::KeepAll),
            "first_seen" | "dedup" => Some(Self::FirstSeen),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchOptions {
    pub content_types: Vec<String>,
    #[serde(default)]
    pub dedup: DedupPolicy,
    pub max_keyword_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            content_types: DEFAULT_CONTENT_TYPES
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            dedup: DedupPolicy::KeepAll,
            max_keyword_chars: DEFAULT_MAX_KEYWORD_CHARS,
        }
    }
}
