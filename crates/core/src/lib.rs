//! Core domain model, validation, and store traits for keyword search.
//! No async and no IO within this crate.

pub mod errors;
pub mod model;
pub mod traits;
pub mod validate;

pub use crate::errors::{SearchError, ValidationError};
pub use crate::model::{
    ContentId, ContentItem, DedupPolicy, Field, MatchSource, MetadataEntry, SearchOptions,
    SearchResult,
};
pub use crate::traits::{ContentRepository, ContentStore, MetadataStore};
pub use crate::validate::{
    contains_ignore_case, is_valid_content_type, normalize_content_types, sanitize_keyword,
    DEFAULT_CONTENT_TYPES, DEFAULT_MAX_KEYWORD_CHARS,
};
