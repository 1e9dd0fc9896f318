//! Keyword search over a content repository: two matchers, a source
//! classifier and the aggregator that merges their output.
//! Synchronous; the server drives it from a blocking task.

pub mod aggregate;
pub mod classify;
pub mod content;
pub mod metadata;

pub use crate::aggregate::Seeker;
pub use crate::classify::SourceClassifier;
pub use crate::content::ContentMatcher;
pub use crate::metadata::MetadataMatcher;
