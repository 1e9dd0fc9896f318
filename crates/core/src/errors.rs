use crate::model::ContentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("keyword is required")]
    MissingKeyword,
    #[error("keyword must be a string")]
    KeywordNotString,
    #[error("invalid content type: {0}")]
    InvalidContentType(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{store} store unavailable: {reason}")]
    StoreUnavailable { store: &'static str, reason: String },
    #[error("content item {0} could not be resolved")]
    ResolutionMiss(ContentId),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
}

impl SearchError {
    pub fn content_store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            store: "content",
            reason: err.to_string(),
        }
    }

    pub fn metadata_store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            store: "metadata",
            reason: err.to_string(),
        }
    }

    /// Short machine-readable code used by the transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable { .. } => "E_STORE_UNAVAILABLE",
            Self::ResolutionMiss(_) => "E_RESOLUTION_MISS",
            Self::InvalidInput(_) => "E_VALIDATION",
        }
    }
}
