use schemars::JsonSchema;
use seeker_core::{model::SearchResult, ValidationError};
use serde::{de, Deserialize, Serialize};

pub const METHOD_SEEK_POSTS: &str = "seek_posts";
/// Alias of [`METHOD_SEEK_POSTS`] for clients that prefer a plain name.
pub const METHOD_SEARCH: &str = "search";
pub const METHOD_METHODS_LIST: &str = "methods/list";
/// Value of the `action` form field accepted by the ajax-style endpoint.
pub const AJAX_ACTION_SEEK_POSTS: &str = "seek_posts";

pub fn canonical_method_name(name: &str) -> Option<&'static str> {
    match name {
        METHOD_SEEK_POSTS | METHOD_SEARCH => Some(METHOD_SEEK_POSTS),
        METHOD_METHODS_LIST => Some(METHOD_METHODS_LIST),
        _ => None,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
pub struct SeekParams {
    /// Single keyword, matched as a case-insensitive substring.
    #[serde(
        default,
        deserialize_with = "deserialize_keyword",
        skip_serializing_if = "Option::is_none"
    )]
    pub keyword: Option<String>,
}

impl SeekParams {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
        }
    }

    pub fn keyword(&self) -> Result<&str, ValidationError> {
        self.keyword
            .as_deref()
            .ok_or(ValidationError::MissingKeyword)
    }
}

fn deserialize_keyword<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(de::Error::custom(ValidationError::KeywordNotString)),
    }
}

/// Form body of the ajax-style endpoint: `action=seek_posts&keyword=...`.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AjaxForm {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
}

/// One row of a search response, in the shape admin tables consume.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SearchResultWire {
    pub title: String,
    pub edit_link: String,
    pub page_id: u64,
    pub page_link: String,
    /// `Content`, `Meta` or `Unknown`.
    pub source: String,
}

impl From<&SearchResult> for SearchResultWire {
    fn from(r: &SearchResult) -> Self {
        Self {
            title: r.title.clone(),
            edit_link: r.edit_url.clone(),
            page_id: r.content_item_id,
            page_link: r.view_url.clone(),
            source: r.source.as_str().to_string(),
        }
    }
}

pub fn encode_results(results: &[SearchResult]) -> Vec<SearchResultWire> {
    results.iter().map(SearchResultWire::from).collect()
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct MethodDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "paramsSchema")]
    pub params_schema: serde_json::Value,
    #[serde(rename = "resultSchema")]
    pub result_schema: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListMethodsResult {
    pub methods: Vec<MethodDefinition>,
}
