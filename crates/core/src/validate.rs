use crate::errors::ValidationError;
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_CONTENT_TYPES: &[&str] = &["post", "page", "custom_post_type"];

pub const DEFAULT_MAX_KEYWORD_CHARS: usize = 200;

pub fn is_valid_content_type(t: &str) -> bool {
    !t.is_empty()
        && t
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Lowercases, trims and dedupes a list of content types. Falls back to the
/// defaults when nothing is given.
pub fn normalize_content_types(types: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::new();
    for raw in types {
        let t = raw.trim().to_lowercase();
        if !is_valid_content_type(&t) {
            return Err(ValidationError::InvalidContentType(raw.clone()));
        }
        if !out.contains(&t) {
            out.push(t);
        }
    }
    if out.is_empty() {
        out = DEFAULT_CONTENT_TYPES.iter().map(|t| (*t).to_owned()).collect();
    }
    Ok(out)
}

/// Strip control characters, trim, and cap to `max_chars` characters.
/// Tabs and line breaks become a single space; every other control or
/// format character is removed. An empty return value means "no keyword".
pub fn sanitize_keyword(raw: &str, max_chars: usize) -> String {
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    static CONTROL: OnceLock<Regex> = OnceLock::new();
    let breaks = BREAKS.get_or_init(|| Regex::new(r"[\t\r\n]+").expect("valid regex"));
    let control = CONTROL.get_or_init(|| Regex::new(r"[\p{Cc}\p{Cf}]+").expect("valid regex"));
    let spaced = breaks.replace_all(raw, " ");
    let cleaned = control.replace_all(&spaced, "");
    let capped: String = cleaned.trim().chars().take(max_chars).collect();
    capped.trim_end().to_string()
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
