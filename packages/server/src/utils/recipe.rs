//! Pure text helpers for generated recipes: classification, envelope and title
//! extraction, and the download link that travels with a recipe.

use std::sync::LazyLock;

use regex::Regex;

/// Phrases that mark a model response as a refusal or a request for clarification.
const REFUSAL_MARKERS: &[&str] = &[
    "i cannot",
    "i'm sorry",
    "unable to",
    "clarify",
    "illegal",
    "inappropriate",
];

pub const DEFAULT_TITLE: &str = "Untitled Recipe";

/// Separator placed between a recipe and its download link.
pub const DOWNLOAD_PREFIX: &str = "\n\nYou can download this recipe here: ";

const DOWNLOAD_LABEL: &str = "[Download recipe]";

static RECIPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?si)^###\s+.+?(?:\r\n|\n|\r)+####\s+Ingredients:.*?####\s+Instructions:")
        .expect("recipe pattern is a valid regex")
});

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^###([^#\r\n][^\r\n]*)$").expect("title pattern is a valid regex")
});

/// Whether any refusal marker occurs in `text`, ignoring case.
pub fn contains_refusal(text: &str) -> bool {
    let lower = text.to_lowercase();
    REFUSAL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Decide whether `text` is a recipe worth offering for download.
pub fn looks_like_recipe(text: &str) -> bool {
    if text.trim().is_empty() || contains_refusal(text) {
        return false;
    }

    if RECIPE_PATTERN.is_match(text) {
        return true;
    }

    let lower = text.to_lowercase();
    text.trim_start().starts_with("###")
        && lower.contains("ingredients")
        && lower.contains("instructions")
}

/// The substring from the first `{` to the last `}`, or `raw` unchanged.
pub fn extract_json_envelope(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => raw,
    }
}

/// Text of the first `###` heading, or [`DEFAULT_TITLE`].
pub fn extract_title(markdown: &str) -> String {
    TITLE_PATTERN
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

/// Markdown link to the public download endpoint of a stored recipe.
pub fn download_reference(public_base_url: &str, recipe_file_id: i32) -> String {
    format!(
        "{DOWNLOAD_LABEL}({}/api/v1/recipes/download/{recipe_file_id})",
        public_base_url.trim_end_matches('/')
    )
}

/// Recipe text followed by its download link.
pub fn with_download(markdown: &str, reference: &str) -> String {
    format!("{markdown}{DOWNLOAD_PREFIX}{reference}")
}

/// Remove a trailing download link appended by [`with_download`] or a bare
/// trailing `[Download recipe](...)` link.
pub fn strip_download_suffix(text: &str) -> &str {
    if let Some(idx) = text.rfind(DOWNLOAD_PREFIX) {
        return &text[..idx];
    }

    if let Some(idx) = text.rfind(DOWNLOAD_LABEL) {
        let tail = text[idx..].trim_end();
        if tail.ends_with(')') && !tail.contains('\n') {
            return text[..idx].trim_end();
        }
    }

    text
}
