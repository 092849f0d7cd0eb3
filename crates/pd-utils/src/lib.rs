//! Shared helpers and error types for pathed.

use thiserror::Error;

/// Result type for shared helpers.
pub type UtilsResult<T> = Result<T, UtilsError>;

/// Shared error variants for cross-crate helpers.
#[derive(Debug, Error)]
pub enum UtilsError {
    /// A parsing error occurred.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Separator the host uses between PATH entries.
pub const fn default_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

/// Parse a single-character separator argument.
pub fn parse_separator(value: &str) -> UtilsResult<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_alphanumeric() && !c.is_whitespace() => Ok(c),
        _ => Err(UtilsError::Parse(format!(
            "separator must be a single punctuation character, got {value:?}"
        ))),
    }
}

/// Duplicate key for case-sensitive hosts: paths compare exactly, trailing
/// separators included.
pub fn normalize_exact(path: &str) -> String {
    path.to_string()
}

/// Duplicate key for case-insensitive hosts: trailing separators are dropped
/// (keeping a drive root such as `C:\`) and the result is lowercased.
pub fn normalize_folded(path: &str) -> String {
    let mut trimmed = path;
    while trimmed.chars().count() > 3 && trimmed.ends_with(['\\', '/']) {
        trimmed = &trimmed[..trimmed.len() - 1];
    }
    trimmed.to_lowercase()
}

/// Number of display columns used by `text`, counted in chars.
pub fn text_width(text: &str) -> usize {
    text.chars().count()
}

/// Chars of `text` starting at column `skip`, at most `width` long.
pub fn clip_columns(text: &str, skip: usize, width: usize) -> String {
    text.chars().skip(skip).take(width).collect()
}

/// Shorten `text` to `width` columns, ending in `...` when cut.
pub fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    if text_width(text) <= width {
        return text.to_string();
    }
    if width <= 3 {
        return ".".repeat(width);
    }
    let mut out = clip_columns(text, 0, width - 3);
    out.push_str("...");
    out
}
