//! File-system friendly names for exported records

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex pattern"));
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("Invalid regex pattern"));
static REPEATED_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-{2,}").expect("Invalid regex pattern"));

/// Lowercase ASCII slug: whitespace becomes `-`, anything outside
/// `[a-z0-9_-]` is dropped, dashes are collapsed and trimmed.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let dashed = WHITESPACE.replace_all(&lower, "-");
    let word_only = NON_WORD.replace_all(&dashed, "");
    let collapsed = REPEATED_DASH.replace_all(&word_only, "-");
    collapsed.trim_matches('-').to_string()
}

/// Directory name for a record: `<slug>-<gid>`, or just the gid when the
/// name has no usable characters. The gid keeps colliding slugs apart.
pub fn record_dir_name(name: &str, gid: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        gid.to_string()
    } else {
        format!("{slug}-{gid}")
    }
}

/// Make an attachment name safe to use as a single path component
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}
