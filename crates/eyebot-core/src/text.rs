//! Plain-text helpers for feed content headed to a Telegram reply.

use std::sync::LazyLock;

use regex::Regex;

/// Default length cap for a summary reply, in characters.
pub const SUMMARY_LIMIT: usize = 600;

/// Any HTML tag, including ones spanning lines.
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid HTML tag regex"));

/// Decimal or hex numeric character reference.
static NUMERIC_ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("Invalid numeric entity regex")
});

/// Removes HTML tags and decodes the common entities.
///
/// Tags become a space so that `a<br>b` does not glue words together;
/// run the result through [`clean_text`] to collapse the gaps.
pub fn strip_html(html: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(html, " ");

    let decoded = NUMERIC_ENTITY_REGEX.replace_all(&without_tags, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapses runs of whitespace and truncates to `limit` characters.
pub fn clean_text(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, limit).to_string()
}

/// Returns at most the first `limit` characters of `s`.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
