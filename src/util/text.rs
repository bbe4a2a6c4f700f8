// src/util/text.rs

/// Ellipsis appended to shortened previews.
pub const ELLIPSIS: char = '…';

/// Shorten `text` to at most `max_chars` characters, appending an ellipsis when cut.
///
/// Counts characters rather than bytes so CJK text is never split mid-codepoint.
///
/// # Examples
///
/// ```
/// use poemshelf::util::text::preview;
///
/// assert_eq!(preview("床前明月光，疑是地上霜。", 5), "床前明月光…");
/// assert_eq!(preview("春晓", 5), "春晓");
/// ```
pub fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}

/// Case-insensitive substring test, the client-side equivalent of `ilike '%needle%'`.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
