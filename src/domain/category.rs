// src/domain/category.rs
use crate::domain::PoemDto;
use crate::util::text::contains_folded;

/// Dynasty names recognised as categories, longest first so that
/// "近现代" is tried before "现代".
const KNOWN_DYNASTIES: &[&str] = &[
    "近现代", "南北朝", "先秦", "魏晋", "五代", "现代", "当代", "秦", "汉", "隋", "唐", "宋",
    "元", "明", "清",
];

/// Genre and era suffixes that may trail a dynasty name: 唐诗, 宋词, 元曲, 唐代, 清朝.
const CATEGORY_SUFFIXES: &[char] = &['诗', '词', '曲', '代', '朝'];

/// Row filter understood by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoemFilter {
    All,
    /// Dynasty contains the stem, case-insensitive.
    Dynasty(String),
    /// Author equals the name exactly.
    Author(String),
    /// Content or appreciation contains the text, case-insensitive.
    FullText(String),
}

impl PoemFilter {
    pub fn matches(&self, poem: &PoemDto) -> bool {
        match self {
            PoemFilter::All => true,
            PoemFilter::Dynasty(stem) => contains_folded(&poem.dynasty, stem),
            PoemFilter::Author(name) => poem.author == *name,
            PoemFilter::FullText(text) => {
                contains_folded(&poem.content, text)
                    || poem
                        .appreciation
                        .as_deref()
                        .is_some_and(|a| contains_folded(a, text))
            }
        }
    }
}

/// Resolve a free-text category to a dynasty stem.
///
/// Accepts the bare name (`唐`) or the name with one genre/era suffix (`唐诗`, `宋词`).
pub fn dynasty_for_category(category: &str) -> Option<&'static str> {
    let category = category.trim();
    if category.is_empty() {
        return None;
    }
    if let Some(found) = KNOWN_DYNASTIES.iter().find(|d| **d == category) {
        return Some(*found);
    }
    let stem = category.strip_suffix(CATEGORY_SUFFIXES)?;
    KNOWN_DYNASTIES.iter().find(|d| **d == stem).copied()
}
