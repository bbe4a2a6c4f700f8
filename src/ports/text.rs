// src/ports/text.rs
use crate::domain::PoemRecord;
use crate::util::text::preview;
use tracing::instrument;

const FAVORITE_MARK: char = '★';
const PLAIN_MARK: char = '☆';

/// Renders poems for the terminal.
#[derive(Debug, Clone)]
pub struct PoemPresenter {
    preview_chars: usize,
}

impl PoemPresenter {
    pub fn new() -> Self {
        Self { preview_chars: 30 }
    }

    pub fn with_preview_chars(preview_chars: usize) -> Self {
        Self { preview_chars }
    }

    /// One line per poem: mark, id, title, author, dynasty and a content preview.
    #[instrument(level = "trace", skip(self, poems), fields(count = poems.len()))]
    pub fn render_list(&self, poems: &[PoemRecord]) -> String {
        if poems.is_empty() {
            return "No poems found.\n".to_string();
        }
        poems
            .iter()
            .map(|poem| {
                format!(
                    "{} {:>4}  {} · {} ({})  {}\n",
                    mark(poem),
                    poem.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                    poem.title,
                    poem.author,
                    poem.dynasty,
                    preview(&poem.content, self.preview_chars)
                )
            })
            .collect()
    }

    pub fn render_detail(&self, poem: &PoemRecord) -> String {
        let mut out = format!(
            "{} {}\n{} · {}\n\n{}\n",
            mark(poem),
            poem.title,
            poem.dynasty,
            poem.author,
            poem.content.trim()
        );
        if let Some(appreciation) = poem.appreciation.as_deref().filter(|a| !a.trim().is_empty()) {
            out.push_str("\n赏析: ");
            out.push_str(appreciation.trim());
            out.push('\n');
        }
        if let Some(image) = poem.image.as_deref().filter(|i| !i.is_empty()) {
            out.push_str(&format!("\nimage: {image}\n"));
        }
        out
    }
}

impl Default for PoemPresenter {
    fn default() -> Self {
        Self::new()
    }
}

fn mark(poem: &PoemRecord) -> char {
    if poem.favorite {
        FAVORITE_MARK
    } else {
        PLAIN_MARK
    }
}
