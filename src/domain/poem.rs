// src/domain/poem.rs
use serde::{Deserialize, Deserializer, Serialize};

/// Poem row as it comes off the wire.
///
/// The custom backend stores `favorite` as `TINYINT(1)` and answers with
/// `0`/`1`; PostgREST answers with booleans. Both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoemDto {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub dynasty: String,
    pub content: String,
    #[serde(default)]
    pub appreciation: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Insert payload; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPoem {
    pub title: String,
    pub author: String,
    pub dynasty: String,
    pub content: String,
    #[serde(default)]
    pub appreciation: Option<String>,
    #[serde(default)]
    pub favorite: bool,
}

/// Partial update; only fields that are set go on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynasty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appreciation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

impl PoemPatch {
    pub fn favorite(flag: bool) -> Self {
        Self {
            favorite: Some(flag),
            ..Self::default()
        }
    }

    pub fn apply(&self, dto: &mut PoemDto) {
        if let Some(title) = &self.title {
            dto.title = title.clone();
        }
        if let Some(author) = &self.author {
            dto.author = author.clone();
        }
        if let Some(dynasty) = &self.dynasty {
            dto.dynasty = dynasty.clone();
        }
        if let Some(content) = &self.content {
            dto.content = content.clone();
        }
        if let Some(appreciation) = &self.appreciation {
            dto.appreciation = Some(appreciation.clone());
        }
        if let Some(favorite) = self.favorite {
            dto.favorite = favorite;
        }
    }
}

/// Client-side view of a poem: backend data plus the local favorite override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoemRecord {
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub dynasty: String,
    pub content: String,
    pub appreciation: Option<String>,
    pub favorite: bool,
    pub image: Option<String>,
}

impl PoemRecord {
    /// Local favorites win: a stale `false` from the server never clears them.
    pub fn merge(dto: PoemDto, locally_favorite: bool) -> Self {
        Self {
            id: Some(dto.id),
            title: dto.title,
            author: dto.author,
            dynasty: dto.dynasty,
            content: dto.content,
            appreciation: dto.appreciation,
            favorite: locally_favorite || dto.favorite,
            image: dto.image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub ok: bool,
    pub db: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Text(String),
}

pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<FlagRepr>::deserialize(deserializer)?;
    Ok(match repr {
        None => false,
        Some(FlagRepr::Bool(flag)) => flag,
        Some(FlagRepr::Int(n)) => n != 0,
        Some(FlagRepr::Text(s)) => matches!(s.trim(), "1" | "true" | "t"),
    })
}
