// src/infrastructure/supabase.rs
use crate::application::PoemBackend;
use crate::domain::{BackendHealth, DomainError, NewPoem, PoemDto, PoemFilter, PoemPatch};
use crate::infrastructure::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_TABLE: &str = "poems";

/// Characters with meaning inside a PostgREST filter value.
const RESERVED: &[char] = &[',', '(', ')', '"', '\\', ':'];

/// Reject anything that is not a plain SQL identifier before it reaches a URL.
pub fn validate_identifier(name: &str) -> Result<(), DomainError> {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let re = IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));
    if re.is_match(name) {
        Ok(())
    } else {
        Err(DomainError::InvalidIdentifier(name.to_string()))
    }
}

/// Quote a filter value when it contains PostgREST delimiters.
fn filter_value(value: &str) -> String {
    if value.contains(RESERVED) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// `ilike` pattern matching `text` anywhere, with LIKE wildcards in `text` taken literally.
fn contains_pattern(text: &str) -> String {
    let literal = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    filter_value(&format!("*{literal}*"))
}

/// Query-string pairs for a filter, without `select`/`order`.
pub fn filter_params(filter: &PoemFilter) -> Vec<(String, String)> {
    match filter {
        PoemFilter::All => Vec::new(),
        PoemFilter::Dynasty(stem) => vec![(
            "dynasty".to_string(),
            format!("ilike.{}", contains_pattern(stem)),
        )],
        PoemFilter::Author(name) => {
            vec![("author".to_string(), format!("eq.{}", filter_value(name)))]
        }
        PoemFilter::FullText(text) => {
            let pattern = contains_pattern(text);
            vec![(
                "or".to_string(),
                format!("(content.ilike.{pattern},appreciation.ilike.{pattern})"),
            )]
        }
    }
}

/// Adapter for a Supabase-hosted table reached through PostgREST.
#[derive(Clone, Debug)]
pub struct SupabaseBackend {
    http: HttpClient,
    table: String,
}

impl SupabaseBackend {
    /// `url` is the project URL; requests go to `<url>/rest/v1/<table>`.
    pub fn new(url: &str, key: &str, table: &str, timeout: Duration) -> Result<Self, DomainError> {
        validate_identifier(table)?;

        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(key)
            .map_err(|_| DomainError::InvalidIdentifier("supabase key".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| DomainError::InvalidIdentifier("supabase key".to_string()))?;
        headers.insert(HeaderName::from_static("apikey"), key_value);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );

        let base = format!("{}/rest/v1", url.trim_end_matches('/'));
        let http = HttpClient::with_headers(&base, timeout, headers)?;
        Ok(Self {
            http,
            table: table.to_string(),
        })
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn first_row(
        &self,
        operation: &str,
        rows: Vec<PoemDto>,
    ) -> Result<PoemDto, DomainError> {
        rows.into_iter().next().ok_or_else(|| {
            DomainError::backend(operation, None, format!("no row returned from {}", self.table))
        })
    }
}

#[async_trait]
impl PoemBackend for SupabaseBackend {
    fn name(&self) -> &'static str {
        "supabase"
    }

    #[instrument(level = "debug", skip(self), fields(table = %self.table))]
    async fn list(&self, filter: &PoemFilter) -> Result<Vec<PoemDto>, DomainError> {
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "id.desc".to_string()),
        ];
        params.extend(filter_params(filter));
        let request = self.http.request(Method::GET, &self.table).query(&params);
        let poems: Vec<PoemDto> = self.http.send_json("fetch_poems", request).await?;
        debug!(count = poems.len(), "Listed poems");
        Ok(poems)
    }

    #[instrument(level = "debug", skip(self), fields(table = %self.table))]
    async fn get_by_id(&self, id: i64) -> Result<Option<PoemDto>, DomainError> {
        let request = self
            .http
            .request(Method::GET, &self.table)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        let rows: Vec<PoemDto> = self.http.send_json("fetch_poem_by_id", request).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(level = "debug", skip(self, poem), fields(table = %self.table, title = %poem.title))]
    async fn insert(&self, poem: &NewPoem) -> Result<PoemDto, DomainError> {
        let request = self
            .http
            .request(Method::POST, &self.table)
            .query(&[("select", "*")])
            .json(poem);
        let rows: Vec<PoemDto> = self.http.send_json("create_poem", request).await?;
        self.first_row("create_poem", rows)
    }

    #[instrument(level = "debug", skip(self, patch), fields(table = %self.table))]
    async fn update(&self, id: i64, patch: &PoemPatch) -> Result<PoemDto, DomainError> {
        let request = self
            .http
            .request(Method::PATCH, &self.table)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .json(patch);
        let rows: Vec<PoemDto> = self.http.send_json("update_poem", request).await?;
        rows.into_iter().next().ok_or(DomainError::PoemNotFound(id))
    }

    #[instrument(level = "debug", skip(self), fields(table = %self.table))]
    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let request = self
            .http
            .request(Method::DELETE, &self.table)
            .query(&[("select", "id".to_string()), ("id", format!("eq.{id}"))]);
        let rows: Vec<serde_json::Value> = self.http.send_json("delete_poem", request).await?;
        if rows.is_empty() {
            return Err(DomainError::PoemNotFound(id));
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self), fields(table = %self.table))]
    async fn health(&self) -> Result<BackendHealth, DomainError> {
        let request = self
            .http
            .request(Method::GET, &self.table)
            .query(&[("select", "id"), ("limit", "1")]);
        let _: Vec<serde_json::Value> = self.http.send_json("health", request).await?;
        Ok(BackendHealth { ok: true, db: true })
    }
}
