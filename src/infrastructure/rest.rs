// src/infrastructure/rest.rs
use crate::application::PoemBackend;
use crate::domain::{BackendHealth, DomainError, NewPoem, PoemDto, PoemFilter, PoemPatch};
use crate::infrastructure::http::HttpClient;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

/// `{code, data, message}` envelope used by the custom backend; `code == 0` is success.
#[derive(Debug, Deserialize)]
pub struct ApiResult<T> {
    pub code: i64,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResult<T> {
    fn into_data(self, operation: &str) -> Result<T, DomainError> {
        if self.code != 0 {
            return Err(DomainError::backend(
                operation,
                None,
                self.message.unwrap_or_else(|| format!("code {}", self.code)),
            ));
        }
        self.data
            .ok_or_else(|| DomainError::backend(operation, None, "response has no data"))
    }
}

#[derive(Debug, Deserialize)]
struct FavoriteToggled {
    #[serde(deserialize_with = "crate::domain::poem::deserialize_flag")]
    favorite: bool,
}

/// Adapter for the custom `/api/poems` REST service.
///
/// The service has no query language, so filters are applied to the full
/// listing on this side.
#[derive(Clone, Debug)]
pub struct RestBackend {
    http: HttpClient,
}

impl RestBackend {
    /// `http` must be rooted at the API prefix, e.g. `http://localhost:3001/api`.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, DomainError> {
        self.http
            .send_json::<ApiResult<T>>(operation, request)
            .await?
            .into_data(operation)
    }
}

#[async_trait]
impl PoemBackend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    #[instrument(level = "debug", skip(self))]
    async fn list(&self, filter: &PoemFilter) -> Result<Vec<PoemDto>, DomainError> {
        let request = self.http.request(Method::GET, "poems");
        let mut poems: Vec<PoemDto> = self.call("fetch_poems", request).await?;
        poems.retain(|p| filter.matches(p));
        debug!(count = poems.len(), "Listed poems");
        Ok(poems)
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_by_id(&self, id: i64) -> Result<Option<PoemDto>, DomainError> {
        let request = self.http.request(Method::GET, &format!("poems/{id}"));
        match self
            .http
            .send_optional_json::<ApiResult<PoemDto>>("fetch_poem_by_id", request)
            .await?
        {
            Some(envelope) => envelope.into_data("fetch_poem_by_id").map(Some),
            None => Ok(None),
        }
    }

    #[instrument(level = "debug", skip(self, poem), fields(title = %poem.title))]
    async fn insert(&self, poem: &NewPoem) -> Result<PoemDto, DomainError> {
        let request = self.http.request(Method::POST, "poems").json(poem);
        self.call("create_poem", request).await
    }

    #[instrument(level = "debug", skip(self, patch))]
    async fn update(&self, id: i64, patch: &PoemPatch) -> Result<PoemDto, DomainError> {
        let request = self
            .http
            .request(Method::PATCH, &format!("poems/{id}"))
            .json(patch);
        match self
            .http
            .send_optional_json::<ApiResult<PoemDto>>("update_poem", request)
            .await?
        {
            Some(envelope) => envelope.into_data("update_poem"),
            None => Err(DomainError::PoemNotFound(id)),
        }
    }

    /// The service flips the flag itself in one request.
    #[instrument(level = "debug", skip(self))]
    async fn toggle_favorite(&self, id: i64) -> Result<bool, DomainError> {
        let request = self
            .http
            .request(Method::POST, &format!("poems/{id}/favorite"));
        match self
            .http
            .send_optional_json::<ApiResult<FavoriteToggled>>("toggle_poem_favorite", request)
            .await?
        {
            Some(envelope) => Ok(envelope.into_data("toggle_poem_favorite")?.favorite),
            None => Err(DomainError::PoemNotFound(id)),
        }
    }

    /// Goes through the toggle endpoint, flipping a second time when the row
    /// already held `favorite`.
    #[instrument(level = "debug", skip(self))]
    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<bool, DomainError> {
        let flipped = self.toggle_favorite(id).await?;
        if flipped == favorite {
            return Ok(flipped);
        }
        debug!(id, favorite, "Row already held the flag, toggling back");
        self.toggle_favorite(id).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let request = self.http.request(Method::DELETE, &format!("poems/{id}"));
        match self
            .http
            .send_optional_json::<ApiResult<serde_json::Value>>("delete_poem", request)
            .await?
        {
            Some(envelope) if envelope.code == 0 => Ok(()),
            Some(envelope) => envelope.into_data("delete_poem").map(|_| ()),
            None => Err(DomainError::PoemNotFound(id)),
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn health(&self) -> Result<BackendHealth, DomainError> {
        let request = self.http.request(Method::GET, "health");
        self.http.send_json("health", request).await
    }
}
