// src/application/backend.rs
use crate::domain::{BackendHealth, DomainError, NewPoem, PoemDto, PoemFilter, PoemPatch};
use async_trait::async_trait;
use tracing::debug;

/// Storage port for poem rows.
///
/// `list` must return rows ordered by id descending.
#[async_trait]
pub trait PoemBackend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn list(&self, filter: &PoemFilter) -> Result<Vec<PoemDto>, DomainError>;

    /// `Ok(None)` when no row has this id.
    async fn get_by_id(&self, id: i64) -> Result<Option<PoemDto>, DomainError>;

    async fn insert(&self, poem: &NewPoem) -> Result<PoemDto, DomainError>;

    async fn update(&self, id: i64, patch: &PoemPatch) -> Result<PoemDto, DomainError>;

    /// Flip the stored favorite flag and return the new value.
    ///
    /// Read-modify-write without concurrency control: two clients toggling
    /// at once race and the last write wins.
    async fn toggle_favorite(&self, id: i64) -> Result<bool, DomainError> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or(DomainError::PoemNotFound(id))?;
        let next = !current.favorite;
        debug!(backend = self.name(), id, next, "Writing negated favorite flag");
        let updated = self.update(id, &PoemPatch::favorite(next)).await?;
        Ok(updated.favorite)
    }

    /// Store `favorite` as the flag and return what the backend now holds.
    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<bool, DomainError> {
        let updated = self.update(id, &PoemPatch::favorite(favorite)).await?;
        Ok(updated.favorite)
    }

    /// `PoemNotFound` when no row has this id.
    async fn delete(&self, id: i64) -> Result<(), DomainError>;

    async fn health(&self) -> Result<BackendHealth, DomainError>;
}

#[async_trait]
impl<B: PoemBackend + ?Sized> PoemBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn list(&self, filter: &PoemFilter) -> Result<Vec<PoemDto>, DomainError> {
        (**self).list(filter).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PoemDto>, DomainError> {
        (**self).get_by_id(id).await
    }

    async fn insert(&self, poem: &NewPoem) -> Result<PoemDto, DomainError> {
        (**self).insert(poem).await
    }

    async fn update(&self, id: i64, patch: &PoemPatch) -> Result<PoemDto, DomainError> {
        (**self).update(id, patch).await
    }

    async fn toggle_favorite(&self, id: i64) -> Result<bool, DomainError> {
        (**self).toggle_favorite(id).await
    }

    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<bool, DomainError> {
        (**self).set_favorite(id, favorite).await
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        (**self).delete(id).await
    }

    async fn health(&self) -> Result<BackendHealth, DomainError> {
        (**self).health().await
    }
}
