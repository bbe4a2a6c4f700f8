// src/application/poem_api.rs
use crate::application::PoemBackend;
use crate::domain::{DomainError, NewPoem, PoemDto, PoemFilter};
use tracing::{debug, info, instrument, warn};

/// Thin layer over a [`PoemBackend`] that the repository talks to.
///
/// Errors are propagated; deciding whether to degrade is the caller's job.
pub struct PoemApi<B: PoemBackend> {
    backend: B,
}

impl<B: PoemBackend> PoemApi<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn fetch_poems(&self) -> Result<Vec<PoemDto>, DomainError> {
        self.fetch_filtered(&PoemFilter::All).await
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn fetch_filtered(&self, filter: &PoemFilter) -> Result<Vec<PoemDto>, DomainError> {
        let poems = self.backend.list(filter).await?;
        debug!(count = poems.len(), "Fetched poems");
        Ok(poems)
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn fetch_poem_by_id(&self, id: i64) -> Result<Option<PoemDto>, DomainError> {
        self.backend.get_by_id(id).await
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn toggle_poem_favorite(&self, id: i64) -> Result<bool, DomainError> {
        let favorite = self.backend.toggle_favorite(id).await?;
        info!(id, favorite, "Toggled favorite on backend");
        Ok(favorite)
    }

    /// Write an explicit flag rather than flipping whatever the backend holds.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn set_poem_favorite(&self, id: i64, favorite: bool) -> Result<bool, DomainError> {
        let stored = self.backend.set_favorite(id, favorite).await?;
        info!(id, favorite = stored, "Set favorite on backend");
        Ok(stored)
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn delete_poem(&self, id: i64) -> Result<(), DomainError> {
        self.backend.delete(id).await?;
        info!(id, "Deleted poem");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, poem), fields(backend = self.backend.name(), title = %poem.title))]
    pub async fn create_poem(&self, poem: &NewPoem) -> Result<PoemDto, DomainError> {
        let created = self.backend.insert(poem).await?;
        info!(id = created.id, title = %created.title, "Created poem");
        Ok(created)
    }

    /// Insert one row at a time; rows that fail are logged and skipped.
    pub async fn create_poems(&self, poems: &[NewPoem]) -> Vec<PoemDto> {
        let mut inserted = Vec::with_capacity(poems.len());
        for poem in poems {
            match self.backend.insert(poem).await {
                Ok(created) => inserted.push(created),
                Err(e) => warn!(title = %poem.title, error = %e, "Skipping poem that failed to insert"),
            }
        }
        info!(
            requested = poems.len(),
            inserted = inserted.len(),
            "Bulk insert finished"
        );
        inserted
    }
}
