// src/application/repository.rs
use crate::application::{FavoriteStorage, FavoritesStore, PoemApi, PoemBackend};
use crate::domain::{dynasty_for_category, DomainError, NewPoem, PoemDto, PoemFilter, PoemRecord};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Merges backend poems with the device-local favorites set.
///
/// Listing operations never fail: a backend error is logged and yields an
/// empty list. Favorite toggles do fail, and only touch the local store once
/// the backend write went through.
pub struct PoemRepository<B: PoemBackend, S: FavoriteStorage> {
    api: PoemApi<B>,
    favorites: FavoritesStore<S>,
}

impl<B: PoemBackend, S: FavoriteStorage> PoemRepository<B, S> {
    pub fn new(api: PoemApi<B>, favorites: FavoritesStore<S>) -> Self {
        Self { api, favorites }
    }

    pub fn api(&self) -> &PoemApi<B> {
        &self.api
    }

    pub fn favorites(&mut self) -> &mut FavoritesStore<S> {
        &mut self.favorites
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_all_poems(&mut self) -> Vec<PoemRecord> {
        self.list_merged(&PoemFilter::All, "get_all_poems").await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_poem_by_id(&mut self, id: i64) -> Result<Option<PoemRecord>, DomainError> {
        let dto = self.api.fetch_poem_by_id(id).await?;
        let local = self.favorites.ids();
        Ok(dto.map(|dto| merge(dto, &local)))
    }

    /// Looks the title up in the full listing.
    ///
    /// Titles are not unique; the first match in listing order (highest id) wins.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_poem_by_title(&mut self, title: &str) -> Option<PoemRecord> {
        self.get_all_poems()
            .await
            .into_iter()
            .find(|poem| poem.title == title)
    }

    /// Resolve `category` as a dynasty, then as an author, then as full text.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_poems_by_category(&mut self, category: &str) -> Vec<PoemRecord> {
        let category = category.trim();

        if let Some(dynasty) = dynasty_for_category(category) {
            debug!(dynasty, "Category resolved to dynasty");
            let filter = PoemFilter::Dynasty(dynasty.to_string());
            return self.list_merged(&filter, "get_poems_by_category").await;
        }

        let by_author = self
            .list_merged(&PoemFilter::Author(category.to_string()), "get_poems_by_category")
            .await;
        if !by_author.is_empty() {
            debug!(count = by_author.len(), "Category resolved to author");
            return by_author;
        }

        debug!("Category falls back to full-text search");
        let filter = PoemFilter::FullText(category.to_string());
        self.list_merged(&filter, "get_poems_by_category").await
    }

    /// Negate the record's merged favorite flag: write it to the backend, then
    /// mirror it locally.
    ///
    /// The target comes from `record.favorite`, not from the backend row, so a
    /// local favorite the server never heard of is cleared by one toggle.
    /// Returns `Ok(None)` for records without an id. The local store is left
    /// untouched when the backend call fails.
    #[instrument(level = "debug", skip(self, record), fields(id = ?record.id, title = %record.title))]
    pub async fn toggle_favorite(
        &mut self,
        record: &PoemRecord,
    ) -> Result<Option<PoemRecord>, DomainError> {
        let Some(id) = record.id else {
            debug!("Record has no id, nothing to toggle");
            return Ok(None);
        };

        let target = !record.favorite;
        let favorite = match self.api.set_poem_favorite(id, target).await {
            Ok(favorite) => favorite,
            Err(e) => {
                warn!(id, error = %e, "Backend toggle failed; local favorites unchanged");
                return Err(e);
            }
        };

        self.favorites.set(id, favorite);
        info!(id, favorite, "Favorite state synchronized");

        Ok(Some(PoemRecord {
            favorite,
            ..record.clone()
        }))
    }

    #[instrument(level = "debug", skip(self, poem), fields(title = %poem.title))]
    pub async fn create_poem(&mut self, poem: &NewPoem) -> Result<PoemRecord, DomainError> {
        let created = self.api.create_poem(poem).await?;
        let local = self.favorites.ids();
        Ok(merge(created, &local))
    }

    pub async fn import_poems(&mut self, poems: &[NewPoem]) -> Vec<PoemRecord> {
        let created = self.api.create_poems(poems).await;
        let local = self.favorites.ids();
        created.into_iter().map(|dto| merge(dto, &local)).collect()
    }

    pub fn favorite_ids(&mut self) -> BTreeSet<i64> {
        self.favorites.ids()
    }

    /// Delete on the backend first; the local entry goes only once that succeeded.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_poem(&mut self, id: i64) -> Result<(), DomainError> {
        self.api.delete_poem(id).await?;
        self.favorites.remove(id);
        Ok(())
    }

    pub fn clear_favorites(&mut self) {
        self.favorites.clear();
    }

    async fn list_merged(&mut self, filter: &PoemFilter, operation: &str) -> Vec<PoemRecord> {
        let poems = match self.api.fetch_filtered(filter).await {
            Ok(poems) => poems,
            Err(e) => {
                warn!(operation, ?filter, error = %e, "Listing failed, returning no poems");
                return Vec::new();
            }
        };
        let local = self.favorites.ids();
        poems.into_iter().map(|dto| merge(dto, &local)).collect()
    }
}

fn merge(dto: PoemDto, local: &BTreeSet<i64>) -> PoemRecord {
    let locally_favorite = local.contains(&dto.id);
    PoemRecord::merge(dto, locally_favorite)
}
