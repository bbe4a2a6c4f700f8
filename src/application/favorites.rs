// src/application/favorites.rs
use crate::domain::DomainError;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Storage key the favorites set is persisted under.
pub const FAVORITES_KEY: &str = "poem_app_favorites";

/// Durable slot holding the serialized favorites set.
pub trait FavoriteStorage {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<String>, DomainError>;

    fn save(&self, raw: &str) -> Result<(), DomainError>;
}

/// Device-local set of favorite poem ids.
///
/// Loaded lazily on first access; every mutation writes the whole set back.
pub struct FavoritesStore<S: FavoriteStorage> {
    storage: S,
    ids: Option<BTreeSet<i64>>,
}

impl<S: FavoriteStorage> FavoritesStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage, ids: None }
    }

    pub fn has(&mut self, id: i64) -> bool {
        self.loaded().contains(&id)
    }

    pub fn add(&mut self, id: i64) {
        if self.loaded().insert(id) {
            self.persist();
        }
    }

    pub fn remove(&mut self, id: i64) {
        if self.loaded().remove(&id) {
            self.persist();
        }
    }

    /// Returns whether `id` is a favorite afterwards.
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.has(id) {
            self.remove(id);
            false
        } else {
            self.add(id);
            true
        }
    }

    /// Make membership of `id` equal `favorite`.
    pub fn set(&mut self, id: i64, favorite: bool) {
        if favorite {
            self.add(id);
        } else {
            self.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.loaded().clear();
        self.persist();
    }

    pub fn ids(&mut self) -> BTreeSet<i64> {
        self.loaded().clone()
    }

    /// Drop the cached set so the next access reads storage again.
    pub fn reload(&mut self) {
        self.ids = None;
    }

    fn loaded(&mut self) -> &mut BTreeSet<i64> {
        let storage = &self.storage;
        self.ids.get_or_insert_with(|| load_ids(storage))
    }

    fn persist(&mut self) {
        let ids: Vec<i64> = self.loaded().iter().copied().collect();
        let result = serde_json::to_string(&ids)
            .map_err(|e| DomainError::Storage(e.to_string()))
            .and_then(|raw| self.storage.save(&raw));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist favorites; keeping in-memory state");
        }
    }
}

fn load_ids<S: FavoriteStorage>(storage: &S) -> BTreeSet<i64> {
    match storage.load() {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<i64>>(&raw) {
            Ok(ids) => {
                debug!(count = ids.len(), "Loaded favorites");
                ids.into_iter().collect()
            }
            Err(e) => {
                debug!(error = %e, "Favorites storage is corrupt, starting empty");
                BTreeSet::new()
            }
        },
        Ok(None) => BTreeSet::new(),
        Err(e) => {
            warn!(error = %e, "Favorites storage unavailable, starting empty");
            BTreeSet::new()
        }
    }
}
