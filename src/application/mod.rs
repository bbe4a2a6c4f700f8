// src/application/mod.rs
pub mod backend;
pub mod favorites;
pub mod poem_api;
pub mod repository;

pub use backend::PoemBackend;
pub use favorites::{FavoriteStorage, FavoritesStore, FAVORITES_KEY};
pub use poem_api::PoemApi;
pub use repository::PoemRepository;
