// src/domain/mod.rs
pub mod category;
pub mod error;
pub mod poem;

pub use category::{dynasty_for_category, PoemFilter};
pub use error::DomainError;
pub use poem::{BackendHealth, NewPoem, PoemDto, PoemPatch, PoemRecord};
