// src/infrastructure/mod.rs
pub mod config;
pub mod favorites_file;
pub mod fetch;
pub mod http;
pub mod rest;
pub mod supabase;

pub use config::{BackendKind, Config};
pub use favorites_file::JsonFileStorage;
pub use fetch::LatestRequest;
pub use http::HttpClient;
pub use rest::RestBackend;
pub use supabase::SupabaseBackend;
