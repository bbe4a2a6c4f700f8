// src/util/testing.rs

use anyhow::Result;
use async_trait::async_trait;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::{FavoriteStorage, PoemBackend};
use crate::domain::{BackendHealth, DomainError, NewPoem, PoemDto, PoemFilter, PoemPatch};

/// Build a poem row in one line.
pub fn poem(
    id: i64,
    title: &str,
    author: &str,
    dynasty: &str,
    content: &str,
    appreciation: Option<&str>,
    favorite: bool,
) -> PoemDto {
    PoemDto {
        id,
        title: title.to_string(),
        author: author.to_string(),
        dynasty: dynasty.to_string(),
        content: content.to_string(),
        appreciation: appreciation.map(str::to_string),
        favorite,
        image: None,
    }
}

/// The five Tang poems the sample database ships with; 登鹳雀楼 starts as a favorite.
pub fn tang_poems() -> Vec<PoemDto> {
    vec![
        poem(1, "静夜思", "李白", "唐", "床前明月光，疑是地上霜。举头望明月，低头思故乡。", Some("这是李白的代表作，通过对月光的描写表达了思乡之情。"), false),
        poem(2, "春晓", "孟浩然", "唐", "春眠不觉晓，处处闻啼鸟。夜来风雨声，花落知多少。", Some("描写春天早晨的美景，表现了诗人对大自然的热爱。"), false),
        poem(3, "相思", "王维", "唐", "红豆生南国，春来发几枝。愿君多采撷，此物最相思。", Some("借红豆寄托相思之情，语言朴实而情深意长。"), false),
        poem(4, "登鹳雀楼", "王之涣", "唐", "白日依山尽，黄河入海流。欲穷千里目，更上一层楼。", Some("通过登楼远眺的所见所感，表达了积极向上的人生态度。"), true),
        poem(5, "咏鹅", "骆宾王", "唐", "鹅，鹅，鹅，曲项向天歌。白毛浮绿水，红掌拨清波。", Some("儿童诗的代表作，生动描绘了白鹅的形象。"), false),
    ]
}

#[derive(Default)]
struct BackendState {
    poems: Vec<PoemDto>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-process poem backend for tests.
///
/// Clones share the same rows, so a test can keep a handle and inspect
/// what the code under test wrote.
///
/// # Examples
///
/// ```
/// use poemshelf::util::testing::{tang_poems, InMemoryBackend};
///
/// let backend = InMemoryBackend::builder()
///     .with_poems(tang_poems())
///     .failing_writes()
///     .build();
/// assert!(backend.poem(4).unwrap().favorite);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl InMemoryBackend {
    pub fn builder() -> InMemoryBackendBuilder {
        InMemoryBackendBuilder::new()
    }

    pub fn poem(&self, id: i64) -> Option<PoemDto> {
        self.lock().poems.iter().find(|p| p.id == id).cloned()
    }

    pub fn poem_count(&self) -> usize {
        self.lock().poems.len()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_guard(&self, operation: &str) -> Result<MutexGuard<'_, BackendState>, DomainError> {
        let state = self.lock();
        if state.fail_reads {
            return Err(injected(operation));
        }
        Ok(state)
    }

    fn write_guard(&self, operation: &str) -> Result<MutexGuard<'_, BackendState>, DomainError> {
        let state = self.lock();
        if state.fail_writes {
            return Err(injected(operation));
        }
        Ok(state)
    }
}

fn injected(operation: &str) -> DomainError {
    DomainError::Network {
        operation: operation.to_string(),
        message: "injected failure".to_string(),
    }
}

#[async_trait]
impl PoemBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, filter: &PoemFilter) -> Result<Vec<PoemDto>, DomainError> {
        let state = self.read_guard("list")?;
        let mut poems: Vec<PoemDto> = state
            .poems
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        poems.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(poems)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PoemDto>, DomainError> {
        let state = self.read_guard("get_by_id")?;
        Ok(state.poems.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, poem: &NewPoem) -> Result<PoemDto, DomainError> {
        let mut state = self.write_guard("insert")?;
        let id = state.poems.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let created = PoemDto {
            id,
            title: poem.title.clone(),
            author: poem.author.clone(),
            dynasty: poem.dynasty.clone(),
            content: poem.content.clone(),
            appreciation: poem.appreciation.clone(),
            favorite: poem.favorite,
            image: None,
        };
        state.poems.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, patch: &PoemPatch) -> Result<PoemDto, DomainError> {
        let mut state = self.write_guard("update")?;
        let row = state
            .poems
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(DomainError::PoemNotFound(id))?;
        patch.apply(row);
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let mut state = self.write_guard("delete")?;
        let before = state.poems.len();
        state.poems.retain(|p| p.id != id);
        if state.poems.len() == before {
            return Err(DomainError::PoemNotFound(id));
        }
        Ok(())
    }

    async fn health(&self) -> Result<BackendHealth, DomainError> {
        let state = self.lock();
        Ok(BackendHealth {
            ok: true,
            db: !state.fail_reads,
        })
    }
}

/// Builder for InMemoryBackend
pub struct InMemoryBackendBuilder {
    state: BackendState,
}

impl InMemoryBackendBuilder {
    pub fn new() -> Self {
        Self {
            state: BackendState::default(),
        }
    }

    pub fn with_poem(mut self, poem: PoemDto) -> Self {
        self.state.poems.push(poem);
        self
    }

    pub fn with_poems(mut self, poems: Vec<PoemDto>) -> Self {
        self.state.poems.extend(poems);
        self
    }

    /// Make list and get_by_id fail with a network error
    pub fn failing_reads(mut self) -> Self {
        self.state.fail_reads = true;
        self
    }

    /// Make insert and update fail with a network error
    pub fn failing_writes(mut self) -> Self {
        self.state.fail_writes = true;
        self
    }

    pub fn build(self) -> InMemoryBackend {
        InMemoryBackend {
            state: Arc::new(Mutex::new(self.state)),
        }
    }
}

impl Default for InMemoryBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Favorites storage held in memory; clones share the slot.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    raw: Arc<Mutex<Option<String>>>,
    unavailable: bool,
    saves: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn with_raw(raw: &str) -> Self {
        Self {
            raw: Arc::new(Mutex::new(Some(raw.to_string()))),
            ..Self::default()
        }
    }

    /// Storage whose reads and writes always fail.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl FavoriteStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, DomainError> {
        if self.unavailable {
            return Err(DomainError::Storage("storage unavailable".to_string()));
        }
        Ok(self.raw())
    }

    fn save(&self, raw: &str) -> Result<(), DomainError> {
        if self.unavailable {
            return Err(DomainError::Storage("storage unavailable".to_string()));
        }
        *self.raw.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(raw.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn init_test_setup() -> Result<()> {
    // Set up logging first
    setup_test_logging();

    info!("Test Setup complete");
    Ok(())
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "trace");
    }

    // Create a filter for noisy modules
    let noisy_modules = ["hyper", "reqwest", "mio", "h2", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    // Set up the subscriber with environment filter
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    // Build and set the subscriber
    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}
