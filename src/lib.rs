// src/lib.rs
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod util;

use anyhow::{bail, Context, Result};
use application::{FavoriteStorage, FavoritesStore, PoemApi, PoemBackend, PoemRepository};
use domain::NewPoem;
use infrastructure::{BackendKind, Config, HttpClient, JsonFileStorage, RestBackend, SupabaseBackend};
use ports::PoemPresenter;
use tracing::{debug, info};
use crate::cli::args::{Args, Command};

pub async fn run(args: Args) -> Result<()> {
    debug!(?args, "Starting poemshelf with arguments");

    // Initialize infrastructure
    let config = load_config(&args)?;
    let backend = build_backend(&config)?;
    let favorites_dir = config.favorites_dir()?;
    debug!(?favorites_dir, "Using favorites directory");

    // Initialize application
    let mut repository = PoemRepository::new(
        PoemApi::new(backend),
        FavoritesStore::new(JsonFileStorage::in_dir(favorites_dir)),
    );

    // Initialize presentation
    let presenter = PoemPresenter::new();

    // Execute use case
    let output = execute(&mut repository, &presenter, args.command).await?;
    print!("{output}");
    Ok(())
}

/// Run one command against an assembled repository and return what to print.
pub async fn execute<B, S>(
    repository: &mut PoemRepository<B, S>,
    presenter: &PoemPresenter,
    command: Command,
) -> Result<String>
where
    B: PoemBackend,
    S: FavoriteStorage,
{
    match command {
        Command::List { category, json } => {
            let poems = match category.as_deref() {
                Some(category) => {
                    info!(category, "Listing poems by category");
                    repository.get_poems_by_category(category).await
                }
                None => repository.get_all_poems().await,
            };
            if json {
                Ok(serde_json::to_string_pretty(&poems)? + "\n")
            } else {
                Ok(presenter.render_list(&poems))
            }
        }
        Command::Show { title, id, json } => {
            let poem = match (id, title) {
                (Some(id), _) => repository.get_poem_by_id(id).await?,
                (None, Some(title)) => repository.get_poem_by_title(&title).await,
                (None, None) => bail!("Either a title or --id is required"),
            };
            let Some(poem) = poem else {
                bail!("Poem not found");
            };
            if json {
                Ok(serde_json::to_string_pretty(&poem)? + "\n")
            } else {
                Ok(presenter.render_detail(&poem))
            }
        }
        Command::Toggle { id } => {
            let poem = repository
                .get_poem_by_id(id)
                .await?
                .with_context(|| format!("Poem not found: {id}"))?;
            let toggled = repository
                .toggle_favorite(&poem)
                .await
                .with_context(|| format!("Failed to toggle favorite for poem {id}"))?
                .context("Poem has no id")?;
            let state = if toggled.favorite { "added to" } else { "removed from" };
            Ok(format!("{} {} favorites\n", toggled.title, state))
        }
        Command::Create {
            title,
            author,
            dynasty,
            content,
            appreciation,
        } => {
            let new = NewPoem {
                title,
                author,
                dynasty,
                content,
                appreciation,
                favorite: false,
            };
            let created = repository.create_poem(&new).await.context("Failed to create poem")?;
            Ok(format!(
                "Created poem {}: {}\n",
                created.id.unwrap_or_default(),
                created.title
            ))
        }
        Command::Delete { id } => {
            repository
                .delete_poem(id)
                .await
                .with_context(|| format!("Failed to delete poem {id}"))?;
            Ok(format!("Deleted poem {id}\n"))
        }
        Command::Import { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let poems: Vec<NewPoem> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse poems from {}", path.display()))?;
            let inserted = repository.import_poems(&poems).await;
            Ok(format!("Imported {} of {} poems\n", inserted.len(), poems.len()))
        }
        Command::Favorites { clear } => {
            if clear {
                repository.clear_favorites();
                return Ok("Cleared local favorites\n".to_string());
            }
            let ids: Vec<String> = repository
                .favorite_ids()
                .into_iter()
                .map(|id| id.to_string())
                .collect();
            if ids.is_empty() {
                Ok("No local favorites\n".to_string())
            } else {
                Ok(format!("{}\n", ids.join("\n")))
            }
        }
        Command::Health => {
            let backend = repository.api().backend();
            let health = backend
                .health()
                .await
                .with_context(|| format!("Backend {} is unreachable", backend.name()))?;
            Ok(format!(
                "backend: {}\nok: {}\ndb: {}\n",
                backend.name(),
                health.ok,
                health.db
            ))
        }
    }
}

/// Defaults, then the TOML file, then the environment, then CLI flags.
pub fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::discover(args.config.as_deref())?;
    config.apply_env()?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(dir) = &args.favorites_dir {
        config.favorites.dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

pub fn build_backend(config: &Config) -> Result<Box<dyn PoemBackend>> {
    let timeout = config.http.timeout();
    match config.backend {
        BackendKind::Rest => {
            let http = HttpClient::new(&config.api.base_url, timeout)?;
            http.set_token(config.api.token.clone());
            info!(base_url = %config.api.base_url, "Using REST backend");
            Ok(Box::new(RestBackend::new(http)))
        }
        BackendKind::Supabase => {
            if config.supabase.url.is_empty() || config.supabase.key.is_empty() {
                bail!("Supabase backend needs SUPABASE_URL and SUPABASE_KEY");
            }
            let backend = SupabaseBackend::new(
                &config.supabase.url,
                &config.supabase.key,
                &config.supabase.table,
                timeout,
            )
            .context("Failed to configure Supabase backend")?;
            backend.http().set_token(config.api.token.clone());
            info!(url = %config.supabase.url, table = %config.supabase.table, "Using Supabase backend");
            Ok(Box::new(backend))
        }
    }
}
