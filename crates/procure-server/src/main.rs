//! procure-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, optionally loads reference data from a JSON seed
//! file, and serves the solicitation API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use procure_core::LifecycleEngine;
use procure_server::{SeedData, ServerConfig, SettingsConfigProvider, expand_tilde, seed};
use procure_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Procurement solicitation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// JSON file with catalog items, servers and requesters to upsert at
  /// startup.
  #[arg(long)]
  seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PROCURE").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(path) = cli.seed {
    let raw = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read seed file {path:?}"))?;
    let data: SeedData =
      serde_json::from_str(&raw).with_context(|| format!("invalid seed file {path:?}"))?;
    seed(&store, data).await.context("failed to load seed data")?;
  }

  match server_cfg.submission_deadline {
    Some(deadline) => tracing::info!(%deadline, "submission deadline configured"),
    None => tracing::info!("no submission deadline configured"),
  }

  let engine = LifecycleEngine::new(
    store.clone(),
    store.clone(),
    store,
    Arc::new(SettingsConfigProvider::from(&server_cfg)),
  );

  let app = procure_api::api_router(Arc::new(engine));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
