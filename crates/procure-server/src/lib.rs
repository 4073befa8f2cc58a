//! Runtime configuration and store bootstrap for the procurement server.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use procure_core::{
  catalog::CatalogItem,
  environment::ConfigProvider,
  identity::{RequesterRecord, ServerRecord},
};
use procure_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::info;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PROCURE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Closes creation and ordinary edits once passed. Absent means open.
  #[serde(default)]
  pub submission_deadline:   Option<DateTime<Utc>>,
  #[serde(default = "default_max_items")]
  pub max_items_per_request: usize,
  #[serde(default = "default_max_quantity")]
  pub max_quantity_per_item: u32,
}

fn default_max_items() -> usize { 50 }

fn default_max_quantity() -> u32 { 1000 }

/// Engine-facing view of the loaded settings.
#[derive(Debug, Clone)]
pub struct SettingsConfigProvider {
  deadline:     Option<DateTime<Utc>>,
  max_items:    usize,
  max_quantity: u32,
}

impl From<&ServerConfig> for SettingsConfigProvider {
  fn from(cfg: &ServerConfig) -> Self {
    Self {
      deadline:     cfg.submission_deadline,
      max_items:    cfg.max_items_per_request,
      max_quantity: cfg.max_quantity_per_item,
    }
  }
}

impl ConfigProvider for SettingsConfigProvider {
  fn submission_deadline(&self) -> Option<DateTime<Utc>> { self.deadline }

  fn max_items_per_request(&self) -> usize { self.max_items }

  fn max_quantity_per_item(&self) -> u32 { self.max_quantity }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Seeding ──────────────────────────────────────────────────────────────────

/// Reference data owned by other university systems, loaded with `--seed`.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
  #[serde(default)]
  pub catalog:    Vec<CatalogItem>,
  #[serde(default)]
  pub servers:    Vec<ServerRecord>,
  #[serde(default)]
  pub requesters: Vec<RequesterRecord>,
}

/// Upsert every seed record. Servers go first since requesters reference
/// them.
pub async fn seed(store: &SqliteStore, data: SeedData) -> procure_store_sqlite::Result<()> {
  let (items, servers, requesters) =
    (data.catalog.len(), data.servers.len(), data.requesters.len());

  for item in data.catalog {
    store.upsert_catalog_item(item).await?;
  }
  for server in data.servers {
    store.upsert_server(server).await?;
  }
  for requester in data.requesters {
    store.upsert_requester(requester).await?;
  }

  info!(items, servers, requesters, "seed data loaded");
  Ok(())
}
