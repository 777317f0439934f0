//! Configuration for mediarr.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MEDIARR_CONFIG, MEDIARR_HOME)
//! 2. Config file (.mediarr/config.yaml in the current directory or a parent)
//! 3. ~/.mediarr/config.yaml
//! 4. Defaults (~/.mediarr, vault.db, no rules)
//!
//! The database path in the config file is relative to the home directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{MediaItem, MediaType};
use crate::provider::{ProviderKind, ProviderSettings};

const CONFIG_DIR: &str = ".mediarr";
const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_DATABASE: &str = "vault.db";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: String,

    /// Database file, relative to the home directory
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,

    #[serde(default)]
    pub filters: FiltersConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub library: LibraryConfig,
}

fn default_version() -> String {
    "1".to_string()
}

/// Ignore/accept rule strings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default)]
    pub accepts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// How long a validated id stays trusted
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

fn default_ttl_hours() -> u64 {
    168
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
        }
    }
}

/// Items the library already owns
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub owned: Vec<OwnedItem>,
}

/// One owned title; at least one id should be set for it to match anything
#[derive(Debug, Clone, Deserialize)]
pub struct OwnedItem {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tvdb_id: String,
    #[serde(default)]
    pub tmdb_id: String,
    #[serde(default)]
    pub imdb_id: String,
}

impl OwnedItem {
    pub fn to_media_item(&self) -> MediaItem {
        let mut item = MediaItem::new(
            "library",
            self.media_type,
            self.title.clone(),
            DateTime::<Utc>::default(),
        );
        item.tvdb_id = self.tvdb_id.clone();
        item.tmdb_id = self.tmdb_id.clone();
        item.imdb_id = self.imdb_id.clone();
        item
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,
    pub filters: FiltersConfig,
    pub validation: ValidationConfig,
    pub library: LibraryConfig,
}

impl ResolvedConfig {
    /// Settings for `kind`, or defaults if the file has none
    pub fn provider_settings(&self, kind: ProviderKind) -> ProviderSettings {
        self.providers.get(&kind).cloned().unwrap_or_default()
    }

    pub fn validation_ttl(&self) -> Duration {
        Duration::from_secs(self.validation.ttl_hours.saturating_mul(3600))
    }

    /// Owned items as media records
    pub fn owned_media(&self) -> Vec<MediaItem> {
        self.library.owned.iter().map(OwnedItem::to_media_item).collect()
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Locate the config file from the environment, the working directory or home
fn discover_config_file(default_home: &Path) -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("MEDIARR_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    if let Some(found) = std::env::current_dir().ok().and_then(|cwd| find_config_file(&cwd)) {
        return Some(found);
    }

    let home_config = default_home.join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn default_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR))
}

/// Combine a config file (if any) with the home directory
fn resolve(config_file: Option<PathBuf>, home: PathBuf) -> Result<ResolvedConfig> {
    let file = match &config_file {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let database = resolve_path(&home, file.database.as_deref().unwrap_or(DEFAULT_DATABASE));

    Ok(ResolvedConfig {
        home,
        database,
        config_file,
        providers: file.providers,
        filters: file.filters,
        validation: file.validation,
        library: file.library,
    })
}

fn home_from_env(default_home: PathBuf) -> PathBuf {
    std::env::var("MEDIARR_HOME")
        .map(PathBuf::from)
        .unwrap_or(default_home)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = default_home()?;
    let config_file = discover_config_file(&default_home);
    resolve(config_file, home_from_env(default_home))
}

/// Load configuration from an explicit file, ignoring discovery
pub fn load_from(path: &Path) -> Result<ResolvedConfig> {
    resolve(Some(path.to_path_buf()), home_from_env(default_home()?))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{e:#}")));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
