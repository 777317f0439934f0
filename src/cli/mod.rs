//! Command-line interface for mediarr.
//!
//! Provides commands for running a single provider search, listing providers
//! and their search types, resolving Trakt ids and showing the configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::Database;
use crate::config::{self, ResolvedConfig};
use crate::domain::{MediaItem, MediaType, SearchQuery, SearchType};
use crate::library::{LibraryFilters, LibraryManager, MemoryLibrary};
use crate::media::{self, IdValidator, LookupId, TraktLookup};
use crate::provider::{self, ItemFilter, ProviderKind, ProviderSettings, Services};
use crate::web::{HttpClient, RateLimiterRegistry};

/// mediarr - Discover new movies and shows from public catalogs
#[derive(Parser, Debug)]
#[command(name = "mediarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use this config file instead of searching for one
    #[arg(long, global = true, env = "MEDIARR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search a provider for movies
    Movies(SearchArgs),

    /// Search a provider for shows
    Shows(SearchArgs),

    /// List providers and the search types they support
    Providers,

    /// Resolve the Trakt id of a title from its TMDB or TVDB id
    Lookup {
        #[arg(value_enum)]
        media_type: MediaKind,

        /// tmdb or tvdb
        id_type: String,

        /// External id to look up
        id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Media type for CLI (maps to MediaType)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MediaKind {
    Movie,
    Show,
}

impl From<MediaKind> for MediaType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Movie => MediaType::Movie,
            MediaKind::Show => MediaType::Show,
        }
    }
}

/// Arguments shared by the movie and show searches
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Provider name (trakt, tmdb, tvmaze)
    pub provider: String,

    /// Search type (popular, trending, anticipated, watched, now_playing, ...)
    #[arg(short, long, default_value = "popular")]
    pub search_type: String,

    /// Stop after this many accepted items (0 means no limit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub genre: Option<String>,

    #[arg(long)]
    pub year: Option<String>,

    /// Extra provider parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

impl SearchArgs {
    fn query(&self) -> Result<SearchQuery> {
        let search_type: SearchType = self.search_type.parse()?;
        let mut query = SearchQuery::new(search_type);

        if let Some(limit) = self.limit {
            query = query.with_limit(limit);
        }

        let named = [
            ("country", &self.country),
            ("language", &self.language),
            ("genre", &self.genre),
            ("year", &self.year),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                query = query.with_param(key, value.as_str());
            }
        }
        for (key, value) in &self.params {
            query = query.with_param(key.as_str(), value.as_str());
        }

        Ok(query)
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Movies(args) => {
                let cfg = load_config(self.config)?;
                run_search(&cfg, MediaType::Movie, &args).await
            }
            Commands::Shows(args) => {
                let cfg = load_config(self.config)?;
                run_search(&cfg, MediaType::Show, &args).await
            }
            Commands::Providers => list_providers(),
            Commands::Lookup {
                media_type,
                id_type,
                id,
            } => {
                let cfg = load_config(self.config)?;
                lookup(&cfg, media_type.into(), &id_type, &id).await
            }
            Commands::Config => {
                let cfg = load_config(self.config)?;
                show_config(&cfg)
            }
        }
    }
}

fn load_config(explicit: Option<PathBuf>) -> Result<ResolvedConfig> {
    match explicit {
        Some(path) => config::load_from(&path),
        None => config::config().cloned(),
    }
}

/// Cancel the returned token on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling search");
            child.cancel();
        }
    });
    token
}

/// Run one provider search and print what survives
async fn run_search(cfg: &ResolvedConfig, media_type: MediaType, args: &SearchArgs) -> Result<()> {
    let kind: ProviderKind = args.provider.parse()?;
    let query = args.query()?;

    let http = HttpClient::new()?;
    let limiters = Arc::new(RateLimiterRegistry::new());
    let services = Services::new(http.clone(), limiters.clone());

    let mut provider = provider::build(kind, &cfg.provider_settings(kind), &services)?;
    provider.ensure_supported(media_type, query.search_type)?;

    let filters = LibraryFilters::new(&cfg.filters.ignores, &cfg.filters.accepts)
        .context("Failed compiling filter rules")?;
    let library = MemoryLibrary::new(filters).with_items(cfg.owned_media());
    let existing = library.existing_media().await?;

    let validator = if provider.validates_ids() {
        let db = Database::open(&cfg.database)
            .with_context(|| format!("Failed opening {}", cfg.database.display()))?;
        Some(IdValidator::new(http.clone(), &limiters).with_cache(db.validation_cache(), cfg.validation_ttl()))
    } else {
        None
    };

    let mut filter = ItemFilter::new().existing(&existing).library(&library);
    if let Some(validator) = &validator {
        filter = filter.validator(validator);
    }

    let cancel = cancel_on_interrupt();
    provider.init(&cancel).await?;

    debug!(provider = %kind, %media_type, search_type = %query.search_type, "Starting search");
    let results = provider.search(media_type, &query, &filter, &cancel).await?;
    let stats = results.stats;
    info!(
        provider = %kind,
        pages = stats.pages,
        accepted = stats.accepted,
        existing = stats.existing,
        ignored = stats.ignored,
        duplicates = stats.duplicates,
        "Search finished"
    );

    let found = media::prune_existing(&existing, results.into_items());
    print_items(&media::sorted_by_release(found.into_values()));

    Ok(())
}

fn print_items(items: &[MediaItem]) {
    if items.is_empty() {
        println!("No new items found");
        return;
    }

    println!("{:<10} {:<12} {:<6} {:<50}", "ID", "RELEASED", "YEAR", "TITLE");
    println!("{}", "-".repeat(80));

    for item in items {
        let title = if item.title.chars().count() > 47 {
            format!("{}...", item.title.chars().take(47).collect::<String>())
        } else {
            item.title.clone()
        };
        println!(
            "{:<10} {:<12} {:<6} {:<50}",
            item.canonical_id(),
            item.date.format("%Y-%m-%d").to_string(),
            item.year(),
            title
        );
    }

    println!("\nTotal: {} items", items.len());
}

/// List providers with their search types per media type
fn list_providers() -> Result<()> {
    let http = HttpClient::new()?;
    let services = Services::new(http, Arc::new(RateLimiterRegistry::new()));

    for kind in ProviderKind::ALL {
        // Placeholder credentials so every provider can be constructed
        let settings = ProviderSettings {
            client_id: Some("-".to_string()),
            api_key: Some("-".to_string()),
            ..Default::default()
        };
        let provider = provider::build(kind, &settings, &services)?;

        println!("{kind}");
        for media_type in [MediaType::Movie, MediaType::Show] {
            let types = provider.search_types(media_type);
            if types.is_empty() {
                continue;
            }
            let names: Vec<&str> = types.iter().map(SearchType::as_str).collect();
            println!("  {:<7} {}", format!("{media_type}s:"), names.join(", "));
        }
    }

    Ok(())
}

/// Resolve a Trakt id
async fn lookup(cfg: &ResolvedConfig, media_type: MediaType, id_type: &str, id: &str) -> Result<()> {
    let id_type: LookupId = id_type.parse()?;
    let settings = cfg.provider_settings(ProviderKind::Trakt);
    let client_id = ProviderSettings::require("trakt", &settings.client_id, "client_id")?;

    let mut trakt = TraktLookup::new(HttpClient::new()?, client_id).with_retry(settings.retry.clone());
    if let Some(url) = &settings.url {
        trakt = trakt.with_api_url(url.as_str());
    }

    let registry = RateLimiterRegistry::new();
    let cancel = cancel_on_interrupt();
    let trakt_id = trakt.trakt_id(&registry, media_type, id_type, id, &cancel).await?;

    println!("{trakt_id}");
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none - using defaults)".to_string()));
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!();
    println!("Providers:");
    for kind in ProviderKind::ALL {
        let settings = cfg.provider_settings(kind);
        let credential = match kind {
            ProviderKind::Trakt => mask(&settings.client_id),
            ProviderKind::Tmdb => mask(&settings.api_key),
            ProviderKind::TvMaze => "(not required)",
        };
        println!(
            "  {:<7} credentials: {:<15} timeout: {}s  attempts: {}",
            kind.name(),
            credential,
            settings.timeout_secs,
            settings.retry.max_attempts
        );
    }
    println!();
    println!("Filters:");
    print_rules("ignores", &cfg.filters.ignores);
    print_rules("accepts", &cfg.filters.accepts);
    println!();
    println!("Validation TTL: {}h", cfg.validation.ttl_hours);
    println!("Owned items:    {}", cfg.library.owned.len());

    Ok(())
}

fn mask(value: &Option<String>) -> &'static str {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => "(set)",
        _ => "(missing)",
    }
}

fn print_rules(label: &str, rules: &[String]) {
    if rules.is_empty() {
        println!("  {label}: (none)");
        return;
    }
    println!("  {label}:");
    for rule in rules {
        println!("    {rule}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("networks=HBO").unwrap(),
            ("networks".to_string(), "HBO".to_string())
        );
        assert_eq!(
            parse_key_value("certifications=pg=13").unwrap(),
            ("certifications".to_string(), "pg=13".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_search_args_build_query() {
        let cli = Cli::try_parse_from([
            "mediarr", "shows", "trakt", "--search-type", "anticipated", "--limit", "25",
            "--country", "us", "--param", "network=HBO",
        ])
        .unwrap();

        let Commands::Shows(args) = cli.command else {
            panic!("expected shows command");
        };
        let query = args.query().unwrap();
        assert_eq!(query.search_type, SearchType::Upcoming);
        assert_eq!(query.limit, Some(25));
        assert_eq!(query.param("country"), Some("us"));
        assert_eq!(query.param("network"), Some("HBO"));
        assert_eq!(query.param("genre"), None);
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["mediarr", "-vv", "providers"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Providers));
    }

    #[test]
    fn test_unknown_search_type_is_an_error() {
        let cli = Cli::try_parse_from(["mediarr", "movies", "tmdb", "-s", "bogus"]).unwrap();
        let Commands::Movies(args) = cli.command else {
            panic!("expected movies command");
        };
        assert!(args.query().is_err());
    }
}
