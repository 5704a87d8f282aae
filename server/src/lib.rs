//! livesearch-server: the search gateway behind live search inputs.
//!
//! Receives form-encoded live search requests, resolves the query against a
//! configured engine (or a native substring search over the catalog) and
//! answers with a rendered HTML fragment.
//!
//! # Modules
//!
//! - [`types`]: shared types (catalog items, options, application context)
//! - [`catalog`]: item store and native fallback search
//! - [`fuzzy`]: FZF v2 fuzzy scoring
//! - [`engine`]: the `SearchEngine` trait and the weighted fuzzy engine
//! - [`template`]: built-in and theme results templates
//! - [`gateway`]: request sanitization and the live search decision table
//! - [`api`]: axum handlers and router

pub mod api;
pub mod catalog;
pub mod engine;
pub mod fuzzy;
pub mod gateway;
pub mod template;
pub mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use catalog::Catalog;
use engine::{EngineProfile, SearchEngine, WeightedEngine};
use template::ResultsTemplate;
use types::AppContext;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to load configuration, catalog or templates at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid catalog {}: {source}", .path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate item id {0} in catalog")]
    DuplicateId(u64),

    #[error("invalid template {}: {reason}", .path.display())]
    Template { path: PathBuf, reason: String },

    #[error("invalid endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: &'static str },
}

// ---------------------------------------------------------------------------
// livesearch.toml config loading
// ---------------------------------------------------------------------------

/// Route of the health check, reserved next to the live search endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Known keys in `livesearch.toml` for config validation.
const KNOWN_CONFIG_KEYS: &[&str] =
    &["endpoint", "catalog", "theme_dir", "per_page", "load_items", "external_engine", "engines"];

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path the live search handler is mounted on.
    pub endpoint: String,
    /// JSON catalog of searchable items.
    pub catalog: Option<PathBuf>,
    /// Theme directory that may override the results template.
    pub theme_dir: Option<PathBuf>,
    /// Page size of every search.
    pub per_page: usize,
    /// Ask the engine for full items instead of ids.
    pub load_items: bool,
    /// Route searches through the weighted engine instead of the native fallback.
    pub external_engine: bool,
    /// Named engine profiles.
    pub engines: BTreeMap<String, EngineProfile>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "/live-search".to_string(),
            catalog: None,
            theme_dir: None,
            per_page: 10,
            load_items: false,
            external_engine: false,
            engines: BTreeMap::new(),
        }
    }
}

/// Simple Levenshtein edit distance for typo suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Warn about keys the gateway does not understand, suggesting the closest known one.
fn warn_unknown_keys(table: &toml::Table, path: &Path) {
    for key in table.keys() {
        if KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
            continue;
        }
        let closest = KNOWN_CONFIG_KEYS.iter().min_by_key(|k| edit_distance(key, k));
        match closest {
            Some(suggestion) if edit_distance(key, suggestion) <= 3 => warn!(
                key = key.as_str(),
                suggestion = *suggestion,
                file = %path.display(),
                "Unknown config key, did you mean '{suggestion}'?"
            ),
            _ => warn!(
                key = key.as_str(),
                file = %path.display(),
                "Unknown config key (known keys: {})",
                KNOWN_CONFIG_KEYS.join(", ")
            ),
        }
    }
}

/// The endpoint must be a literal path that does not shadow another route.
fn check_endpoint(endpoint: &str) -> Result<(), LoadError> {
    let reason = if !endpoint.starts_with('/') {
        "must start with '/'"
    } else if endpoint == HEALTH_PATH {
        "collides with the health route"
    } else if endpoint.contains(['{', '}', '*']) {
        "must not contain route parameters"
    } else {
        return Ok(());
    };
    Err(LoadError::Endpoint { endpoint: endpoint.to_string(), reason })
}

/// Parse a `livesearch.toml` document. Relative paths resolve against `base`.
pub fn parse_config(source: &str, path: &Path, base: &Path) -> Result<ServerConfig, LoadError> {
    let table: toml::Table = source
        .parse()
        .map_err(|source| LoadError::Config { path: path.to_path_buf(), source })?;
    warn_unknown_keys(&table, path);

    let mut config: ServerConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|source| LoadError::Config { path: path.to_path_buf(), source })?;

    config.catalog = config.catalog.map(|p| base.join(p));
    config.theme_dir = config.theme_dir.map(|p| base.join(p));
    if !config.endpoint.starts_with('/') {
        config.endpoint.insert(0, '/');
    }
    check_endpoint(&config.endpoint)?;
    if config.per_page == 0 {
        warn!("per_page = 0 would never return results, using 10");
        config.per_page = 10;
    }
    Ok(config)
}

/// Load configuration from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ServerConfig, LoadError> {
    if !path.exists() {
        debug!(file = %path.display(), "No config file, using defaults");
        return Ok(ServerConfig::default());
    }
    let source = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_config(&source, path, base)
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Load the catalog, pick the engine and resolve the results template.
pub fn build_context(config: ServerConfig) -> Result<AppContext, LoadError> {
    check_endpoint(&config.endpoint)?;
    let catalog = match &config.catalog {
        Some(path) => Catalog::load(path)?,
        None => {
            warn!("No catalog configured, every search will come back empty");
            Catalog::default()
        }
    };
    let catalog = Arc::new(catalog);

    let engine: Option<Arc<dyn SearchEngine>> = if config.external_engine {
        let engine = WeightedEngine::new(Arc::clone(&catalog), config.engines.clone());
        info!(profiles = engine.profile_count(), "Weighted search engine ready");
        Some(Arc::new(engine))
    } else {
        None
    };

    let template = ResultsTemplate::resolve(config.theme_dir.as_deref())?;
    info!(
        items = catalog.len(),
        template = template.source_name(),
        engine = if engine.is_some() { "weighted" } else { "native" },
        "Gateway context built"
    );

    Ok(AppContext {
        config: Arc::new(config),
        catalog,
        engine,
        template: Arc::new(template),
    })
}
