use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::engine::SearchEngine;
use crate::template::ResultsTemplate;
use crate::ServerConfig;

// ---------------------------------------------------------------------------
// Catalog items
// ---------------------------------------------------------------------------

/// One searchable item: a post, page, product or anything else with a permalink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub permalink: String,
    /// ISO 8601 publication date; lexical order is chronological order.
    #[serde(default)]
    pub date: Option<String>,
}

fn default_kind() -> String {
    "post".to_string()
}

// ---------------------------------------------------------------------------
// Search index types
// ---------------------------------------------------------------------------

/// Pre-computed search entry for an item, with lowercased fields and bitmasks for fast fuzzy matching.
#[derive(Clone)]
pub struct SearchItemEntry {
    pub id: u64,
    pub kind: String,
    pub title: String,
    pub title_lower: String,
    pub excerpt: String,
    pub excerpt_lower: String,
    pub content: String,
    pub content_lower: String,
    pub title_mask: u64,
    pub excerpt_mask: u64,
    pub content_mask: u64,
}

// ---------------------------------------------------------------------------
// Engine contract types
// ---------------------------------------------------------------------------

/// Options passed to every engine search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Upper bound on returned results.
    pub per_page: usize,
    /// Return full items rather than bare ids.
    pub load_items: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { per_page: 10, load_items: false }
    }
}

/// Ordered matches as returned by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineResults {
    Ids(Vec<u64>),
    Items(Vec<Item>),
}

impl EngineResults {
    pub fn len(&self) -> usize {
        match self {
            EngineResults::Ids(ids) => ids.len(),
            EngineResults::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Axum state
// ---------------------------------------------------------------------------

/// Axum application state, built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub catalog: Arc<Catalog>,
    /// `None` routes every search to the native fallback.
    pub engine: Option<Arc<dyn SearchEngine>>,
    pub template: Arc<ResultsTemplate>,
}
