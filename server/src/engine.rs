//! Pluggable search engines.
//!
//! A [`SearchEngine`] answers a query against a named engine profile with an
//! ordered, page-bounded list of matches. [`WeightedEngine`] is the built-in
//! implementation: fuzzy field scoring weighted per profile.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::fuzzy::{char_bitmask, fuzzy_score, terms, Term};
use crate::types::{EngineResults, SearchItemEntry, SearchOptions};

pub trait SearchEngine: Send + Sync {
    /// Search `query` with the profile named `engine`. An unknown profile matches nothing.
    fn search(&self, engine: &str, query: &str, options: &SearchOptions) -> EngineResults;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Engine profiles
// ---------------------------------------------------------------------------

/// Relative importance of each item field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub title: f64,
    pub excerpt: f64,
    pub content: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self { title: 20.0, excerpt: 6.0, content: 2.0 }
    }
}

/// A named engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineProfile {
    /// Item kinds searched; empty searches every kind.
    pub kinds: Vec<String>,
    pub weights: Weights,
}

impl EngineProfile {
    fn includes(&self, kind: &str) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|k| k == kind)
    }
}

// ---------------------------------------------------------------------------
// Weighted fuzzy engine
// ---------------------------------------------------------------------------

pub struct WeightedEngine {
    catalog: Arc<Catalog>,
    profiles: BTreeMap<String, EngineProfile>,
    entries: Vec<SearchItemEntry>,
}

impl WeightedEngine {
    /// Index the catalog. A `default` profile over every kind is added when
    /// the configuration does not define one.
    pub fn new(catalog: Arc<Catalog>, mut profiles: BTreeMap<String, EngineProfile>) -> Self {
        profiles.entry("default".to_string()).or_default();

        let entries = catalog
            .items()
            .par_iter()
            .map(|item| {
                let title_lower = item.title.to_lowercase();
                let excerpt_lower = item.excerpt.to_lowercase();
                let content_lower = item.content.to_lowercase();
                SearchItemEntry {
                    id: item.id,
                    kind: item.kind.clone(),
                    title_mask: char_bitmask(&title_lower),
                    excerpt_mask: char_bitmask(&excerpt_lower),
                    content_mask: char_bitmask(&content_lower),
                    title: item.title.clone(),
                    title_lower,
                    excerpt: item.excerpt.clone(),
                    excerpt_lower,
                    content: item.content.clone(),
                    content_lower,
                }
            })
            .collect();

        Self { catalog, profiles, entries }
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn profile(&self, name: &str) -> Option<&EngineProfile> {
        self.profiles.get(name)
    }
}

/// Score one field for one term, or `None` if the term is not in it.
fn score_field(text: &str, text_lower: &str, mask: u64, term: &Term) -> Option<f64> {
    if !term.may_match(mask) {
        return None;
    }
    let haystack = if term.case_sensitive { text } else { text_lower };
    fuzzy_score(haystack, &term.text, term.case_sensitive).map(f64::from)
}

/// Every term must match some field; each term contributes its best weighted field score.
fn score_entry(entry: &SearchItemEntry, terms: &[Term], weights: &Weights) -> Option<f64> {
    let mut total = 0.0;
    for term in terms {
        let fields = [
            (weights.title, &entry.title, &entry.title_lower, entry.title_mask),
            (weights.excerpt, &entry.excerpt, &entry.excerpt_lower, entry.excerpt_mask),
            (weights.content, &entry.content, &entry.content_lower, entry.content_mask),
        ];
        let best = fields
            .iter()
            .filter(|(weight, ..)| *weight > 0.0)
            .filter_map(|(weight, text, lower, mask)| score_field(text, lower, *mask, term).map(|s| s * weight))
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));
        total += best?;
    }
    Some(total)
}

impl SearchEngine for WeightedEngine {
    fn search(&self, engine: &str, query: &str, options: &SearchOptions) -> EngineResults {
        let start = Instant::now();
        let terms = terms(query);

        let hits: Vec<(u64, f64)> = match self.profiles.get(engine) {
            Some(profile) if !terms.is_empty() && options.per_page > 0 => {
                let mut hits: Vec<(u64, f64)> = self
                    .entries
                    .par_iter()
                    .filter(|e| profile.includes(&e.kind))
                    .filter_map(|e| score_entry(e, &terms, &profile.weights).map(|s| (e.id, s)))
                    .collect();
                hits.sort_unstable_by(|a, b| {
                    b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
                });
                hits.truncate(options.per_page);
                hits
            }
            Some(_) => Vec::new(),
            None => {
                debug!(engine, "Unknown engine profile");
                Vec::new()
            }
        };

        debug!(
            engine,
            query,
            hits = hits.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Weighted search"
        );

        let ids: Vec<u64> = hits.into_iter().map(|(id, _)| id).collect();
        if options.load_items {
            EngineResults::Items(self.catalog.by_ids(&ids).into_iter().cloned().collect())
        } else {
            EngineResults::Ids(ids)
        }
    }

    fn name(&self) -> &str {
        "weighted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;

    fn item(id: u64, kind: &str, title: &str, content: &str) -> Item {
        Item {
            id,
            kind: kind.into(),
            title: title.into(),
            excerpt: String::new(),
            content: content.into(),
            permalink: String::new(),
            date: None,
        }
    }

    fn engine(profiles: BTreeMap<String, EngineProfile>) -> WeightedEngine {
        let catalog = Catalog::from_items(vec![
            item(1, "post", "Tokio runtime internals", "Scheduler and reactor"),
            item(2, "page", "About", "We write about tokio and axum"),
            item(3, "post", "Axum routing", "Handlers and extractors"),
        ])
        .unwrap();
        WeightedEngine::new(Arc::new(catalog), profiles)
    }

    fn ids(results: EngineResults) -> Vec<u64> {
        match results {
            EngineResults::Ids(ids) => ids,
            EngineResults::Items(items) => items.into_iter().map(|i| i.id).collect(),
        }
    }

    #[test]
    fn title_weight_ranks_title_hits_first() {
        let engine = engine(BTreeMap::new());
        let found = ids(engine.search("default", "tokio", &SearchOptions::default()));
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn profile_restricts_kinds() {
        let mut profiles = BTreeMap::new();
        profiles.insert("pages".to_string(), EngineProfile { kinds: vec!["page".into()], ..Default::default() });
        let engine = engine(profiles);
        let found = ids(engine.search("pages", "tokio", &SearchOptions::default()));
        assert_eq!(found, vec![2]);
    }

    #[test]
    fn unknown_engine_matches_nothing() {
        let engine = engine(BTreeMap::new());
        assert!(engine.search("nope", "tokio", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn every_term_must_match() {
        let engine = engine(BTreeMap::new());
        let found = ids(engine.search("default", "tokio axum", &SearchOptions::default()));
        assert_eq!(found, vec![2]);
    }

    #[test]
    fn page_size_and_item_loading() {
        let engine = engine(BTreeMap::new());
        let options = SearchOptions { per_page: 1, load_items: true };
        match engine.search("default", "tokio", &options) {
            EngineResults::Items(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].title, "Tokio runtime internals");
            }
            other => panic!("expected items, got {other:?}"),
        }
    }
}
