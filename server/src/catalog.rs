//! In-memory item catalog and the native substring search used when no engine
//! is configured.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::types::Item;
use crate::LoadError;

#[derive(Debug, Default)]
pub struct Catalog {
    items: Vec<Item>,
    by_id: HashMap<u64, usize>,
}

impl Catalog {
    pub fn from_items(items: Vec<Item>) -> Result<Self, LoadError> {
        let mut by_id = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if by_id.insert(item.id, idx).is_some() {
                return Err(LoadError::DuplicateId(item.id));
            }
        }
        Ok(Self { items, by_id })
    }

    /// Load a JSON array of items.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        let items: Vec<Item> = serde_json::from_str(&source)
            .map_err(|source| LoadError::Catalog { path: path.to_path_buf(), source })?;
        let catalog = Self::from_items(items)?;
        info!(file = %path.display(), items = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: u64) -> Option<&Item> {
        self.by_id.get(&id).map(|&idx| &self.items[idx])
    }

    /// Items for `ids`, in the order given. Unknown ids are skipped.
    pub fn by_ids(&self, ids: &[u64]) -> Vec<&Item> {
        ids.iter().filter_map(|&id| self.get(id)).collect()
    }

    /// Native fallback search.
    ///
    /// Every whitespace-separated term must occur, case-insensitively, in the
    /// title, excerpt or content. Items whose title contains the whole query
    /// rank first, then items whose title contains every term, then the rest;
    /// ties go to the newest item, then the lowest id.
    pub fn native_search(&self, query: &str, per_page: usize) -> Vec<&Item> {
        let query = query.trim().to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();
        if terms.is_empty() || per_page == 0 {
            return Vec::new();
        }

        let mut hits: Vec<(u8, &Item)> = self
            .items
            .iter()
            .filter_map(|item| {
                let title = item.title.to_lowercase();
                let excerpt = item.excerpt.to_lowercase();
                let content = item.content.to_lowercase();
                let all_found = terms
                    .iter()
                    .all(|t| title.contains(t) || excerpt.contains(t) || content.contains(t));
                if !all_found {
                    return None;
                }
                let rank = if title.contains(query.as_str()) {
                    0
                } else if terms.iter().all(|t| title.contains(t)) {
                    1
                } else {
                    2
                };
                Some((rank, item))
            })
            .collect();

        hits.sort_by(|(ra, a), (rb, b)| {
            ra.cmp(rb)
                .then_with(|| newest_first(a, b))
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(per_page);
        debug!(query = %query, hits = hits.len(), "Native search");
        hits.into_iter().map(|(_, item)| item).collect()
    }
}

fn newest_first(a: &Item, b: &Item) -> Ordering {
    match (&a.date, &b.date) {
        (Some(da), Some(db)) => db.cmp(da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
