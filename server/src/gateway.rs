//! Live search request handling, independent of the HTTP layer.
//!
//! Decision table for a request whose `action` is `live_search`:
//!
//! | external engine | `engine` | `query` | result          |
//! |-----------------|----------|---------|-----------------|
//! | yes             | present  | present | engine search   |
//! | yes             | missing  | any     | no body         |
//! | no              | any      | present | native search   |
//! | any             | any      | missing | no body         |
//!
//! Any other action gets the shared-endpoint reply `0`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::types::{AppContext, EngineResults, Item, SearchOptions};

/// Value of `action` that selects the live search handler.
pub const LIVE_SEARCH_ACTION: &str = "live_search";

/// Body a shared endpoint answers when no handler claims the action.
pub const UNHANDLED_BODY: &str = "0";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static OCTET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[0-9a-fA-F]{2}").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Clean a single-line text field: strip tags and percent-encoded octets,
/// collapse whitespace, trim.
pub fn sanitize_text_field(raw: &str) -> String {
    let without_tags = TAG_RE.replace_all(raw, "");
    let without_octets = OCTET_RE.replace_all(&without_tags, "");
    SPACE_RE.replace_all(&without_octets, " ").trim().to_string()
}

/// The fields the gateway reads from a request. Later duplicates win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSearchParams {
    pub action: Option<String>,
    pub engine: Option<String>,
    pub query: Option<String>,
}

impl LiveSearchParams {
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut params = Self::default();
        for (name, value) in fields {
            let slot = match name {
                "action" => &mut params.action,
                "engine" => &mut params.engine,
                "query" => &mut params.query,
                _ => continue,
            };
            let value = sanitize_text_field(value);
            *slot = (!value.is_empty()).then_some(value);
        }
        params
    }

    pub fn is_live_search(&self) -> bool {
        self.action.as_deref() == Some(LIVE_SEARCH_ACTION)
    }
}

/// What the gateway decided to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    /// The action was not ours.
    Unhandled,
    /// Required fields missing; empty body.
    NoBody,
    /// Rendered results. Empty when nothing matched.
    Fragment(String),
}

impl GatewayResponse {
    pub fn into_body(self) -> String {
        match self {
            GatewayResponse::Unhandled => UNHANDLED_BODY.to_string(),
            GatewayResponse::NoBody => String::new(),
            GatewayResponse::Fragment(html) => html,
        }
    }
}

/// Run one live search request. Blocking: call from `spawn_blocking`.
pub fn handle(ctx: &AppContext, params: &LiveSearchParams) -> GatewayResponse {
    if !params.is_live_search() {
        debug!(action = ?params.action, "Unhandled action");
        return GatewayResponse::Unhandled;
    }

    let options = SearchOptions { per_page: ctx.config.per_page, load_items: ctx.config.load_items };

    match (&ctx.engine, params.engine.as_deref(), params.query.as_deref()) {
        (Some(engine), Some(profile), Some(query)) => {
            let results = engine.search(profile, query, &options);
            debug!(engine = engine.name(), profile, query, hits = results.len(), "Engine search");
            let items: Vec<&Item> = match &results {
                EngineResults::Ids(ids) => ctx.catalog.by_ids(ids),
                EngineResults::Items(loaded) => loaded.iter().take(options.per_page).collect(),
            };
            GatewayResponse::Fragment(ctx.template.render(&items))
        }
        (Some(_), None, _) => GatewayResponse::NoBody,
        (None, _, Some(query)) => {
            let items = ctx.catalog.native_search(query, options.per_page);
            GatewayResponse::Fragment(ctx.template.render(&items))
        }
        (_, _, None) => GatewayResponse::NoBody,
    }
}
