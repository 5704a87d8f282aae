//! Test harness for gateway integration tests.
//!
//! Copies a fixture site into a temp dir, builds an `AppContext` from its
//! `livesearch.toml`, and calls the axum handlers directly (no listener).

pub mod fixtures;

use axum::extract::{Form, State};
use axum::response::IntoResponse;
use livesearch_server::api::{api_health, api_live_search};
use livesearch_server::types::AppContext;
use livesearch_server::{build_context, load_config, ServerConfig};
use serde_json::Value;
use tempfile::TempDir;

pub struct TestHarness {
    pub ctx: AppContext,
    _temp_dir: TempDir,
}

pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl TestHarness {
    /// Harness over a named fixture with its config as written.
    pub fn from_fixture(name: &str) -> Self {
        Self::with_config(name, |_| {})
    }

    /// Harness over a named fixture, adjusting the loaded config before startup.
    pub fn with_config(name: &str, adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let fixture_src =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
        assert!(fixture_src.exists(), "Fixture '{name}' not found at {}", fixture_src.display());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();
        fixtures::copy_dir_recursive(&fixture_src, root);

        let mut config = load_config(&root.join("livesearch.toml")).expect("fixture config should load");
        adjust(&mut config);
        if let Some(theme) = &config.theme_dir {
            if theme.is_relative() {
                config.theme_dir = Some(root.join(theme));
            }
        }
        let ctx = build_context(config).expect("fixture context should build");

        Self { ctx, _temp_dir: temp_dir }
    }

    /// POST a form to the live search handler.
    pub async fn post(&self, fields: &[(&str, &str)]) -> Reply {
        let fields: Vec<(String, String)> =
            fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let response = api_live_search(State(self.ctx.clone()), Ok(Form(fields))).await;
        read(response.into_response()).await
    }

    /// Shorthand for a well-formed live search request.
    pub async fn search(&self, engine: &str, query: &str) -> String {
        self.post(&[("action", "live_search"), ("engine", engine), ("query", query)]).await.body
    }

    pub async fn health(&self) -> Value {
        let response = api_health(State(self.ctx.clone())).await.into_response();
        serde_json::from_str(&read(response).await.body).expect("health body is JSON")
    }
}

async fn read(response: axum::response::Response) -> Reply {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("readable body");
    Reply { status, content_type, body: String::from_utf8(bytes.to_vec()).expect("utf-8 body") }
}

/// Ids of rendered results, in order, from the fixture theme's `data-id` attributes.
pub fn result_ids(html: &str) -> Vec<u64> {
    html.split("data-id=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .filter_map(|id| id.parse().ok())
        .collect()
}
