use axum::{
    extract::{rejection::FormRejection, Form, Json, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::time::Instant;
use tracing::{debug, error};

use crate::gateway::{self, LiveSearchParams};
use crate::types::AppContext;

const HTML: &str = "text/html; charset=utf-8";

// ---------------------------------------------------------------------------
// Live search
// ---------------------------------------------------------------------------

/// Form-encoded live search request. An unreadable body is treated as a
/// request without fields, which answers the unhandled-action body.
pub async fn api_live_search(
    State(ctx): State<AppContext>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let start = Instant::now();
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(e) => {
            debug!(error = %e, "Unreadable live search form");
            Vec::new()
        }
    };
    let params = LiveSearchParams::from_fields(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let outcome = tokio::task::spawn_blocking(move || gateway::handle(&ctx, &params)).await;
    match outcome {
        Ok(response) => {
            let body = response.into_body();
            debug!(
                bytes = body.len(),
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Live search answered"
            );
            ([(CONTENT_TYPE, HTML)], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Live search task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, [(CONTENT_TYPE, HTML)], String::new()).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn api_health(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "items": ctx.catalog.len(),
        "engine": ctx.engine.as_ref().map_or("native", |e| e.name()),
        "template": ctx.template.source_name(),
        "endpoint": ctx.config.endpoint,
    }))
}

/// Live search and health routes, without middleware.
pub fn router(ctx: AppContext) -> Router {
    let endpoint = ctx.config.endpoint.clone();
    Router::new()
        .route(crate::HEALTH_PATH, get(api_health))
        .route(&endpoint, get(api_live_search).post(api_live_search))
        .with_state(ctx)
}
