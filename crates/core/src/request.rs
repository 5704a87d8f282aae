//! Search request payloads and response normalization.
//!
//! The payload is what a full submission of the enclosing form would send,
//! plus the live-search markers, plus any parameters already carried on the
//! form's action URL.

use serde::Serialize;

use crate::host::SearchForm;

/// Discriminator that tells a shared endpoint this is a live-search request.
pub const ACTION: &str = "live_search";

pub const ACTION_FIELD: &str = "action";
pub const ENGINE_FIELD: &str = "engine";
pub const QUERY_FIELD: &str = "query";

/// An ordered list of form fields, sent as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct SearchRequest {
    fields: Vec<(String, String)>,
}

impl SearchRequest {
    /// Assemble the payload for `query` against `engine`.
    ///
    /// `query` is the raw input value, untrimmed.
    pub fn build(form: Option<&SearchForm>, engine: &str, query: &str) -> Self {
        let mut fields = Vec::new();

        if let Some(form) = form {
            if let Some(name) = form.input_name.as_deref() {
                fields.push((name.to_string(), query.to_string()));
            }
            fields.extend(form.fields.iter().cloned());
        }

        fields.push((ACTION_FIELD.to_string(), ACTION.to_string()));
        fields.push((ENGINE_FIELD.to_string(), engine.to_string()));
        fields.push((QUERY_FIELD.to_string(), query.to_string()));

        if let Some(form) = form {
            fields.extend(action_query_params(&form.action));
        }

        Self { fields }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Value of the last field named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn query(&self) -> Option<&str> {
        self.get(QUERY_FIELD)
    }

    pub fn engine(&self) -> Option<&str> {
        self.get(ENGINE_FIELD)
    }

    /// Form-urlencoded body.
    pub fn encode(&self) -> String {
        serde_urlencoded::to_string(&self.fields).unwrap_or_default()
    }
}

/// Parameters carried in the query string of a form's action URL.
pub fn action_query_params(action: &str) -> Vec<(String, String)> {
    let Some((_, query)) = action.split_once('?') else {
        return Vec::new();
    };
    let query = query.split_once('#').map_or(query, |(q, _)| q);
    if query.is_empty() {
        return Vec::new();
    }
    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|e| {
        tracing::debug!(action, error = %e, "Ignoring unparseable action query string");
        Vec::new()
    })
}

/// Turn a raw response body into displayable content.
///
/// A shared endpoint answers a bare `0` when no handler produced output;
/// that must render as nothing, never as the digit.
pub fn normalize_fragment(body: &str) -> String {
    if body.trim() == "0" {
        String::new()
    } else {
        body.to_string()
    }
}
