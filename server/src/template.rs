//! Results templates.
//!
//! A theme may ship `live-search/search-results.html` under its theme
//! directory; otherwise the built-in maud template is used. Theme files are
//! plain HTML with a single `{{#items}}…{{/items}}` section repeated per
//! match. Inside it `{{id}}`, `{{title}}`, `{{permalink}}`, `{{excerpt}}`,
//! `{{kind}}` and `{{date}}` expand to the HTML-escaped item field.
//! `{{count}}` may appear anywhere.

use std::path::{Path, PathBuf};

use maud::{html, Markup, Render};
use tracing::info;

use crate::types::Item;
use crate::LoadError;

/// Path of the override, relative to the theme directory.
pub const THEME_TEMPLATE: &str = "live-search/search-results.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Permalink,
    Excerpt,
    Kind,
    Date,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Field::Id,
            "title" => Field::Title,
            "permalink" => Field::Permalink,
            "excerpt" => Field::Excerpt,
            "kind" => Field::Kind,
            "date" => Field::Date,
            _ => return None,
        })
    }

    fn value(self, item: &Item) -> String {
        match self {
            Field::Id => item.id.to_string(),
            Field::Title => item.title.clone(),
            Field::Permalink => item.permalink.clone(),
            Field::Excerpt => item.excerpt.clone(),
            Field::Kind => item.kind.clone(),
            Field::Date => item.date.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
    Count,
    Items(Vec<Segment>),
}

fn parse(source: &str) -> Result<Vec<Segment>, String> {
    let mut top = Vec::new();
    let mut section: Option<Vec<Segment>> = None;
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            section.as_mut().unwrap_or(&mut top).push(Segment::Text(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let close = after.find("}}").ok_or_else(|| "unclosed '{{' tag".to_string())?;
        let tag = after[..close].trim();
        rest = &after[close + 2..];

        match tag {
            "#items" => {
                if section.is_some() {
                    return Err("items sections cannot nest".into());
                }
                section = Some(Vec::new());
            }
            "/items" => {
                let inner = section.take().ok_or_else(|| "'{{/items}}' without '{{#items}}'".to_string())?;
                top.push(Segment::Items(inner));
            }
            "count" => section.as_mut().unwrap_or(&mut top).push(Segment::Count),
            name => {
                let field = Field::parse(name).ok_or_else(|| format!("unknown placeholder '{name}'"))?;
                let Some(inner) = section.as_mut() else {
                    return Err(format!("'{{{{{name}}}}}' used outside the items section"));
                };
                inner.push(Segment::Field(field));
            }
        }
    }

    if section.is_some() {
        return Err("'{{#items}}' is never closed".into());
    }
    if !rest.is_empty() {
        top.push(Segment::Text(rest.to_string()));
    }
    Ok(top)
}

fn escape(value: &str) -> String {
    html! { (value) }.into_string()
}

fn render_segments(segments: &[Segment], items: &[&Item], current: Option<&Item>, out: &mut String) {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Count => out.push_str(&items.len().to_string()),
            Segment::Field(field) => {
                if let Some(item) = current {
                    out.push_str(&escape(&field.value(item)));
                }
            }
            Segment::Items(inner) => {
                for item in items {
                    render_segments(inner, items, Some(item), out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in template
// ---------------------------------------------------------------------------

struct BuiltinResults<'a> {
    items: &'a [&'a Item],
}

impl Render for BuiltinResults<'_> {
    fn render(&self) -> Markup {
        html! {
            @for item in self.items {
                div class="live-search-result" data-kind=(item.kind) {
                    p {
                        a href=(item.permalink) {
                            (item.title) " »"
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Template selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ThemeTemplate {
    path: PathBuf,
    segments: Vec<Segment>,
}

/// The results template chosen at startup.
#[derive(Debug, Clone, Default)]
pub struct ResultsTemplate {
    theme: Option<ThemeTemplate>,
}

impl ResultsTemplate {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Use the theme override under `theme_dir` if it exists, else the built-in template.
    pub fn resolve(theme_dir: Option<&Path>) -> Result<Self, LoadError> {
        let Some(path) = theme_dir.map(|dir| dir.join(THEME_TEMPLATE)).filter(|p| p.is_file()) else {
            info!("Using built-in results template");
            return Ok(Self::builtin());
        };
        let source = std::fs::read_to_string(&path)
            .map_err(|source| LoadError::Io { path: path.clone(), source })?;
        let template = Self::from_source(&path, &source)?;
        info!(file = %path.display(), "Using theme results template");
        Ok(template)
    }

    pub fn from_source(path: &Path, source: &str) -> Result<Self, LoadError> {
        let segments =
            parse(source).map_err(|reason| LoadError::Template { path: path.to_path_buf(), reason })?;
        Ok(Self { theme: Some(ThemeTemplate { path: path.to_path_buf(), segments }) })
    }

    pub fn source_name(&self) -> &'static str {
        if self.theme.is_some() {
            "theme"
        } else {
            "builtin"
        }
    }

    /// Theme file in use, if any.
    pub fn theme_path(&self) -> Option<&Path> {
        self.theme.as_ref().map(|t| t.path.as_path())
    }

    /// Render the matched items in order. No items renders nothing.
    pub fn render(&self, items: &[&Item]) -> String {
        if items.is_empty() {
            return String::new();
        }
        match &self.theme {
            None => BuiltinResults { items }.render().into_string(),
            Some(theme) => {
                let mut out = String::new();
                render_segments(&theme.segments, items, None, &mut out);
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, title: &str) -> Item {
        Item {
            id,
            kind: "page".into(),
            title: title.into(),
            excerpt: "An <em>excerpt</em>".into(),
            content: String::new(),
            permalink: format!("/page/{id}"),
            date: Some("2024-05-01".into()),
        }
    }

    #[test]
    fn builtin_renders_items_in_order_and_escapes() {
        let a = item(1, "Fish & Chips");
        let b = item(2, "Second");
        let html = ResultsTemplate::builtin().render(&[&a, &b]);
        assert!(html.contains("Fish &amp; Chips"));
        assert!(html.contains("href=\"/page/1\""));
        assert!(html.find("/page/1").unwrap() < html.find("/page/2").unwrap());
        assert_eq!(html.matches("live-search-result").count(), 2);
    }

    #[test]
    fn builtin_markup_is_plain() {
        let a = item(1, "Plain");
        let html = ResultsTemplate::builtin().render(&[&a]);
        assert_eq!(
            html,
            "<div class=\"live-search-result\" data-kind=\"page\"><p><a href=\"/page/1\">Plain »</a></p></div>"
        );
    }

    #[test]
    fn zero_items_render_nothing() {
        assert_eq!(ResultsTemplate::builtin().render(&[]), "");
        let theme = ResultsTemplate::from_source(Path::new("t.html"), "<ul>{{#items}}<li>{{title}}</li>{{/items}}</ul>")
            .unwrap();
        assert_eq!(theme.render(&[]), "");
    }

    #[test]
    fn theme_sections_repeat_per_item() {
        let theme = ResultsTemplate::from_source(
            Path::new("t.html"),
            "<p>{{count}} hits</p><ul>{{#items}}<li data-id=\"{{ id }}\">{{title}}: {{excerpt}}</li>{{/items}}</ul>",
        )
        .unwrap();
        let a = item(1, "One");
        let b = item(2, "Two");
        assert_eq!(
            theme.render(&[&a, &b]),
            "<p>2 hits</p><ul><li data-id=\"1\">One: An &lt;em&gt;excerpt&lt;/em&gt;</li>\
             <li data-id=\"2\">Two: An &lt;em&gt;excerpt&lt;/em&gt;</li></ul>"
        );
    }

    #[test]
    fn malformed_themes_are_rejected() {
        for source in ["{{#items}}", "{{/items}}", "{{nope}}", "{{title}}", "{{#items}}{{#items}}", "{{title"] {
            let err = ResultsTemplate::from_source(Path::new("bad.html"), source);
            assert!(matches!(err, Err(LoadError::Template { .. })), "accepted {source:?}");
        }
    }

    #[test]
    fn resolve_prefers_theme_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ResultsTemplate::resolve(Some(dir.path())).unwrap().source_name(), "builtin");

        std::fs::create_dir_all(dir.path().join("live-search")).unwrap();
        std::fs::write(dir.path().join(THEME_TEMPLATE), "{{#items}}{{permalink}}{{/items}}").unwrap();
        let template = ResultsTemplate::resolve(Some(dir.path())).unwrap();
        assert_eq!(template.source_name(), "theme");
        assert_eq!(template.theme_path(), Some(dir.path().join(THEME_TEMPLATE).as_path()));
        let a = item(9, "x");
        assert_eq!(template.render(&[&a]), "/page/9");
    }
}
