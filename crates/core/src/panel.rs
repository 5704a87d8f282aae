//! The floating results panel attached to one bound input.
//!
//! The panel lives in document coordinates (it is appended to the document
//! body, never nested under the input's ancestors) so it cannot be clipped by
//! an `overflow: hidden` parent. Its id is unique per panel.

use serde::Serialize;

use crate::config::{PanelWidth, Placement, ResultsConfig, SpinnerConfig};
use crate::host::{InputGeometry, PanelMetrics};
use crate::spinner::LoadingIndicator;

/// Class a results fragment carries when it renders an explicit "nothing found" block.
pub const NOT_FOUND_CLASS: &str = "live-search-not-found";

/// Prefix of every panel id.
pub const PANEL_ID_PREFIX: &str = "livesearch-";

/// Computed inline style of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PanelStyle {
    pub left: f64,
    pub top: f64,
    /// `None` leaves the width to the stylesheet.
    pub width: Option<f64>,
}

/// What the panel currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "html", rename_all = "snake_case")]
pub enum PanelContent {
    /// Nothing has been rendered, or the content was emptied.
    #[default]
    Cleared,
    /// A fragment returned by the gateway. May be empty.
    Fragment(String),
}

#[derive(Debug, Clone)]
pub struct ResultsPanel {
    id: String,
    visible: bool,
    content: PanelContent,
    style: PanelStyle,
    indicator: Option<LoadingIndicator>,
}

impl ResultsPanel {
    /// Create a hidden, empty panel with a fresh unique id.
    pub fn new(spinner: Option<SpinnerConfig>) -> Self {
        Self {
            id: format!("{PANEL_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()),
            visible: false,
            content: PanelContent::Cleared,
            style: PanelStyle::default(),
            indicator: spinner.map(LoadingIndicator::new),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn content(&self) -> &PanelContent {
        &self.content
    }

    pub fn style(&self) -> PanelStyle {
        self.style
    }

    pub fn indicator(&self) -> Option<&LoadingIndicator> {
        self.indicator.as_ref()
    }

    pub fn has_indicator(&self) -> bool {
        self.indicator.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.indicator.as_ref().is_some_and(LoadingIndicator::is_spinning)
    }

    /// Recompute left/top/width from the input's current geometry.
    pub fn position(&mut self, config: &ResultsConfig, input: InputGeometry, metrics: PanelMetrics) {
        let left = input.left + config.offset.x;
        let anchor_top = input.top + config.offset.y;

        let top = match config.position {
            Placement::Top => anchor_top - metrics.height,
            Placement::Bottom => anchor_top + input.outer_height,
        };

        let width = match config.width {
            PanelWidth::Auto => {
                Some((input.outer_width - metrics.padding_left - metrics.padding_right).max(0.0))
            }
            PanelWidth::Fixed(px) => Some(px),
            PanelWidth::Stylesheet => None,
        };

        self.style = PanelStyle { left, top, width };
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Drop whatever is displayed.
    pub fn clear(&mut self) {
        self.content = PanelContent::Cleared;
    }

    /// Replace the content wholesale.
    pub fn set_fragment(&mut self, html: String) {
        self.content = PanelContent::Fragment(html);
    }

    /// Whether the panel displays a "no results" state: an empty response, or
    /// a fragment with an explicit not-found block.
    pub fn is_not_found(&self) -> bool {
        match &self.content {
            PanelContent::Cleared => false,
            PanelContent::Fragment(html) => {
                html.trim().is_empty() || html.contains(NOT_FOUND_CLASS)
            }
        }
    }

    /// Start the indicator. Returns `false` when the panel has none.
    pub fn start_loading(&mut self) -> bool {
        let id = self.id.clone();
        match self.indicator.as_mut() {
            Some(indicator) => {
                indicator.spin(&id);
                true
            }
            None => false,
        }
    }

    pub fn stop_loading(&mut self) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.stop();
        }
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            id: self.id.clone(),
            visible: self.visible,
            loading: self.is_loading(),
            style: self.style,
            content: self.content.clone(),
        }
    }
}

/// Point-in-time view of a panel, for renderers and observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub id: String,
    pub visible: bool,
    pub loading: bool,
    pub style: PanelStyle,
    pub content: PanelContent,
}
