//! Contract between a controller and the page that hosts its input.
//!
//! The controller never touches a document directly. Everything it needs to
//! know about layout and form state, and everything it needs done (timers,
//! network), goes through [`Host`].

use std::time::Duration;

use crate::request::SearchRequest;

/// Identifies one scheduled debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Identifies one dispatched search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// Rendered geometry of the bound input, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputGeometry {
    pub left: f64,
    pub top: f64,
    /// Width including padding and border.
    pub outer_width: f64,
    /// Height including padding and border.
    pub outer_height: f64,
}

/// Rendered metrics of the results panel as the host currently lays it out.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelMetrics {
    /// Content height, needed for `top` placement.
    pub height: f64,
    pub padding_left: f64,
    pub padding_right: f64,
}

/// Where a pointer-down landed, relative to the input and its panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Input,
    Panel,
    Outside,
}

/// Snapshot of the input's nearest enclosing form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchForm {
    /// The form's target URL, possibly carrying its own query string.
    pub action: String,
    /// Every other successful control of the form, in document order.
    pub fields: Vec<(String, String)>,
    /// Name under which the bound input itself submits, if it has one.
    pub input_name: Option<String>,
}

impl SearchForm {
    pub fn new(action: impl Into<String>) -> Self {
        Self { action: action.into(), ..Self::default() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }
}

/// Page environment for one bound input.
pub trait Host {
    fn input_geometry(&self) -> InputGeometry;

    fn panel_metrics(&self) -> PanelMetrics;

    /// Nearest enclosing form, read at search time.
    fn form(&self) -> Option<SearchForm>;

    /// Turn off the browser's own suggestion dropdown for the input.
    fn disable_autocomplete(&mut self) {}

    /// Empty the input's value on the page.
    fn clear_input(&mut self);

    /// Arrange for [`crate::LiveSearchController::on_timer`] to be called after `delay`.
    fn start_timer(&mut self, delay: Duration) -> TimerId;

    fn cancel_timer(&mut self, id: TimerId);

    /// Send the request; the outcome comes back through
    /// [`crate::LiveSearchController::on_response`].
    fn send(&mut self, id: RequestId, request: SearchRequest);
}
