//! Live search input controller.
//!
//! One controller is bound to one input and owns that input's configuration,
//! results panel and state record. It reacts to discrete events (input
//! change, timer expiry, request completion, resize, pointer-down) and never
//! blocks; every effect is delegated to the [`Host`].
//!
//! Lifecycle of a search:
//!
//! 1. Every input change cancels the pending debounce timer and, if the trimmed
//!    value is new and long enough, schedules a fresh one.
//! 2. When a timer fires, the request payload is built from the enclosing form
//!    and dispatched, unless the panel already says "no results" for a prefix
//!    of the current value.
//! 3. Completion always stops the loading indicator. Successful content is
//!    applied only if it answers the latest request and the panel was not
//!    dismissed in the meantime.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::host::{Host, PointerTarget, RequestId, TimerId};
use crate::panel::{PanelSnapshot, ResultsPanel};
use crate::request::{normalize_fragment, SearchRequest};

/// Outcome of a dispatched request as reported by the host.
pub type ResponseOutcome = Result<String, crate::TransportError>;

/// Mutable per-input state. Owned by exactly one controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    /// The single live debounce timer, if any.
    pub pending_timer: Option<TimerId>,
    /// Trimmed value of the last dispatched search.
    pub last_submitted: String,
    pub results_showing: bool,
    pub loading_showing: bool,
    /// Set once a search is dispatched; cleared on dismissal.
    pub has_results: bool,
    /// Whether the last applied response was a "no results" fragment. Survives
    /// the transient clear while a follow-up query is loading.
    pub last_not_found: bool,
    latest_request: Option<RequestId>,
    /// Bumped on every dismissal, so responses dispatched before it are dropped.
    dismissals: u64,
    in_flight: Vec<(RequestId, u64)>,
}

pub struct LiveSearchController {
    config: SearchConfig,
    panel: ResultsPanel,
    state: ControllerState,
    value: String,
    /// Last fragment applied to the panel, restored when a search is skipped.
    rendered: Option<String>,
    next_request: u64,
}

impl LiveSearchController {
    /// Bind to an input: turn off native autocomplete, create the panel and
    /// place it under the input.
    pub fn bind<H: Host>(config: SearchConfig, host: &mut H) -> Self {
        host.disable_autocomplete();
        let panel = ResultsPanel::new(config.spinner.clone());
        let mut controller = Self {
            config,
            panel,
            state: ControllerState::default(),
            value: String::new(),
            rendered: None,
            next_request: 0,
        };
        controller.position_panel(host);
        debug!(panel = controller.panel.id(), engine = %controller.config.engine, "Bound live search input");
        controller
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn panel(&self) -> &ResultsPanel {
        &self.panel
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Current value of the bound input.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        self.panel.snapshot()
    }

    /// Engine override after binding; the only configuration change allowed.
    pub fn set_engine(&mut self, engine: impl Into<String>) {
        self.config.engine = engine.into();
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// The input's value changed.
    pub fn on_input<H: Host>(&mut self, value: impl Into<String>, host: &mut H) {
        self.value = value.into();
        let trimmed = self.value.trim().to_string();

        if !self.value.is_empty() && !self.state.results_showing {
            self.position_panel(host);
            self.panel.show();
            self.show_loading();
            self.state.results_showing = true;
        }

        // Stale results go away as soon as the query diverges from them.
        if self.state.has_results && !self.state.loading_showing && self.state.last_submitted != trimmed {
            self.panel.clear();
            self.show_loading();
        }

        self.maybe_schedule(&trimmed, host);
    }

    /// A debounce timer elapsed. Timers other than the pending one are ignored.
    pub fn on_timer<H: Host>(&mut self, id: TimerId, host: &mut H) {
        if self.state.pending_timer != Some(id) {
            debug!(timer = id.0, "Ignoring superseded timer");
            return;
        }
        self.state.pending_timer = None;
        self.search(host);
    }

    /// A dispatched request finished.
    pub fn on_response<H: Host>(&mut self, id: RequestId, outcome: ResponseOutcome, host: &mut H) {
        let dispatched_epoch = self
            .state
            .in_flight
            .iter()
            .position(|(rid, _)| *rid == id)
            .map(|idx| self.state.in_flight.swap_remove(idx).1);

        self.hide_loading();

        let body = match outcome {
            Ok(body) => body,
            Err(e) => {
                warn!(request = id.0, error = %e, "Live search request failed");
                return;
            }
        };

        if dispatched_epoch != Some(self.state.dismissals) {
            debug!(request = id.0, "Discarding response that arrived after dismissal");
            return;
        }
        if self.state.latest_request != Some(id) {
            debug!(request = id.0, "Discarding response to a superseded request");
            return;
        }

        self.position_panel(host);
        let fragment = normalize_fragment(&body);
        self.panel.set_fragment(fragment.clone());
        self.rendered = Some(fragment);
        self.state.last_not_found = self.panel.is_not_found();
        debug!(request = id.0, not_found = self.state.last_not_found, "Rendered live search results");
    }

    /// The viewport was resized or scrolled.
    pub fn on_resize<H: Host>(&mut self, host: &mut H) {
        self.position_panel(host);
    }

    /// A pointer went down somewhere in the document.
    pub fn on_pointer_down<H: Host>(&mut self, target: PointerTarget, host: &mut H) {
        match target {
            PointerTarget::Input | PointerTarget::Panel => {}
            PointerTarget::Outside => self.dismiss(host),
        }
    }

    /// Clear the input and tear down everything the panel shows.
    pub fn dismiss<H: Host>(&mut self, host: &mut H) {
        if let Some(timer) = self.state.pending_timer.take() {
            host.cancel_timer(timer);
        }
        self.value.clear();
        host.clear_input();
        self.panel.stop_loading();
        self.panel.clear();
        self.panel.hide();
        self.state.loading_showing = false;
        self.state.results_showing = false;
        self.state.has_results = false;
        self.state.last_not_found = false;
        self.state.last_submitted.clear();
        self.rendered = None;
        self.state.dismissals += 1;
        debug!(panel = self.panel.id(), "Dismissed live search results");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn maybe_schedule<H: Host>(&mut self, trimmed: &str, host: &mut H) {
        if let Some(timer) = self.state.pending_timer.take() {
            host.cancel_timer(timer);
        }

        if self.state.last_submitted != trimmed && trimmed.chars().count() >= self.config.input.min_chars {
            let delay = Duration::from_millis(self.config.input.delay_ms);
            let timer = host.start_timer(delay);
            self.state.pending_timer = Some(timer);
            debug!(timer = timer.0, delay_ms = self.config.input.delay_ms, "Scheduled live search");
        }
    }

    fn search<H: Host>(&mut self, host: &mut H) {
        // Appending to a query that already found nothing cannot find more.
        // Narrowing by deletion is not detected.
        if self.state.last_not_found && self.value.contains(self.state.last_submitted.as_str()) {
            debug!(query = %self.value, last = %self.state.last_submitted, "Skipping search that extends a failed query");
            self.hide_loading();
            if let Some(fragment) = self.rendered.clone() {
                self.panel.set_fragment(fragment);
            }
            return;
        }

        let form = host.form();
        let request = SearchRequest::build(form.as_ref(), &self.config.engine, &self.value);

        self.state.last_submitted = self.value.trim().to_string();
        self.state.has_results = true;
        self.state.last_not_found = false;

        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.state.latest_request = Some(id);
        self.state.in_flight.push((id, self.state.dismissals));

        debug!(request = id.0, query = %self.value, engine = %self.config.engine, "Dispatching live search");
        host.send(id, request);
    }

    fn position_panel<H: Host>(&mut self, host: &H) {
        let input = host.input_geometry();
        let metrics = host.panel_metrics();
        self.panel.position(&self.config.results, input, metrics);
    }

    fn show_loading(&mut self) {
        if !self.state.loading_showing && self.panel.start_loading() {
            self.state.loading_showing = true;
        }
    }

    fn hide_loading(&mut self) {
        self.panel.stop_loading();
        self.state.loading_showing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Placement, SpinnerConfig};
    use crate::host::{InputGeometry, PanelMetrics, SearchForm};
    use crate::panel::PanelContent;
    use crate::TransportError;

    /// Records every effect; timers and requests are completed by hand.
    #[derive(Default)]
    struct MockHost {
        geometry: InputGeometry,
        metrics: PanelMetrics,
        form: Option<SearchForm>,
        autocomplete_disabled: bool,
        /// What the page's input element shows.
        input: String,
        next_timer: u64,
        live_timers: Vec<TimerId>,
        started: Vec<(TimerId, Duration)>,
        sent: Vec<(RequestId, SearchRequest)>,
    }

    impl MockHost {
        fn new() -> Self {
            Self {
                geometry: InputGeometry { left: 10.0, top: 20.0, outer_width: 200.0, outer_height: 30.0 },
                metrics: PanelMetrics { height: 50.0, padding_left: 5.0, padding_right: 5.0 },
                form: Some(SearchForm::new("/").with_input_name("s")),
                ..Self::default()
            }
        }

        /// Fire the single live timer, as the event loop would after its delay.
        fn fire(&mut self, controller: &mut LiveSearchController) {
            assert_eq!(self.live_timers.len(), 1, "expected exactly one live timer");
            let id = self.live_timers.remove(0);
            controller.on_timer(id, self);
        }

        fn queries(&self) -> Vec<String> {
            self.sent.iter().map(|(_, r)| r.query().unwrap_or_default().to_string()).collect()
        }
    }

    impl Host for MockHost {
        fn input_geometry(&self) -> InputGeometry {
            self.geometry
        }

        fn panel_metrics(&self) -> PanelMetrics {
            self.metrics
        }

        fn form(&self) -> Option<SearchForm> {
            self.form.clone()
        }

        fn disable_autocomplete(&mut self) {
            self.autocomplete_disabled = true;
        }

        fn clear_input(&mut self) {
            self.input.clear();
        }

        fn start_timer(&mut self, delay: Duration) -> TimerId {
            self.next_timer += 1;
            let id = TimerId(self.next_timer);
            self.live_timers.push(id);
            self.started.push((id, delay));
            id
        }

        fn cancel_timer(&mut self, id: TimerId) {
            self.live_timers.retain(|t| *t != id);
        }

        fn send(&mut self, id: RequestId, request: SearchRequest) {
            self.sent.push((id, request));
        }
    }

    fn bind(host: &mut MockHost) -> LiveSearchController {
        LiveSearchController::bind(SearchConfig::default(), host)
    }

    /// Append to the page's input one character at a time, reporting each change.
    fn type_str(controller: &mut LiveSearchController, host: &mut MockHost, text: &str) {
        for ch in text.chars() {
            host.input.push(ch);
            let value = host.input.clone();
            controller.on_input(value, host);
        }
    }

    #[test]
    fn bind_disables_autocomplete_and_positions_hidden_panel() {
        let mut host = MockHost::new();
        let controller = bind(&mut host);
        assert!(host.autocomplete_disabled);
        assert!(!controller.panel().is_visible());
        assert_eq!(controller.panel().style().top, 20.0 + 5.0 + 30.0);
        assert_eq!(controller.panel().style().width, Some(190.0));
    }

    #[test]
    fn short_values_never_schedule() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "ab");
        assert!(host.live_timers.is_empty());
        assert!(host.sent.is_empty());
        // Whitespace does not count towards the minimum.
        controller.on_input("ab   ", &mut host);
        assert!(host.live_timers.is_empty());
    }

    #[test]
    fn min_chars_scenario_fires_once_with_final_value() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "ab");
        assert!(host.live_timers.is_empty());
        type_str(&mut controller, &mut host, "c");
        assert_eq!(host.started.last().map(|(_, d)| *d), Some(Duration::from_millis(500)));
        host.fire(&mut controller);
        assert_eq!(host.queries(), vec!["abc"]);
    }

    #[test]
    fn keystrokes_inside_window_keep_one_timer() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "rustacean");
        assert_eq!(host.live_timers.len(), 1);
        assert_eq!(host.started.len(), "rustacean".len() - 2);
        host.fire(&mut controller);
        assert_eq!(host.queries(), vec!["rustacean"]);
    }

    #[test]
    fn superseded_timer_is_ignored() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        let stale = host.started[0].0;
        type_str(&mut controller, &mut host, "d");
        controller.on_timer(stale, &mut host);
        assert!(host.sent.is_empty());
        host.fire(&mut controller);
        assert_eq!(host.queries(), vec!["abcd"]);
    }

    #[test]
    fn same_trimmed_query_is_not_resubmitted() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        controller.on_response(id, Ok("<p>hit</p>".into()), &mut host);

        controller.on_input("abc ", &mut host);
        controller.on_input("abc", &mut host);
        assert!(host.live_timers.is_empty());
        assert_eq!(host.sent.len(), 1);
    }

    #[test]
    fn first_keystroke_shows_panel_and_loading() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        controller.on_input("a", &mut host);
        assert!(controller.panel().is_visible());
        assert!(controller.panel().is_loading());
        assert!(controller.state().results_showing);
        assert!(controller.state().loading_showing);
    }

    #[test]
    fn success_renders_fragment_and_hides_loading() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();

        host.geometry.left = 42.0;
        controller.on_response(id, Ok("<ul><li>one</li></ul>".into()), &mut host);

        assert!(!controller.panel().is_loading());
        assert_eq!(controller.panel().content(), &PanelContent::Fragment("<ul><li>one</li></ul>".into()));
        assert_eq!(controller.panel().style().left, 42.0);
    }

    #[test]
    fn zero_body_renders_as_empty_content() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        controller.on_response(id, Ok("0".into()), &mut host);
        assert_eq!(controller.panel().content(), &PanelContent::Fragment(String::new()));
    }

    #[test]
    fn failure_hides_loading_and_keeps_content() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        controller.on_response(id, Err(TransportError::Status(500)), &mut host);
        assert!(!controller.panel().is_loading());
        assert!(!controller.state().loading_showing);
        assert_eq!(controller.panel().content(), &PanelContent::Cleared);
    }

    #[test]
    fn changing_query_after_results_clears_and_shows_loading() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        controller.on_response(id, Ok("<p>abc</p>".into()), &mut host);

        type_str(&mut controller, &mut host, "d");
        assert_eq!(controller.panel().content(), &PanelContent::Cleared);
        assert!(controller.panel().is_loading());
    }

    #[test]
    fn outside_click_dismisses_regardless_of_state() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        controller.on_response(id, Ok("<p>abc</p>".into()), &mut host);

        controller.on_pointer_down(PointerTarget::Input, &mut host);
        controller.on_pointer_down(PointerTarget::Panel, &mut host);
        assert!(controller.panel().is_visible());

        controller.on_pointer_down(PointerTarget::Outside, &mut host);
        assert_eq!(controller.value(), "");
        assert!(!controller.panel().is_visible());
        assert!(!controller.panel().is_loading());
        assert_eq!(controller.panel().content(), &PanelContent::Cleared);
        assert!(!controller.state().has_results);
        assert!(!controller.state().results_showing);

        // Dismissing an idle controller is harmless.
        controller.on_pointer_down(PointerTarget::Outside, &mut host);
        assert!(!controller.panel().is_visible());
    }

    #[test]
    fn dismissal_empties_the_page_input() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        assert_eq!(host.input, "abc");

        controller.on_pointer_down(PointerTarget::Outside, &mut host);
        assert_eq!(host.input, "");
        assert_eq!(controller.value(), "");

        // Typing again starts from an empty input, so "d" stays below the minimum.
        type_str(&mut controller, &mut host, "d");
        assert_eq!(controller.value(), "d");
        assert!(host.live_timers.is_empty());
        assert!(host.sent.is_empty());
    }

    #[test]
    fn dismissal_cancels_pending_timer() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        controller.dismiss(&mut host);
        assert!(host.live_timers.is_empty());
        assert!(controller.state().pending_timer.is_none());
    }

    #[test]
    fn late_response_after_dismissal_is_discarded() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        assert!(controller.panel().is_loading());

        controller.on_pointer_down(PointerTarget::Outside, &mut host);
        assert!(!controller.panel().is_loading());
        assert_eq!(controller.panel().content(), &PanelContent::Cleared);

        controller.on_response(id, Ok("<p>late</p>".into()), &mut host);
        assert!(!controller.panel().is_loading());
        assert_eq!(controller.panel().content(), &PanelContent::Cleared);
    }

    #[test]
    fn same_query_after_dismissal_searches_again() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        controller.dismiss(&mut host);

        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        assert_eq!(host.queries(), vec!["abc", "abc"]);
    }

    #[test]
    fn superseded_response_does_not_overwrite_fresher_content() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "abc");
        host.fire(&mut controller);
        type_str(&mut controller, &mut host, "d");
        host.fire(&mut controller);
        let first = host.sent[0].0;
        let second = host.sent[1].0;

        controller.on_response(second, Ok("<p>abcd</p>".into()), &mut host);
        controller.on_response(first, Ok("<p>abc</p>".into()), &mut host);
        assert_eq!(controller.panel().content(), &PanelContent::Fragment("<p>abcd</p>".into()));
    }

    #[test]
    fn extending_a_failed_query_skips_the_request() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "no such term");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        controller.on_response(id, Ok(String::new()), &mut host);
        assert!(controller.panel().is_not_found());
        assert!(controller.state().last_not_found);

        type_str(&mut controller, &mut host, "x");
        host.fire(&mut controller);
        assert_eq!(host.sent.len(), 1);
        assert!(!controller.panel().is_loading());
        assert!(controller.panel().is_not_found());

        // An explicit not-found block counts the same way.
        controller.dismiss(&mut host);
        type_str(&mut controller, &mut host, "zzz");
        host.fire(&mut controller);
        let (id, _) = host.sent[1].clone();
        let block = format!("<p class=\"{}\">Nothing</p>", crate::panel::NOT_FOUND_CLASS);
        controller.on_response(id, Ok(block), &mut host);
        type_str(&mut controller, &mut host, "z");
        host.fire(&mut controller);
        assert_eq!(host.sent.len(), 2);
    }

    #[test]
    fn narrowing_a_failed_query_by_deletion_still_searches() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        type_str(&mut controller, &mut host, "no such term");
        host.fire(&mut controller);
        let (id, _) = host.sent[0].clone();
        controller.on_response(id, Ok(String::new()), &mut host);

        controller.on_input("no such ter", &mut host);
        host.fire(&mut controller);
        assert_eq!(host.queries(), vec!["no such term", "no such ter"]);
    }

    #[test]
    fn resize_recomputes_geometry() {
        let mut host = MockHost::new();
        let mut controller = bind(&mut host);
        host.geometry = InputGeometry { left: 300.0, top: 10.0, outer_width: 400.0, outer_height: 20.0 };
        controller.on_resize(&mut host);
        let style = controller.panel().style();
        assert_eq!(style.left, 300.0);
        assert_eq!(style.top, 10.0 + 5.0 + 20.0);
        assert_eq!(style.width, Some(390.0));
    }

    #[test]
    fn top_placement_uses_panel_height() {
        let mut host = MockHost::new();
        let mut config = SearchConfig::default();
        config.results.position = Placement::Top;
        let mut controller = LiveSearchController::bind(config, &mut host);
        host.metrics.height = 80.0;
        controller.on_resize(&mut host);
        assert_eq!(controller.panel().style().top, 20.0 + 5.0 - 80.0);
    }

    #[test]
    fn request_carries_form_fields_and_engine() {
        let mut host = MockHost::new();
        host.form = Some(SearchForm::new("/find?site=2").with_input_name("s").with_field("lang", "fr"));
        let mut config = SearchConfig::default();
        config.spinner = Some(SpinnerConfig::default());
        let mut controller = LiveSearchController::bind(config, &mut host);
        controller.set_engine("docs");
        type_str(&mut controller, &mut host, "café");
        host.fire(&mut controller);

        let (_, req) = &host.sent[0];
        assert_eq!(req.get("s"), Some("café"));
        assert_eq!(req.get("lang"), Some("fr"));
        assert_eq!(req.get("site"), Some("2"));
        assert_eq!(req.engine(), Some("docs"));
        assert_eq!(req.get("action"), Some("live_search"));
    }

    #[test]
    fn without_spinner_loading_flag_stays_off() {
        let mut host = MockHost::new();
        let mut config = SearchConfig::default();
        config.spinner = None;
        let mut controller = LiveSearchController::bind(config, &mut host);
        controller.on_input("a", &mut host);
        assert!(controller.panel().is_visible());
        assert!(!controller.state().loading_showing);
    }
}
