//! livesearch-core: the client side of live search.
//!
//! A [`LiveSearchController`] turns keystrokes on one input into debounced
//! search requests and keeps a floating [`ResultsPanel`] in sync with the
//! responses. The controller is sans-IO: layout queries, timers and network
//! are delegated to a [`Host`]. [`LiveSearchDriver`] is a ready-made tokio
//! host with an HTTP [`Transport`].

pub mod config;
pub mod controller;
pub mod driver;
pub mod host;
pub mod panel;
pub mod request;
pub mod spinner;
pub mod transport;

pub use config::{
    ConfigError, ConfigRegistry, InputAttributes, InputConfig, Offset, PanelWidth, Placement, ResultsConfig,
    SearchConfig, SpinnerConfig,
};
pub use controller::{ControllerState, LiveSearchController, ResponseOutcome};
pub use driver::{DriverClosed, DriverEvent, DriverHandle, LiveSearchDriver, PageLayout};
pub use host::{Host, InputGeometry, PanelMetrics, PointerTarget, RequestId, SearchForm, TimerId};
pub use panel::{PanelContent, PanelSnapshot, PanelStyle, ResultsPanel, NOT_FOUND_CLASS};
pub use request::{normalize_fragment, SearchRequest, ACTION};
pub use spinner::LoadingIndicator;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{Transport, TransportError};
