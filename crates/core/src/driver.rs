//! Tokio event loop around a [`LiveSearchController`].
//!
//! The driver owns the controller and a [`PageLayout`] describing the input's
//! surroundings. Callers push [`DriverEvent`]s through a [`DriverHandle`] and
//! observe the panel through a watch channel of [`PanelSnapshot`]s, and the
//! input's value through a second one, since dismissal empties it. Debounce
//! timers are spawned sleeps, aborted on cancel; requests go through a
//! [`Transport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::controller::{LiveSearchController, ResponseOutcome};
use crate::host::{Host, InputGeometry, PanelMetrics, PointerTarget, RequestId, SearchForm, TimerId};
use crate::panel::PanelSnapshot;
use crate::request::SearchRequest;
use crate::transport::Transport;

#[derive(Debug, Error)]
#[error("live search driver has shut down")]
pub struct DriverClosed;

/// Layout and form state of the page around the bound input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub input: InputGeometry,
    pub panel: PanelMetrics,
    pub form: Option<SearchForm>,
}

/// Events a caller can feed into the driver.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    Input(String),
    /// The viewport changed; carries the new layout.
    Resize { input: InputGeometry, panel: PanelMetrics },
    PointerDown(PointerTarget),
    SetEngine(String),
    Shutdown,
}

enum Internal {
    Timer(TimerId),
    Response(RequestId, ResponseOutcome),
}

// ---------------------------------------------------------------------------
// Host implementation
// ---------------------------------------------------------------------------

struct TokioHost<T: Transport> {
    layout: PageLayout,
    transport: Arc<T>,
    internal: mpsc::UnboundedSender<Internal>,
    input_value: watch::Sender<String>,
    timers: HashMap<TimerId, JoinHandle<()>>,
    next_timer: u64,
}

impl<T: Transport> Host for TokioHost<T> {
    fn input_geometry(&self) -> InputGeometry {
        self.layout.input
    }

    fn panel_metrics(&self) -> PanelMetrics {
        self.layout.panel
    }

    fn form(&self) -> Option<SearchForm> {
        self.layout.form.clone()
    }

    fn clear_input(&mut self) {
        self.input_value.send_replace(String::new());
    }

    fn start_timer(&mut self, delay: Duration) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        let tx = self.internal.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Internal::Timer(id));
        });
        self.timers.insert(id, handle);
        id
    }

    fn cancel_timer(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }

    fn send(&mut self, id: RequestId, request: SearchRequest) {
        let transport = Arc::clone(&self.transport);
        let tx = self.internal.clone();
        tokio::spawn(async move {
            let outcome = transport.send(request).await;
            let _ = tx.send(Internal::Response(id, outcome));
        });
    }
}

impl<T: Transport> Drop for TokioHost<T> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct LiveSearchDriver;

impl LiveSearchDriver {
    /// Bind a controller to `layout` and run it on the current tokio runtime.
    pub fn spawn<T: Transport>(config: SearchConfig, layout: PageLayout, transport: T) -> DriverHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = watch::channel(String::new());

        let mut host = TokioHost {
            layout,
            transport: Arc::new(transport),
            internal: internal_tx,
            input_value: input_tx,
            timers: HashMap::new(),
            next_timer: 0,
        };
        let controller = LiveSearchController::bind(config, &mut host);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        let task = tokio::spawn(run(controller, host, events_rx, internal_rx, snapshot_tx));

        DriverHandle { events: events_tx, snapshots: snapshot_rx, input_value: input_rx, task }
    }
}

async fn run<T: Transport>(
    mut controller: LiveSearchController,
    mut host: TokioHost<T>,
    mut events: mpsc::UnboundedReceiver<DriverEvent>,
    mut internal: mpsc::UnboundedReceiver<Internal>,
    snapshots: watch::Sender<PanelSnapshot>,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    DriverEvent::Input(value) => {
                        host.input_value.send_replace(value.clone());
                        controller.on_input(value, &mut host);
                    }
                    DriverEvent::Resize { input, panel } => {
                        host.layout.input = input;
                        host.layout.panel = panel;
                        controller.on_resize(&mut host);
                    }
                    DriverEvent::PointerDown(target) => controller.on_pointer_down(target, &mut host),
                    DriverEvent::SetEngine(engine) => controller.set_engine(engine),
                    DriverEvent::Shutdown => break,
                }
            }
            Some(msg) = internal.recv() => match msg {
                Internal::Timer(id) => {
                    host.timers.remove(&id);
                    controller.on_timer(id, &mut host);
                }
                Internal::Response(id, outcome) => controller.on_response(id, outcome, &mut host),
            },
        }

        let next = controller.snapshot();
        snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
    debug!(panel = controller.panel().id(), "Live search driver stopped");
}

/// Handle to a running driver. Dropping it stops the driver.
pub struct DriverHandle {
    events: mpsc::UnboundedSender<DriverEvent>,
    snapshots: watch::Receiver<PanelSnapshot>,
    input_value: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    pub fn send(&self, event: DriverEvent) -> Result<(), DriverClosed> {
        self.events.send(event).map_err(|_| DriverClosed)
    }

    pub fn input(&self, value: impl Into<String>) -> Result<(), DriverClosed> {
        self.send(DriverEvent::Input(value.into()))
    }

    pub fn resize(&self, input: InputGeometry, panel: PanelMetrics) -> Result<(), DriverClosed> {
        self.send(DriverEvent::Resize { input, panel })
    }

    pub fn pointer_down(&self, target: PointerTarget) -> Result<(), DriverClosed> {
        self.send(DriverEvent::PointerDown(target))
    }

    pub fn set_engine(&self, engine: impl Into<String>) -> Result<(), DriverClosed> {
        self.send(DriverEvent::SetEngine(engine.into()))
    }

    /// Latest published panel state.
    pub fn snapshot(&self) -> PanelSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.snapshots.clone()
    }

    /// What the input currently holds: the last value fed in, or empty after a dismissal.
    pub fn input_value(&self) -> String {
        self.input_value.borrow().clone()
    }

    /// Follow the input's value. Callers mirroring a real input should apply
    /// every change, including the clear on dismissal.
    pub fn subscribe_input(&self) -> watch::Receiver<String> {
        self.input_value.clone()
    }

    /// Wait until the panel satisfies `ready`, giving up after `timeout`.
    pub async fn wait_for(
        &self,
        timeout: Duration,
        mut ready: impl FnMut(&PanelSnapshot) -> bool,
    ) -> Option<PanelSnapshot> {
        let mut rx = self.snapshots.clone();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|s| ready(s))).await;
        match waited {
            Ok(Ok(snapshot)) => Some((*snapshot).clone()),
            _ => None,
        }
    }

    /// Stop the driver and wait for its task to finish.
    pub async fn shutdown(self) {
        let _ = self.events.send(DriverEvent::Shutdown);
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                info!(error = %e, "Live search driver task ended abnormally");
            }
        }
    }
}
