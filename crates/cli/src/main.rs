//! lsearch: command-line client for a live search gateway.
//!
//! `query` sends one request the way a bound input would. `type` feeds text
//! one character at a time through the real controller and driver, so the
//! debounce and panel lifecycle can be watched against a running gateway.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use livesearch_core::{
    normalize_fragment, ConfigRegistry, HttpTransport, InputAttributes, InputGeometry, LiveSearchDriver, PageLayout,
    PanelContent, PanelMetrics, PanelSnapshot, SearchConfig, SearchForm, SearchRequest, Transport,
};

/// Live search from the terminal.
#[derive(Parser)]
#[command(name = "lsearch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single live search request
    Query {
        /// Text as typed into the input
        text: String,

        /// Gateway endpoint URL
        #[arg(long)]
        endpoint: String,

        /// Search engine name
        #[arg(long)]
        engine: Option<String>,

        #[command(flatten)]
        form: FormArgs,
    },
    /// Type text character by character and print the panel as it changes
    Type {
        /// Text to type
        text: String,

        /// Gateway endpoint URL
        #[arg(long)]
        endpoint: String,

        /// Pause between keystrokes, in milliseconds
        #[arg(long, default_value = "50")]
        interval_ms: u64,

        /// TOML file of named alternate configurations
        #[arg(long)]
        config: Option<PathBuf>,

        /// Alternate configuration to use from --config
        #[arg(long, requires = "config")]
        config_name: Option<String>,

        /// Engine override
        #[arg(long)]
        engine: Option<String>,

        /// Give up if the panel has not settled after this many milliseconds
        #[arg(long, default_value = "10000")]
        timeout_ms: u64,

        #[command(flatten)]
        form: FormArgs,
    },
}

/// The enclosing form of the simulated input.
#[derive(Args)]
struct FormArgs {
    /// Form target URL; its query string is appended to the request
    #[arg(long)]
    form_action: Option<String>,

    /// Extra form control, as name=value (repeatable)
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// Name under which the input itself submits
    #[arg(long)]
    input_name: Option<String>,
}

impl FormArgs {
    fn to_form(&self) -> Option<SearchForm> {
        if self.form_action.is_none() && self.fields.is_empty() && self.input_name.is_none() {
            return None;
        }
        let mut form = SearchForm::new(self.form_action.clone().unwrap_or_default());
        for (name, value) in &self.fields {
            form = form.with_field(name.as_str(), value.as_str());
        }
        if let Some(name) = &self.input_name {
            form = form.with_input_name(name.as_str());
        }
        Some(form)
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, _)) if name.is_empty() => Err(format!("missing field name in '{raw}'")),
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(format!("expected name=value, got '{raw}'")),
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    endpoint: &'a str,
    request: &'a SearchRequest,
    fragment: String,
}

/// Geometry of the simulated input. Only relative placement matters here.
const INPUT: InputGeometry = InputGeometry { left: 0.0, top: 0.0, outer_width: 320.0, outer_height: 32.0 };

fn transport(endpoint: &str) -> HttpTransport {
    HttpTransport::new(endpoint).unwrap_or_else(|e| {
        eprintln!("Could not create HTTP client: {e}");
        std::process::exit(1);
    })
}

/// Whether `text` is too short to ever dispatch a search under `config`.
fn below_minimum(text: &str, config: &SearchConfig) -> bool {
    text.trim().chars().count() < config.input.min_chars
}

fn describe(snapshot: &PanelSnapshot) -> String {
    let state = match (snapshot.visible, snapshot.loading) {
        (true, true) => "visible, loading",
        (true, false) => "visible",
        (false, true) => "hidden, loading",
        (false, false) => "hidden",
    };
    let content = match &snapshot.content {
        PanelContent::Cleared => "(cleared)".to_string(),
        PanelContent::Fragment(html) if html.is_empty() => "(no results)".to_string(),
        PanelContent::Fragment(html) => html.clone(),
    };
    format!("[{state}] {content}")
}

async fn run_query(endpoint: String, engine: Option<String>, form: FormArgs, text: String, json: bool) {
    let engine = engine.unwrap_or_else(|| SearchConfig::default().engine);
    let request = SearchRequest::build(form.to_form().as_ref(), &engine, &text);
    tracing::debug!(fields = request.fields().len(), "Sending live search request");

    let body = match transport(&endpoint).send(request.clone()).await {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Live search failed: {e}");
            std::process::exit(1);
        }
    };
    let fragment = normalize_fragment(&body);

    if json {
        let output = QueryOutput { endpoint: &endpoint, request: &request, fragment };
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
    } else {
        if fragment.is_empty() {
            eprintln!("(no results)");
            std::process::exit(1);
        }
        println!("{fragment}");
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_type(
    endpoint: String,
    text: String,
    interval: Duration,
    config_path: Option<PathBuf>,
    config_name: Option<String>,
    engine: Option<String>,
    timeout: Duration,
    form: FormArgs,
    json: bool,
) {
    let registry = match &config_path {
        Some(path) => ConfigRegistry::load(path).unwrap_or_else(|e| {
            eprintln!("Could not load {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => ConfigRegistry::new(),
    };
    let mut attributes = InputAttributes::live();
    if let Some(name) = config_name {
        attributes = attributes.with_config(name);
    }
    if let Some(engine) = engine {
        attributes = attributes.with_engine(engine);
    }
    let config = attributes.resolve(&registry).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });
    if below_minimum(&text, &config) {
        if json {
            let output = serde_json::json!({ "text": text, "min_chars": config.input.min_chars, "searched": false });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        } else {
            println!("(below minimum length)");
        }
        return;
    }
    let delay = Duration::from_millis(config.input.delay_ms);

    let layout = PageLayout { input: INPUT, panel: PanelMetrics::default(), form: form.to_form() };
    let handle = LiveSearchDriver::spawn(config, layout, transport(&endpoint));

    // Prints every published snapshot until the driver goes away.
    let mut snapshots = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last: Option<PanelSnapshot> = None;
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if last.as_ref() == Some(&snapshot) {
                continue;
            }
            if json {
                println!("{}", serde_json::to_string(&snapshot).unwrap());
            } else {
                println!("{}", describe(&snapshot));
            }
            last = Some(snapshot);
        }
    });

    let mut typed = String::new();
    for ch in text.chars() {
        typed.push(ch);
        if handle.input(typed.as_str()).is_err() {
            eprintln!("Live search driver stopped unexpectedly");
            std::process::exit(1);
        }
        tokio::time::sleep(interval).await;
    }

    // Let the last debounce fire before waiting for the response.
    tokio::time::sleep(delay + Duration::from_millis(10)).await;
    let settled = handle.wait_for(timeout, |s| !s.loading).await;

    handle.shutdown().await;
    let _ = printer.await;

    if settled.is_none() {
        eprintln!("Panel did not settle within {} ms", timeout.as_millis());
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("livesearch=warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query { text, endpoint, engine, form } => {
            run_query(endpoint, engine, form, text, cli.json).await;
        }
        Commands::Type { text, endpoint, interval_ms, config, config_name, engine, timeout_ms, form } => {
            run_type(
                endpoint,
                text,
                Duration::from_millis(interval_ms),
                config,
                config_name,
                engine,
                Duration::from_millis(timeout_ms),
                form,
                cli.json,
            )
            .await;
        }
    }
}
