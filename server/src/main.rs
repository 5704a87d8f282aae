//! livesearch binary: thin CLI shell over the [`livesearch_server`] library crate.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use livesearch_server::{api, build_context, load_config};

// ---------------------------------------------------------------------------
// CLI definition (clap derive)
// ---------------------------------------------------------------------------

/// Live search gateway: answers debounced search-as-you-type requests with rendered result fragments.
#[derive(Parser)]
#[command(name = "livesearch", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Gateway config file
    #[arg(long, default_value = "livesearch.toml")]
    config: PathBuf,

    /// JSON catalog of searchable items (overrides the config file)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Theme directory with an optional live-search/search-results.html (overrides the config file)
    #[arg(long)]
    theme_dir: Option<PathBuf>,

    /// Directory of static host pages to serve alongside the gateway
    #[arg(long)]
    public: Option<PathBuf>,

    /// Bind to 0.0.0.0 instead of 127.0.0.1 (localhost)
    #[arg(long)]
    bind_all: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Graceful shutdown signal
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not register SIGTERM handler");
                let _ = ctrl_c.await;
                info!("Received SIGINT, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("livesearch=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "livesearch", &mut std::io::stdout());
        return;
    }

    let mut config = load_config(&cli.config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to load config");
        std::process::exit(1);
    });
    if let Some(catalog) = cli.catalog {
        config.catalog = Some(catalog);
    }
    if let Some(theme_dir) = cli.theme_dir {
        config.theme_dir = Some(theme_dir);
    }
    let endpoint = config.endpoint.clone();

    let ctx = build_context(config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to start gateway");
        std::process::exit(1);
    });

    // Bind address: 127.0.0.1 by default, --bind-all for 0.0.0.0
    let bind_addr = if cli.bind_all { "0.0.0.0" } else { "127.0.0.1" };

    let explicit_port: Option<u16> = std::env::var("PORT").ok().and_then(|p| p.parse().ok());

    let listener = if let Some(port) = explicit_port {
        tokio::net::TcpListener::bind(format!("{bind_addr}:{port}")).await.unwrap_or_else(|e| {
            error!(port = port, error = %e, "Could not bind to port");
            eprintln!("  PORT={port} was set explicitly. Choose a different port.");
            std::process::exit(1);
        })
    } else {
        const BASE: u16 = 8432;
        const RANGE: u16 = 10;
        let mut found = None;
        for port in BASE..BASE + RANGE {
            if let Ok(l) = tokio::net::TcpListener::bind(format!("{bind_addr}:{port}")).await {
                found = Some(l);
                break;
            }
        }
        found.unwrap_or_else(|| {
            error!(range_start = BASE, range_end = BASE + RANGE - 1, "No free port found");
            eprintln!("  Try: PORT=<port> livesearch");
            std::process::exit(1);
        })
    };

    let port = match listener.local_addr() {
        Ok(addr) => addr.port(),
        Err(e) => {
            error!(error = %e, "Listener has no local address");
            std::process::exit(1);
        }
    };

    let mut app = api::router(ctx);
    if let Some(public) = &cli.public {
        info!(dir = %public.display(), "Serving static pages");
        app = app.fallback_service(ServeDir::new(public));
    }
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    info!(endpoint = %endpoint, "Live search endpoint ready");
    info!(port = port, "http://localhost:{port}");
    eprintln!("LIVESEARCH_PORT={port}");

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
