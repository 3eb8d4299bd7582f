use axum::{
    routing::{get, post},
    Router,
};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use crate::config::{config_path, load_config, Config};
use crate::models::VideoRequest;
use crate::resolver::{build_http_client, LinkResolver};

// --- Modules ---
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod resolver;

// --- State Type Aliases ---
pub type ConfigState = Arc<RwLock<Config>>;

#[derive(Clone)]
pub struct AppState {
    pub config: ConfigState,
    pub config_path: Arc<PathBuf>,
    /// Shared connection pool for upstream calls.
    pub http: reqwest::Client,
}

// --- Command-Line Argument Parsing ---
#[derive(Parser, Debug)]
#[command(author, version, about = "A backend API that resolves TikTok links into no-watermark downloads.", long_about = None)]
struct Cli {
    /// Path to the config file (defaults to the per-user config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server in the foreground.
    Serve(ServeArgs),
    /// Resolve a single video URL and print the result as JSON.
    Resolve {
        /// The TikTok video URL.
        url: String,
    },
    /// Inspects the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind (overrides $HOST, default 0.0.0.0).
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides $PORT, default 8000).
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration as TOML.
    Show,
    /// Print the location of the config file.
    Path,
}

// --- Main Application Logic ---
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = config_path(cli.config_file).await?;

    match cli.command {
        Commands::Serve(args) => run_server(path, args).await?,
        Commands::Resolve { url } => resolve_once(path, &url).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", toml::to_string_pretty(&load_config(&path).await?)?),
            ConfigAction::Path => println!("{}", path.display()),
        },
    }

    Ok(())
}

/// Builds the router with every endpoint and the CORS and tracing layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/hello", get(handlers::hello))
        .route("/api/tiktok", post(handlers::resolve_tiktok))
        .route("/test", get(handlers::diagnostics))
        .route("/config", get(handlers::get_config).post(handlers::update_config))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The core function that runs the Axum web server.
async fn run_server(path: PathBuf, args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&path).await?;
    tracing::info!(
        "Using upstream {} (timeout {}s), config at {}",
        config.upstream_api_url,
        config.timeout_secs,
        path.display()
    );

    let state = AppState {
        config: Arc::new(RwLock::new(config)),
        config_path: Arc::new(path),
        http: build_http_client()?,
    };

    let host = args
        .host
        .unwrap_or_else(|| env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()));
    let port = match args.port {
        Some(port) => port,
        None => env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("PORT must be a valid port number: {}", e))?,
    };
    let addr = format!("{}:{}", host, port);

    tracing::info!("Starting server in foreground, listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Resolves one link from the terminal and prints the JSON result.
async fn resolve_once(path: PathBuf, raw_url: &str) -> anyhow::Result<()> {
    let config = load_config(&path).await?;
    let source = VideoRequest { url: raw_url.to_string() }
        .source_url()
        .map_err(anyhow::Error::msg)?;
    let resolver = LinkResolver::new(build_http_client()?, &config);
    let result = resolver.resolve(&source).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
