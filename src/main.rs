// Prompt Refiner
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use prompt_refiner::config::{load_settings, Settings};
use prompt_refiner::errors::{suggestion_for, wrap_error_with_suggestion};
use prompt_refiner::utils::sanitize_error_message;
use prompt_refiner::{RefineOptions, Refiner};

#[derive(Parser, Debug)]
#[command(name = "prompt-refiner")]
#[command(about = "Refine a prompt read from stdin through the refinement webhook", version)]
struct Args {
    /// Run mode
    #[command(subcommand)]
    command: Option<Command>,

    /// Webhook URL (overrides REFINER_WEBHOOK_URL)
    #[arg(long)]
    url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Send the prompt through the local daemon
    #[arg(long)]
    daemon: bool,

    /// Daemon socket path
    #[arg(long)]
    socket: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the caching daemon until SIGINT/SIGTERM
    Daemon {
        /// Socket to listen on
        #[arg(long)]
        socket: Option<PathBuf>,

        /// Cache entry lifetime in milliseconds
        #[arg(long = "cache-ttl-ms")]
        cache_ttl_ms: Option<u64>,

        /// Maximum cached prompts
        #[arg(long = "cache-max")]
        cache_max: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let settings = load_settings().context("Failed to load configuration")?;

    match args.command {
        Some(Command::Daemon {
            socket,
            cache_ttl_ms,
            cache_max,
        }) => run_daemon(settings, socket, cache_ttl_ms, cache_max).await,
        None => {
            let options = RefineOptions {
                url: args.url,
                timeout_ms: args.timeout_ms,
                use_daemon: args.daemon.then_some(true),
                socket_path: args.socket,
                ..Default::default()
            };
            run_refine(settings, options).await
        }
    }
}

/// Read stdin, refine, print the result to stdout
async fn run_refine(settings: Settings, options: RefineOptions) -> Result<()> {
    let mut input = String::new();
    if !io::stdin().is_terminal() {
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read prompt from stdin")?;
    }

    if input.trim().is_empty() {
        eprintln!("No prompt provided via stdin");
        std::process::exit(1);
    }

    let refiner = Refiner::new(settings)?;
    match refiner.refine(&input, &options).await {
        Ok(refined) => {
            println!("{}", refined);
            Ok(())
        }
        Err(e) => {
            let message = format!("Refining failed: {}", sanitize_error_message(e.message()));
            match suggestion_for(e.kind()) {
                Some(suggestion) => eprintln!("{}", wrap_error_with_suggestion(message, suggestion)),
                None => eprintln!("{}", message),
            }
            std::process::exit(1);
        }
    }
}

#[cfg(unix)]
async fn run_daemon(
    settings: Settings,
    socket: Option<PathBuf>,
    cache_ttl_ms: Option<u64>,
    cache_max: Option<usize>,
) -> Result<()> {
    use prompt_refiner::daemon::DaemonServer;
    use prompt_refiner::webhook::WebhookBackend;
    use std::sync::Arc;

    let mut config = settings.daemon;
    if let Some(socket) = socket {
        config.socket_path = socket;
    }
    if let Some(ttl) = cache_ttl_ms {
        config.cache_ttl_ms = ttl;
    }
    if let Some(max) = cache_max {
        config.cache_max_entries = max;
    }

    let backend = WebhookBackend::new(settings.refiner).context("Failed to create webhook client")?;
    let server = DaemonServer::bind(&config, Arc::new(backend))?;
    server.run_until_signal().await
}

#[cfg(not(unix))]
async fn run_daemon(
    _settings: Settings,
    _socket: Option<PathBuf>,
    _cache_ttl_ms: Option<u64>,
    _cache_max: Option<usize>,
) -> Result<()> {
    anyhow::bail!("The daemon requires Unix domain sockets")
}

/// Initialize tracing on stderr; stdout carries the refined prompt
fn init_tracing() {
    // Default: INFO level, can be overridden with RUST_LOG env var
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
