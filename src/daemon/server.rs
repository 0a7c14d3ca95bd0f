// Daemon socket server
//
// Each connection carries exactly one request: the client writes a prompt and
// half-closes, we answer and close. Results are cached by trimmed prompt.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::lifecycle::SocketGuard;
use crate::cache::{BoundedCache, Clock, SystemClock};
use crate::client::ERROR_PREFIX;
use crate::config::DaemonConfig;
use crate::webhook::RefineBackend;

/// Reply sent when the request carried no prompt
pub const NO_PROMPT_REPLY: &str = "ERROR: no prompt provided";

/// How long a client may take to send its request and half-close
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(30);

type ResultCache = BoundedCache<String, Arc<dyn Clock>>;

/// State shared by every connection
struct DaemonState {
    backend: Arc<dyn RefineBackend>,
    cache: Mutex<ResultCache>,
    read_timeout: Duration,
}

/// Cheap handle for stopping a running daemon from elsewhere
#[derive(Clone)]
pub struct DaemonHandle {
    shutdown: CancellationToken,
    running: Arc<AtomicBool>,
}

impl DaemonHandle {
    /// Ask the accept loop to exit; the socket file is removed as it does
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Local socket server fronting a refinement backend with a result cache
pub struct DaemonServer {
    listener: UnixListener,
    guard: SocketGuard,
    state: Arc<DaemonState>,
    handle: DaemonHandle,
}

impl DaemonServer {
    /// Bind the daemon socket; must be called inside a Tokio runtime
    pub fn bind(config: &DaemonConfig, backend: Arc<dyn RefineBackend>) -> Result<Self> {
        Self::bind_with_clock(config, backend, Arc::new(SystemClock))
    }

    /// Same as [`bind`](Self::bind) with cache expiry driven by `clock`
    pub fn bind_with_clock(
        config: &DaemonConfig,
        backend: Arc<dyn RefineBackend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let guard = SocketGuard::prepare(&config.socket_path)?;
        let listener = UnixListener::bind(guard.path())
            .with_context(|| format!("Failed to bind {}", guard.path().display()))?;
        guard.restrict_permissions()?;

        let state = Arc::new(DaemonState {
            backend,
            cache: Mutex::new(BoundedCache::with_clock(config.cache_options(), clock)),
            read_timeout: REQUEST_READ_TIMEOUT,
        });

        info!(
            socket = %guard.path().display(),
            cache_ttl_ms = config.cache_ttl_ms,
            cache_max_entries = config.cache_max_entries,
            "Daemon started"
        );

        Ok(Self {
            listener,
            guard,
            state,
            handle: DaemonHandle {
                shutdown: CancellationToken::new(),
                running: Arc::new(AtomicBool::new(true)),
            },
        })
    }

    pub fn socket_path(&self) -> &Path {
        self.guard.path()
    }

    pub fn handle(&self) -> DaemonHandle {
        self.handle.clone()
    }

    /// Accept connections until [`DaemonHandle::stop`] is called
    pub async fn serve(self) -> Result<()> {
        let DaemonServer {
            listener,
            guard,
            state,
            handle,
        } = self;

        loop {
            tokio::select! {
                _ = handle.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &state).await {
                                warn!(error = %e, "Daemon connection failed");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "Failed to accept daemon connection"),
                },
            }
        }

        drop(listener);
        handle.running.store(false, Ordering::SeqCst);
        guard.cleanup()?;
        info!("Daemon stopped");
        Ok(())
    }

    /// Serve until SIGINT or SIGTERM
    pub async fn run_until_signal(self) -> Result<()> {
        let handle = self.handle();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("Shutdown signal received");
            handle.stop();
        });
        self.serve().await
    }
}

/// Read one request to EOF, answer it, close
///
/// A client that has not half-closed within the read timeout is dropped
/// without a reply.
async fn handle_connection<S>(mut stream: S, state: &DaemonState) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let started = Instant::now();

    let mut request = Vec::new();
    tokio::time::timeout(state.read_timeout, stream.read_to_end(&mut request))
        .await
        .map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "client did not finish sending its request",
            )
        })??;
    let prompt = String::from_utf8_lossy(&request);

    let reply = respond(state, prompt.trim(), started).await;

    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

async fn respond(state: &DaemonState, prompt: &str, started: Instant) -> String {
    if prompt.is_empty() {
        debug!("Rejecting empty prompt");
        return NO_PROMPT_REPLY.to_string();
    }

    if let Some(cached) = state.cache.lock().await.get(prompt) {
        info!(duration_ms = started.elapsed().as_millis() as u64, "Cache hit");
        return cached;
    }

    match state.backend.refine(prompt).await {
        Ok(refined) => {
            state
                .cache
                .lock()
                .await
                .set(prompt.to_string(), refined.clone());
            info!(
                backend = state.backend.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Refined prompt"
            );
            refined
        }
        Err(e) => {
            error!(
                duration_ms = started.elapsed().as_millis() as u64,
                code = e.code(),
                error = %e,
                "Refinement failed"
            );
            format!("{} {}", ERROR_PREFIX, e.message())
        }
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM, waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
