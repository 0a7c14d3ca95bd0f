// Daemon client implementation
//
// Socket client that hands a prompt to the local refinement daemon.
// One connection per request: write the prompt, half-close, read until EOF.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::config::{CliConfig, DEFAULT_SOCKET_PATH, DEFAULT_TIMEOUT_MS};
use crate::errors::{ErrorKind, RefinerError, Result};

/// Prefix marking a failure payload on the daemon socket
pub const ERROR_PREFIX: &str = "ERROR:";

/// Where the daemon listens and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonClientOptions {
    pub socket_path: PathBuf,
    pub timeout_ms: u64,
}

impl Default for DaemonClientOptions {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl DaemonClientOptions {
    pub fn from_cli_config(config: &CliConfig) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            timeout_ms: config.timeout_ms,
        }
    }
}

/// Client for the refinement daemon's socket protocol
#[derive(Debug, Clone)]
pub struct DaemonClient {
    options: DaemonClientOptions,
}

impl DaemonClient {
    pub fn new(options: DaemonClientOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DaemonClientOptions {
        &self.options
    }

    /// Send one prompt and wait for the reply
    ///
    /// The whole exchange is bounded by the configured timeout; on expiry
    /// the connection is dropped and a `Timeout` error returned.
    pub async fn send(&self, prompt: &str) -> Result<String> {
        let timeout = Duration::from_millis(self.options.timeout_ms);
        let socket_path = &self.options.socket_path;

        debug!(socket = %socket_path.display(), timeout_ms = self.options.timeout_ms, "Sending prompt to daemon");

        let payload = match tokio::time::timeout(timeout, exchange(socket_path, prompt)).await {
            Err(_) => return Err(RefinerError::timeout("Daemon request timed out")),
            Ok(Err(e)) => {
                return Err(RefinerError::with_source(
                    ErrorKind::DaemonError,
                    format!("Daemon connection error: {}", e),
                    e,
                ))
            }
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        };

        parse_daemon_reply(payload)
    }

    /// True if something accepts connections on the socket
    pub async fn is_reachable(&self) -> bool {
        connect_probe(&self.options.socket_path).await
    }
}

/// One-shot helper around [`DaemonClient::send`]
pub async fn send_to_daemon(prompt: &str, options: &DaemonClientOptions) -> Result<String> {
    DaemonClient::new(options.clone()).send(prompt).await
}

/// Turn a raw daemon payload into a result
///
/// `ERROR:`-prefixed payloads become `DaemonError` with the trimmed remainder
/// as the message; anything else is the refined text, verbatim.
pub fn parse_daemon_reply(payload: String) -> Result<String> {
    match payload.strip_prefix(ERROR_PREFIX) {
        Some(message) => Err(RefinerError::daemon(message.trim())),
        None => Ok(payload),
    }
}

#[cfg(unix)]
async fn exchange(socket_path: &Path, prompt: &str) -> io::Result<Vec<u8>> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;

    let mut stream = UnixStream::connect(socket_path).await?;
    stream.write_all(prompt.as_bytes()).await?;
    // Half-close: the daemon reads until EOF
    stream.shutdown().await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;
    Ok(reply)
}

#[cfg(not(unix))]
async fn exchange(_socket_path: &Path, _prompt: &str) -> io::Result<Vec<u8>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Unix domain sockets are not available on this platform",
    ))
}

#[cfg(unix)]
async fn connect_probe(socket_path: &Path) -> bool {
    tokio::net::UnixStream::connect(socket_path).await.is_ok()
}

#[cfg(not(unix))]
async fn connect_probe(_socket_path: &Path) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    /// Accept one connection, read the request, answer with `reply`
    fn serve_once(listener: UnixListener, reply: &'static str) -> tokio::task::JoinHandle<String> {
        tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut request = String::new();
            conn.read_to_string(&mut request).await.unwrap();
            conn.write_all(reply.as_bytes()).await.unwrap();
            conn.shutdown().await.unwrap();
            request
        })
    }

    fn options(dir: &TempDir, timeout_ms: u64) -> DaemonClientOptions {
        DaemonClientOptions {
            socket_path: dir.path().join("refiner.sock"),
            timeout_ms,
        }
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_daemon_reply("Refined.".to_string()).unwrap(), "Refined.");
        assert_eq!(parse_daemon_reply("  spaced  ".to_string()).unwrap(), "  spaced  ");

        let err = parse_daemon_reply("ERROR: no prompt provided".to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DaemonError);
        assert_eq!(err.message(), "no prompt provided");

        let err = parse_daemon_reply("ERROR:tight".to_string()).unwrap_err();
        assert_eq!(err.message(), "tight");
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir, 2_000);
        let listener = UnixListener::bind(&opts.socket_path).unwrap();
        let server = serve_once(listener, "Refined prompt");

        let reply = send_to_daemon("raw prompt", &opts).await.unwrap();

        assert_eq!(reply, "Refined prompt");
        assert_eq!(server.await.unwrap(), "raw prompt");
    }

    #[tokio::test]
    async fn test_error_payload() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir, 2_000);
        let listener = UnixListener::bind(&opts.socket_path).unwrap();
        let _server = serve_once(listener, "ERROR: Webhook error: 500 boom");

        let err = DaemonClient::new(opts).send("prompt").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DaemonError);
        assert_eq!(err.message(), "Webhook error: 500 boom");
    }

    #[tokio::test]
    async fn test_missing_socket() {
        let dir = TempDir::new().unwrap();
        let client = DaemonClient::new(options(&dir, 2_000));

        assert!(!client.is_reachable().await);
        let err = client.send("prompt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DaemonError);
        assert!(err.message().starts_with("Daemon connection error:"));
    }

    #[tokio::test]
    async fn test_silent_daemon_times_out() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir, 150);
        let listener = UnixListener::bind(&opts.socket_path).unwrap();
        let _server = tokio::spawn(async move {
            let (conn, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(conn);
        });

        let err = DaemonClient::new(opts).send("prompt").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "Daemon request timed out");
    }
}
