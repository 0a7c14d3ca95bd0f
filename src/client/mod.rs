// Socket client for daemon communication
//
// Provides DaemonClient for callers that want the daemon's cache in front of
// the webhook.

mod daemon_client;

pub use daemon_client::{
    parse_daemon_reply, send_to_daemon, DaemonClient, DaemonClientOptions, ERROR_PREFIX,
};
