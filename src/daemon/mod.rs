// Refinement daemon
//
// Long-lived local process that keeps a result cache and a pooled webhook
// client warm, answering one request per Unix socket connection.

pub mod lifecycle;
mod server;

pub use lifecycle::SocketGuard;
pub use server::{DaemonHandle, DaemonServer, NO_PROMPT_REPLY};
