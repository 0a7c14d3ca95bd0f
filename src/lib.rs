// Prompt Refiner - webhook-backed prompt refinement
// Library exports

pub mod cache;
pub mod client; // Socket client for the local daemon
pub mod config;
#[cfg(unix)]
pub mod daemon; // Caching daemon process
pub mod errors;
pub mod service; // Public refinement entry point
pub mod utils;
pub mod webhook;

pub use errors::{ErrorKind, RefinerError, Result};
pub use service::{refine_prompt, RefineOptions, Refiner};
