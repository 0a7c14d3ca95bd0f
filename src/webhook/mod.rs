// Webhook refinement backend
//
// The remote refinement workflow is reached over HTTP. RefineBackend is the
// seam the daemon uses so it can be driven by something other than a live
// webhook.

use async_trait::async_trait;

mod client;
mod response;

pub use client::WebhookClient;
pub use response::{extract_refined_prompt, is_rate_limited, OUTPUT_FIELDS};

use crate::config::RefinerConfig;
use crate::errors::Result;

/// Something that turns a prompt into a refined prompt
#[async_trait]
pub trait RefineBackend: Send + Sync {
    /// Refine an already-trimmed, non-empty prompt
    async fn refine(&self, prompt: &str) -> Result<String>;

    /// Short name for logging
    fn name(&self) -> &str;
}

/// A [`WebhookClient`] bound to one resolved config
#[derive(Clone)]
pub struct WebhookBackend {
    client: WebhookClient,
    config: RefinerConfig,
}

impl WebhookBackend {
    pub fn new(config: RefinerConfig) -> Result<Self> {
        Ok(Self {
            client: WebhookClient::new()?,
            config,
        })
    }

    pub fn with_client(client: WebhookClient, config: RefinerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }
}

#[async_trait]
impl RefineBackend for WebhookBackend {
    async fn refine(&self, prompt: &str) -> Result<String> {
        self.client.send(prompt, &self.config).await
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
