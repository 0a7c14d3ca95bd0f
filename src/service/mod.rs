// Refinement service
//
// Public entry point: validate the prompt, resolve options against the
// loaded settings, then hand off to the daemon or straight to the webhook.

mod options;

pub use options::RefineOptions;

use tracing::debug;

use crate::client::send_to_daemon;
use crate::config::Settings;
use crate::errors::Result;
use crate::utils::validate_prompt;
use crate::webhook::WebhookClient;

/// Refinement entry point with preset default options
///
/// Per-call options are overlaid on the defaults field by field, and both
/// fall back to the settings it was built with.
#[derive(Clone)]
pub struct Refiner {
    settings: Settings,
    defaults: RefineOptions,
    webhook: WebhookClient,
}

impl Refiner {
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_defaults(settings, RefineOptions::default())
    }

    pub fn with_defaults(settings: Settings, defaults: RefineOptions) -> Result<Self> {
        Ok(Self {
            settings,
            defaults,
            webhook: WebhookClient::new()?,
        })
    }

    /// Swap the webhook client (e.g. one with jitter disabled)
    pub fn with_webhook_client(mut self, webhook: WebhookClient) -> Self {
        self.webhook = webhook;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn defaults(&self) -> &RefineOptions {
        &self.defaults
    }

    /// Refine one prompt
    ///
    /// Empty or whitespace-only prompts fail with `EmptyPrompt` before any
    /// connection is made. Errors from the daemon or webhook pass through
    /// unchanged.
    pub async fn refine(&self, prompt: &str, options: &RefineOptions) -> Result<String> {
        let prompt = validate_prompt(prompt)?;
        let options = self.defaults.merge(options);

        if options.resolve_use_daemon(&self.settings) {
            let daemon = options.resolve_daemon(&self.settings);
            debug!(socket = %daemon.socket_path.display(), "Refining through daemon");
            send_to_daemon(&prompt, &daemon).await
        } else {
            let config = options.resolve_webhook(&self.settings);
            debug!(url = %config.webhook_url, "Refining through webhook");
            self.webhook.send(&prompt, &config).await
        }
    }
}

/// One-shot refinement with a fresh [`Refiner`]
pub async fn refine_prompt(
    prompt: &str,
    options: &RefineOptions,
    settings: &Settings,
) -> Result<String> {
    // Reject bad prompts before building an HTTP client
    let prompt = validate_prompt(prompt)?;
    Refiner::new(settings.clone())?.refine(&prompt, options).await
}
