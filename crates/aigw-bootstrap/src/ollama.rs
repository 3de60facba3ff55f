//! Blocking HTTP client for the Ollama dependency.
//!
//! Covers the three contracts the bootstrap needs: the liveness probe
//! (`GET /api/tags`), the installed-model registry query, and the streaming
//! model pull (`POST /api/pull`, newline-delimited JSON progress objects).

use std::io::{BufRead, BufReader, Write as _};
use std::time::Duration;

use serde::Deserialize;

use crate::error::BootstrapError;

pub const OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<InstalledModel>,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledModel {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PullEvent {
    #[serde(default)]
    status: String,
    error: Option<String>,
}

/// Sink for pull-progress status lines. The console implementation overwrites
/// a single line in place instead of flooding output.
pub trait PullProgress {
    fn update(&mut self, status: &str);
    fn finish(&mut self);
}

#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last_width: usize,
}

impl PullProgress for ConsoleProgress {
    fn update(&mut self, status: &str) {
        let padding = self.last_width.saturating_sub(status.len());
        print!("\r{status}{}", " ".repeat(padding));
        let _ = std::io::stdout().flush();
        self.last_width = status.len();
    }

    fn finish(&mut self) {
        if self.last_width > 0 {
            println!();
        }
        self.last_width = 0;
    }
}

pub struct OllamaClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl OllamaClient {
    /// The pull stream can legitimately run for many minutes, so the client
    /// carries no whole-request timeout; the probe sets its own short one.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BootstrapError> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Lists installed model identifiers from the registry.
    pub fn list_models(&self) -> Result<Vec<String>, BootstrapError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()?
            .error_for_status()?;
        let tags = response.json::<TagsResponse>()?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    /// Liveness probe. Any transport or status failure means "not ready yet";
    /// the distinction is owned by the poller's attempt budget, not here.
    pub fn is_ready(&self) -> bool {
        self.list_models().is_ok()
    }

    /// Whether `name` (with or without a `:tag` suffix) is already installed.
    pub fn has_model(&self, name: &str) -> Result<bool, BootstrapError> {
        let installed = self.list_models()?;
        Ok(installed.iter().any(|model| {
            model == name
                || model
                    .split_once(':')
                    .is_some_and(|(base, _)| base == name)
        }))
    }

    /// Streams a model pull, forwarding each progress object's `status` field
    /// to the sink. Completion is signaled only by clean stream end.
    pub fn pull_model(
        &self,
        name: &str,
        progress: &mut dyn PullProgress,
    ) -> Result<(), BootstrapError> {
        let pull_error = |detail: String| BootstrapError::ArtifactPullFailed {
            artifact: name.to_string(),
            detail,
        };

        let response = self
            .http
            .post(format!("{}/api/pull", self.base_url))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .map_err(|err| pull_error(err.to_string()))?
            .error_for_status()
            .map_err(|err| pull_error(err.to_string()))?;

        let reader = BufReader::new(response);
        for line in reader.lines() {
            let line = line.map_err(|err| pull_error(err.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let Ok(event) = serde_json::from_str::<PullEvent>(&line) else {
                continue;
            };
            if let Some(detail) = event.error {
                progress.finish();
                return Err(pull_error(detail));
            }
            if !event.status.is_empty() {
                progress.update(event.status.as_str());
            }
        }
        progress.finish();
        Ok(())
    }
}

/// Idempotent model provisioning: skip when the registry already lists the
/// artifact, otherwise pull it. Returns whether a pull actually happened.
pub fn ensure_model_available(
    client: &OllamaClient,
    model: &str,
    progress: &mut dyn PullProgress,
) -> Result<bool, BootstrapError> {
    if client.has_model(model)? {
        tracing::info!(model, "model already available, skipping pull");
        return Ok(false);
    }
    tracing::info!(model, "pulling model");
    client.pull_model(model, progress)?;
    Ok(true)
}
