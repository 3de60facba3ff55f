//! The bootstrap run: strict top-to-bottom sequencing of every component,
//! fail-fast, plus the final human-readable summary.

use std::path::PathBuf;
use std::time::Duration;

use crate::compose::ComposeBackend;
use crate::error::BootstrapError;
use crate::ollama::{ensure_model_available, OllamaClient, PullProgress, OLLAMA_BASE_URL};
use crate::preflight::ensure_not_root;
use crate::readiness::{poll_until_ready, PollPlan, ReadinessState};
use crate::secrets::ensure_gateway_token;
use crate::stack::{StackDriver, GATEWAY_SERVICE, OLLAMA_SERVICE};

pub const GATEWAY_ENDPOINT: &str = "http://127.0.0.1:8080";
pub const DEFAULT_MODEL: &str = "llama3.1:8b";
pub const SECRETS_FILE_NAME: &str = ".env";

const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// All tunables for one run, threaded explicitly; no ambient globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub project_dir: PathBuf,
    pub secrets_path: PathBuf,
    pub model: String,
    pub gateway_endpoint: String,
    pub ollama_base_url: String,
    pub settle_delay: Duration,
    pub poll: PollPlan,
}

impl BootstrapConfig {
    pub fn new(project_dir: PathBuf) -> Self {
        let secrets_path = project_dir.join(SECRETS_FILE_NAME);
        Self {
            project_dir,
            secrets_path,
            model: DEFAULT_MODEL.to_string(),
            gateway_endpoint: GATEWAY_ENDPOINT.to_string(),
            ollama_base_url: OLLAMA_BASE_URL.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll: PollPlan::default(),
        }
    }

    /// Applies environment overrides. Poll tunables stay clamped inside
    /// `PollPlan` bounds, so the loop remains finite whatever the operator
    /// exports.
    pub fn from_env(project_dir: PathBuf) -> Self {
        let mut config = Self::new(project_dir);
        if let Some(model) = read_env_trimmed("AIGW_MODEL") {
            config.model = model;
        }
        let interval_secs = read_env_parsed("AIGW_READY_INTERVAL_SECS")
            .unwrap_or_else(|| config.poll.interval.as_secs());
        let max_attempts =
            read_env_parsed("AIGW_READY_MAX_ATTEMPTS").unwrap_or(config.poll.max_attempts);
        config.poll = PollPlan::bounded(interval_secs, max_attempts);
        config
    }
}

fn read_env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    read_env_trimmed(key).and_then(|value| value.parse().ok())
}

/// Outcome of a successful run; input to the summary reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub backend_label: String,
    pub rootless_runtime: bool,
    pub token: String,
    pub model: String,
    pub model_freshly_pulled: bool,
    pub endpoint: String,
    pub readiness_attempts: u32,
    pub gateway_verified: bool,
}

/// Runs the full bootstrap sequence. Every step's failure is fatal to the
/// whole run except the final gateway process check, which only warns:
/// process supervision owns restart policy once the stack is declared up.
pub fn run_bootstrap(
    config: &BootstrapConfig,
    backend: ComposeBackend,
    effective_uid: u32,
    driver: &dyn StackDriver,
    client: &OllamaClient,
    progress: &mut dyn PullProgress,
    sleeper: &mut dyn FnMut(Duration),
) -> Result<BootstrapReport, BootstrapError> {
    // Re-asserted here so the sequence is safe regardless of caller ordering.
    ensure_not_root(effective_uid)?;

    let token = ensure_gateway_token(&config.secrets_path)?;

    tracing::info!(service = GATEWAY_SERVICE, "building gateway image");
    driver.build_image(GATEWAY_SERVICE)?;

    driver.down_best_effort();
    tracing::info!(service = OLLAMA_SERVICE, "starting model-serving dependency");
    driver.up_detached(&[OLLAMA_SERVICE])?;

    let readiness = poll_until_ready(|| client.is_ready(), config.poll, |interval| {
        sleeper(interval)
    });
    let readiness_attempts = match readiness {
        ReadinessState::Ready { attempts } => attempts,
        ReadinessState::TimedOut { attempts } => {
            return Err(BootstrapError::DependencyTimedOut {
                service: OLLAMA_SERVICE.to_string(),
                attempts,
                logs_command: format!("{} logs {}", backend.label(), OLLAMA_SERVICE),
            });
        }
        ReadinessState::Unknown | ReadinessState::Polling => unreachable!(
            "poller returns only terminal states"
        ),
    };
    tracing::info!(attempts = readiness_attempts, "dependency is ready");

    let model_freshly_pulled = ensure_model_available(client, config.model.as_str(), progress)?;

    tracing::info!("starting gateway and dependency services");
    driver.up_detached(&[GATEWAY_SERVICE, OLLAMA_SERVICE])?;
    sleeper(config.settle_delay);

    let state = driver
        .service_state(GATEWAY_SERVICE)
        .unwrap_or_default();
    let gateway_verified = state.contains("running") || state.contains("Up");
    if !gateway_verified {
        tracing::warn!(
            service = GATEWAY_SERVICE,
            "gateway process state not confirmed; inspect it: {} logs {}",
            backend.label(),
            GATEWAY_SERVICE
        );
    }

    Ok(BootstrapReport {
        backend_label: backend.label().to_string(),
        rootless_runtime: backend.rootless_native(),
        token,
        model: config.model.clone(),
        model_freshly_pulled,
        endpoint: config.gateway_endpoint.clone(),
        readiness_attempts,
        gateway_verified,
    })
}

/// Pure rendering of the final connection/credential/status summary.
pub fn render_bootstrap_summary(report: &BootstrapReport) -> String {
    let model_note = if report.model_freshly_pulled {
        "freshly pulled"
    } else {
        "already available"
    };
    let runtime_line = if report.rootless_runtime {
        format!("[x] rootless container runtime ({})", report.backend_label)
    } else {
        format!(
            "[!] degraded: non-rootless runtime ({})",
            report.backend_label
        )
    };
    let gateway_line = if report.gateway_verified {
        "gateway is running"
    } else {
        "gateway state unconfirmed, check its logs"
    };

    format!(
        "\nstack is up\n\n\
         \x20 endpoint:  {endpoint} (loopback only)\n\
         \x20 token:     {token}\n\
         \x20 model:     {model} ({model_note})\n\
         \x20 readiness: dependency answered after {attempts} probe(s)\n\
         \x20 status:    {gateway_line}\n\n\
         \x20 security:\n\
         \x20   [x] gateway bound to 127.0.0.1 only\n\
         \x20   [x] secrets file restricted to owner (0600)\n\
         \x20   [x] requests authenticated with GATEWAY_TOKEN\n\
         \x20   {runtime_line}\n",
        endpoint = report.endpoint,
        token = report.token,
        model = report.model,
        attempts = report.readiness_attempts,
    )
}
