//! Bootstrap orchestration for the local AI-gateway stack.
//!
//! Turns an uninitialized host into a running two-service container stack:
//! provisions the gateway token, selects a compose runtime, builds the gateway
//! image, brings up the Ollama dependency, waits for it to answer, pulls the
//! model once, then starts the gateway. The whole run is sequential and
//! fail-fast; the only retry loop is the bounded readiness poller.

pub mod compose;
pub mod error;
pub mod ollama;
pub mod preflight;
pub mod readiness;
pub mod secrets;
pub mod stack;
pub mod workflow;

pub use compose::{detect_backend, select_backend, ComposeBackend};
pub use error::BootstrapError;
pub use ollama::{ensure_model_available, ConsoleProgress, OllamaClient, PullProgress};
pub use preflight::{detect_effective_uid, ensure_not_root, warn_if_not_rootless};
pub use readiness::{poll_until_ready, PollPlan, ReadinessState};
pub use secrets::{ensure_gateway_token, generate_gateway_token, GATEWAY_TOKEN_KEY};
pub use stack::{ComposeCli, StackDriver, GATEWAY_SERVICE, OLLAMA_SERVICE};
pub use workflow::{
    render_bootstrap_summary, run_bootstrap, BootstrapConfig, BootstrapReport,
};
