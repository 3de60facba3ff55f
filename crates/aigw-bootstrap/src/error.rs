use thiserror::Error;

/// Fatal bootstrap failures. Each variant names the step that failed and,
/// where one exists, a literal remediation command. The post-start gateway
/// verification is deliberately absent: it is a warning, never an error.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(
        "no compose runtime found; install one of: podman-compose \
         (pip install podman-compose), podman 4.7+ (podman compose), \
         or docker with the compose plugin"
    )]
    NoRuntimeFound,

    #[error(
        "refusing to run as root (uid {uid}); the stack is rootless by design, \
         rerun as an unprivileged user"
    )]
    UnsafeExecutionContext { uid: u32 },

    #[error("image build failed for service '{service}': {detail}")]
    BuildFailed { service: String, detail: String },

    #[error(
        "dependency '{service}' did not become ready after {attempts} probe \
         attempts; inspect its logs: {logs_command}"
    )]
    DependencyTimedOut {
        service: String,
        attempts: u32,
        logs_command: String,
    },

    #[error("model pull failed for '{artifact}': {detail}")]
    ArtifactPullFailed { artifact: String, detail: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
