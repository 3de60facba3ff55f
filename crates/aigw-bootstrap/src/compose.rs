//! Compose runtime selection.
//!
//! Probes the host for an orchestration backend in strict preference order and
//! fixes the command prefix used by every subsequent compose invocation. The
//! selection happens once per run and is immutable afterwards.

use std::process::{Command, Stdio};

use crate::error::BootstrapError;

/// Available compose backends, ordered by preference. The docker fallback
/// relaxes the rootless guarantee and is surfaced as a degraded-mode warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeBackend {
    PodmanCompose,
    PodmanBuiltin,
    DockerCompose,
}

impl ComposeBackend {
    pub const PREFERENCE_ORDER: [ComposeBackend; 3] = [
        ComposeBackend::PodmanCompose,
        ComposeBackend::PodmanBuiltin,
        ComposeBackend::DockerCompose,
    ];

    /// Program plus leading arguments prefixed to every compose operation.
    pub fn command_prefix(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ComposeBackend::PodmanCompose => ("podman-compose", &[]),
            ComposeBackend::PodmanBuiltin => ("podman", &["compose"]),
            ComposeBackend::DockerCompose => ("docker", &["compose"]),
        }
    }

    /// Human-readable form of the command prefix, also valid as shell text.
    pub fn label(&self) -> &'static str {
        match self {
            ComposeBackend::PodmanCompose => "podman-compose",
            ComposeBackend::PodmanBuiltin => "podman compose",
            ComposeBackend::DockerCompose => "docker compose",
        }
    }

    /// Whether the backend runs without a privileged daemon.
    pub fn rootless_native(&self) -> bool {
        !matches!(self, ComposeBackend::DockerCompose)
    }

    /// Single bounded invocation used as the presence check. Must not mutate
    /// host state.
    fn probe_invocation(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ComposeBackend::PodmanCompose => ("podman-compose", &["--version"]),
            ComposeBackend::PodmanBuiltin => ("podman", &["compose", "version"]),
            ComposeBackend::DockerCompose => ("docker", &["compose", "version"]),
        }
    }

    /// Program queried for the advisory rootless-mode report.
    fn info_program(&self) -> &'static str {
        match self {
            ComposeBackend::DockerCompose => "docker",
            _ => "podman",
        }
    }
}

/// Ordered short-circuit selection over the preference list. Pure; the
/// availability predicate is injected so hosts do not have to be real.
pub fn select_backend(available: impl Fn(ComposeBackend) -> bool) -> Option<ComposeBackend> {
    ComposeBackend::PREFERENCE_ORDER
        .iter()
        .copied()
        .find(|backend| available(*backend))
}

/// Probes the host and returns the first working backend.
pub fn detect_backend() -> Result<ComposeBackend, BootstrapError> {
    let selected = select_backend(|backend| {
        let (program, args) = backend.probe_invocation();
        Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    })
    .ok_or(BootstrapError::NoRuntimeFound)?;

    if !selected.rootless_native() {
        tracing::warn!(
            backend = selected.label(),
            "degraded mode: no rootless compose runtime found, falling back to \
             the docker daemon; the stack will run but loses the rootless guarantee"
        );
    }
    Ok(selected)
}

/// Asks the selected runtime whether it operates rootless. `None` when the
/// query itself fails; the answer is advisory either way.
pub fn runtime_reports_rootless(backend: ComposeBackend) -> Option<bool> {
    let output = Command::new(backend.info_program())
        .args(["info", "--format", "{{.Host.Security.Rootless}}"])
        .stderr(Stdio::null())
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    match String::from_utf8_lossy(&output.stdout).trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
