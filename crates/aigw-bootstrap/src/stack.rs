//! Compose operations behind a driver seam.
//!
//! `ComposeCli` shells out through the selected backend's command prefix; the
//! trait exists so the orchestration sequence can be exercised against a
//! recording fake without a container runtime on the host.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context};

use crate::compose::ComposeBackend;
use crate::error::BootstrapError;

pub const GATEWAY_SERVICE: &str = "gateway";
pub const OLLAMA_SERVICE: &str = "ollama";

/// The four compose operations the bootstrap sequence needs.
pub trait StackDriver {
    /// Builds one service's image, surfacing the raw build-tool output.
    fn build_image(&self, service: &str) -> Result<(), BootstrapError>;

    /// Tears down any pre-existing stack state, ignoring every error: a prior
    /// crashed run must not block a new one.
    fn down_best_effort(&self);

    /// Starts the named services detached.
    fn up_detached(&self, services: &[&str]) -> Result<(), BootstrapError>;

    /// Raw process-status text for one service (`ps` output), advisory only.
    fn service_state(&self, service: &str) -> Result<String, BootstrapError>;
}

pub struct ComposeCli {
    backend: ComposeBackend,
    project_dir: PathBuf,
}

impl ComposeCli {
    pub fn new(backend: ComposeBackend, project_dir: PathBuf) -> Self {
        Self {
            backend,
            project_dir,
        }
    }

    fn command(&self) -> Command {
        let (program, args) = self.backend.command_prefix();
        let mut command = Command::new(program);
        command.args(args);
        command.current_dir(&self.project_dir);
        command
    }
}

impl StackDriver for ComposeCli {
    fn build_image(&self, service: &str) -> Result<(), BootstrapError> {
        // Build output goes straight to the operator's terminal; on failure
        // the raw tool output is the diagnostic.
        let status = self
            .command()
            .args(["build", service])
            .status()
            .map_err(|err| BootstrapError::BuildFailed {
                service: service.to_string(),
                detail: format!("failed to invoke {}: {err}", self.backend.label()),
            })?;
        if !status.success() {
            return Err(BootstrapError::BuildFailed {
                service: service.to_string(),
                detail: format!("{} build exited with {status}", self.backend.label()),
            });
        }
        Ok(())
    }

    fn down_best_effort(&self) {
        let outcome = self
            .command()
            .arg("down")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Ok(status) = outcome {
            tracing::debug!(%status, "best-effort teardown of previous stack state");
        }
    }

    fn up_detached(&self, services: &[&str]) -> Result<(), BootstrapError> {
        let output = self
            .command()
            .args(["up", "-d"])
            .args(services)
            .output()
            .with_context(|| format!("failed to invoke {} up", self.backend.label()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BootstrapError::Other(anyhow!(
                "failed to start {} via '{} up -d': {}",
                services.join(", "),
                self.backend.label(),
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn service_state(&self, service: &str) -> Result<String, BootstrapError> {
        let output = self
            .command()
            .args(["ps", service])
            .output()
            .with_context(|| format!("failed to invoke {} ps", self.backend.label()))?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
