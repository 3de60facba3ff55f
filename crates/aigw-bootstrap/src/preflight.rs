//! Execution-context checks that run before any state-mutating action.

use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::compose::{runtime_reports_rootless, ComposeBackend};
use crate::error::BootstrapError;

/// Resolves the effective uid by running `id -u`.
pub fn detect_effective_uid() -> Result<u32> {
    let output = Command::new("id")
        .arg("-u")
        .output()
        .context("failed to execute 'id -u'")?;
    if !output.status.success() {
        bail!("'id -u' returned non-zero status");
    }
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<u32>()
        .context("failed to parse effective uid")
}

/// Rejects superuser execution unconditionally. The rootless security model
/// is void under uid 0, so there is no override flag.
pub fn ensure_not_root(effective_uid: u32) -> Result<(), BootstrapError> {
    if effective_uid == 0 {
        return Err(BootstrapError::UnsafeExecutionContext { uid: effective_uid });
    }
    Ok(())
}

/// Advisory follow-up to backend selection: warn when the runtime itself says
/// it is not rootless. Never fatal; the docker fallback is an accepted
/// degraded path and podman setups may legitimately differ.
pub fn warn_if_not_rootless(backend: ComposeBackend) {
    if runtime_reports_rootless(backend) == Some(false) {
        tracing::warn!(
            backend = backend.label(),
            "runtime reports non-rootless operation; continuing in degraded mode"
        );
    }
}
