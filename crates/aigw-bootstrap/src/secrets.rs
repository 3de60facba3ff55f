//! Gateway token provisioning.
//!
//! The token is the only cross-run persistent state the bootstrap depends on:
//! created once, reused forever, never overwritten. It reaches the gateway
//! exclusively through the secrets file, never through argv.

use std::fmt::Write as _;
use std::path::Path;

use aes_gcm::aead::OsRng;

use aigw_core::{restrict_to_owner, EnvFile};

use crate::error::BootstrapError;

pub const GATEWAY_TOKEN_KEY: &str = "GATEWAY_TOKEN";
const GATEWAY_TOKEN_BYTES: usize = 32;

/// Generates a fresh 256-bit token from the platform CSPRNG, hex-encoded.
pub fn generate_gateway_token() -> String {
    use aes_gcm::aead::rand_core::RngCore as _;

    let mut bytes = [0u8; GATEWAY_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut token = String::with_capacity(GATEWAY_TOKEN_BYTES * 2);
    for byte in bytes {
        let _ = write!(&mut token, "{byte:02x}");
    }
    token
}

/// Guarantees the secrets file holds a non-empty `GATEWAY_TOKEN` and is
/// readable by the owner only. A pre-existing token is reused unconditionally;
/// repeat calls are no-ops beyond the permission assertion.
pub fn ensure_gateway_token(path: &Path) -> Result<String, BootstrapError> {
    let mut file = if path.exists() {
        EnvFile::load(path)?
    } else {
        EnvFile::default()
    };

    let existing = file
        .get(GATEWAY_TOKEN_KEY)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let token = match existing {
        Some(value) => value,
        None => {
            let fresh = generate_gateway_token();
            file.set(GATEWAY_TOKEN_KEY, fresh.as_str());
            file.save(path)?;
            tracing::info!(path = %path.display(), "generated new gateway token");
            fresh
        }
    };

    restrict_to_owner(path)?;
    Ok(token)
}
