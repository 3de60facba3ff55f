//! Foundational low-level utilities shared across aigw crates.
//!
//! Provides atomic file-write helpers, line-oriented `KEY=VALUE` env-file
//! parsing, and the owner-only permission guard used by secret storage.

pub mod atomic_io;
pub mod env_file;

pub use atomic_io::write_text_atomic;
pub use env_file::{restrict_to_owner, EnvFile};
