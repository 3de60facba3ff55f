//! Line-oriented `KEY=VALUE` file handling for the secrets file.
//!
//! Parsing keeps every original line (comments, blanks, unknown keys) so a
//! rewrite only touches the keys the caller changed.

use std::path::Path;

use anyhow::{Context, Result};

use crate::atomic_io::write_text_atomic;

#[derive(Debug, Clone, PartialEq, Eq)]
enum EnvLine {
    Pair { key: String, value: String },
    Verbatim(String),
}

/// An env-style file held as an ordered list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<EnvLine>,
}

impl EnvFile {
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return EnvLine::Verbatim(line.to_string());
                }
                match line.split_once('=') {
                    Some((key, value)) if !key.trim().is_empty() => EnvLine::Pair {
                        key: key.trim().to_string(),
                        value: value.to_string(),
                    },
                    _ => EnvLine::Verbatim(line.to_string()),
                }
            })
            .collect();
        Self { lines }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read env file {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            EnvLine::Pair { key: existing, value } if existing == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replaces the value of `key` in place, appending the pair when absent.
    pub fn set(&mut self, key: &str, value: &str) {
        for line in &mut self.lines {
            if let EnvLine::Pair { key: existing, value: slot } = line {
                if existing == key {
                    *slot = value.to_string();
                    return;
                }
            }
        }
        self.lines.push(EnvLine::Pair {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        for line in &self.lines {
            match line {
                EnvLine::Pair { key, value } => {
                    output.push_str(key);
                    output.push('=');
                    output.push_str(value);
                }
                EnvLine::Verbatim(raw) => output.push_str(raw),
            }
            output.push('\n');
        }
        output
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_text_atomic(path, self.render().as_str())
    }
}

/// Restricts `path` to owner read/write (mode 0600) on unix hosts.
pub fn restrict_to_owner(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
