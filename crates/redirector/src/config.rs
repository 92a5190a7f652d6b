use anyhow::{Context, Result};
use redirector_core::line_split::LineEnding;
use redirector_core::link_text::{LinkFormat, LinkTextOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the vault root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".redirector.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedirectorConfig {
    pub links: LinkTextOptions,
    pub vault: VaultConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Separator used in host paths. Only `/` and `\` are accepted.
    pub path_separator: char,
    /// Glob patterns, relative to the vault root, for files that are never
    /// read, listed or linked to.
    pub exclude: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            path_separator: '/',
            exclude: vec![".obsidian/**".to_string(), ".trash/**".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub line_ending: LineEnding,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub format: Option<LinkFormat>,
}

impl RedirectorConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid redirector config")
    }

    /// Load the config for `vault_root`.
    ///
    /// An explicit `path` must exist. Without one, `<vault>/.redirector.toml`
    /// is used when present and defaults otherwise.
    pub fn load(vault_root: &Path, path: Option<&Path>) -> Result<Self> {
        let (path, required): (PathBuf, bool) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (vault_root.join(DEFAULT_CONFIG_FILE), false),
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read config {}", path.display()))
            }
        };

        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(format) = overrides.format {
            self.links.format = format;
        }
        self
    }
}
