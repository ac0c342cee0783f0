//! Transform options and plugin configuration files.
//!
//! A plugin config is an optional JSON file mirroring the options the test
//! plugin accepts:
//!
//! ```json
//! {
//!   "configDir": ".storybook",
//!   "tags": { "include": ["test"], "exclude": [], "skip": ["slow"] },
//!   "stories": ["../src/**/*.stories.@(ts|tsx)", { "directory": "../docs", "titlePrefix": "Docs" }]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the Storybook configuration when none is given.
pub const DEFAULT_CONFIG_DIR: &str = ".storybook";

/// Tag sets copied verbatim into every registration statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub skip: Vec<String>,
}

impl Default for TagFilter {
    fn default() -> Self {
        Self {
            include: vec!["test".to_string()],
            exclude: Vec::new(),
            skip: Vec::new(),
        }
    }
}

impl TagFilter {
    /// Compact JSON object literal, keys in `include`, `exclude`, `skip` order.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Resolved options for a single transform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub tags: TagFilter,
    pub config_dir: PathBuf,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            tags: TagFilter::default(),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
        }
    }
}

/// One entry of the `stories` list: a glob specifier or a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoriesSpecifier {
    Glob(String),
    Entry(StoriesEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoriesEntry {
    /// Directory relative to the config dir.
    pub directory: String,
    /// Glob relative to `directory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
}

/// Contents of a plugin config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginConfig {
    pub config_dir: Option<PathBuf>,
    pub tags: Option<TagFilter>,
    pub stories: Vec<StoriesSpecifier>,
}

impl PluginConfig {
    /// Reads and parses a JSON plugin config.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid plugin config JSON")
    }

    /// Options for the transform, falling back to defaults for unset fields.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            tags: self.tags.clone().unwrap_or_default(),
            config_dir: self
                .config_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
        }
    }
}
