use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::translator::{Dialect, Leniency, TranslateOptions};

pub const CONFIG_FILE: &str = "codeshift.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub emit: EmitConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslateConfig {
    /// Source dialect. Inferred from the file extension when absent
    pub from: Option<Dialect>,
    pub to: Option<Dialect>,
    #[serde(default)]
    pub leniency: Leniency,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmitConfig {
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
    #[serde(default)]
    pub python_self_param: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
            python_self_param: false,
        }
    }
}

fn default_indent_width() -> usize {
    4
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Worker threads; 0 lets rayon decide
    #[serde(default)]
    pub jobs: usize,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            exclude: default_exclude(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    vec!["bin".to_string(), "obj".to_string()]
}

impl Config {
    /// Options for one file, with the emit settings applied
    pub fn options(&self, source: Dialect, target: Dialect) -> TranslateOptions {
        TranslateOptions {
            leniency: self.translate.leniency,
            indent_width: self.emit.indent_width,
            python_self_param: self.emit.python_self_param,
            ..TranslateOptions::new(source, target)
        }
    }
}

/// Load and parse a codeshift.toml file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("could not find `{}`", path.display())
        } else {
            anyhow::anyhow!("failed to read `{}`: {}", path.display(), e)
        }
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse `{}`: {}", path.display(), e))?;

    if config.emit.indent_width == 0 {
        anyhow::bail!(
            "Invalid indent_width in `{}`. Must be at least 1",
            path.display()
        );
    }

    Ok(config)
}

/// Where a config file is looked for: next to the target, the current
/// directory, then the user config directory
pub fn search_paths(target: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let target_dir = if target.is_dir() {
        Some(target)
    } else {
        target.parent().filter(|p| !p.as_os_str().is_empty())
    };
    if let Some(dir) = target_dir {
        paths.push(dir.join(CONFIG_FILE));
    }
    paths.push(PathBuf::from(CONFIG_FILE));
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("codeshift").join("config.toml"));
    }
    paths
}

/// Load the first config file found for `target`, or defaults when none exists
pub fn discover_config(target: &Path) -> Result<Config> {
    match search_paths(target).into_iter().find(|p| p.is_file()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using config");
            load_config(&path)
        }
        None => Ok(Config::default()),
    }
}
