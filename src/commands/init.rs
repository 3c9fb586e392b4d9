use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::config::CONFIG_FILE;

const CONFIG_TEMPLATE: &str = include_str!("../../templates/codeshift.toml");

/// Write a commented codeshift.toml into `dir`
pub fn execute(dir: &str) -> Result<()> {
    let dir = Path::new(dir);
    if !dir.is_dir() {
        anyhow::bail!("Directory '{}' does not exist", dir.display());
    }

    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("'{}' already exists", config_path.display());
    }

    fs::write(&config_path, CONFIG_TEMPLATE)
        .context(format!("Failed to write {}", config_path.display()))?;

    println!(
        "     {} {}",
        "Created".green().bold(),
        config_path.display()
    );

    Ok(())
}
