use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::commands::{detect_target, source_dialect, Target};
use crate::config;
use crate::project::discover_files;
use crate::translator::{self, Dialect};

/// Lex and validate block structure without translating
pub fn execute(target: &str, from: Option<Dialect>) -> Result<()> {
    match detect_target(target)? {
        Target::Directory(dir) => execute_directory(&dir, from),
        Target::SingleFile(file) => execute_single_file(&file, from),
    }
}

/// Check all source files under a directory
fn execute_directory(dir: &Path, from: Option<Dialect>) -> Result<()> {
    let start = Instant::now();

    let config = config::discover_config(dir)?;
    let from = from.or(config.translate.from);
    let files = discover_files(dir, from, &config.batch.exclude)?;

    if files.is_empty() {
        println!("{} No source files found in {}", "warning:".yellow().bold(), dir.display());
        return Ok(());
    }

    let mut errors: Vec<(PathBuf, String)> = Vec::new();
    let mut checked = 0;

    for file in &files {
        match check_file(&file.path, file.dialect) {
            Ok(()) => checked += 1,
            Err(e) => errors.push((file.path.clone(), e.to_string())),
        }
    }

    let elapsed = start.elapsed();

    if !errors.is_empty() {
        eprintln!("{} {} error(s) found:\n", "error:".red().bold(), errors.len());
        for (file, error) in &errors {
            eprintln!("  {} {}", file.display().to_string().yellow(), error);
        }
        anyhow::bail!("Check failed with {} error(s)", errors.len());
    }

    println!(
        "   {} {} file(s) in {:.2}s",
        "Checked".green().bold(),
        checked,
        elapsed.as_secs_f64()
    );

    Ok(())
}

fn execute_single_file(file: &Path, from: Option<Dialect>) -> Result<()> {
    let start = Instant::now();

    let config = config::discover_config(file)?;
    let dialect = source_dialect(file, from.or(config.translate.from))?;
    check_file(file, dialect)?;

    println!(
        "   {} {} in {:.2}s",
        "Checked".green().bold(),
        file.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Check a single file. Unclosed blocks are reported but do not fail the check.
fn check_file(path: &Path, dialect: Dialect) -> Result<()> {
    let source = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;

    let depth = translator::check(&source, dialect).map_err(|e| anyhow::anyhow!("{}", e))?;
    if depth > 0 {
        eprintln!(
            "{} {}: {} block(s) still open at end of file",
            "warning:".yellow().bold(),
            path.display(),
            depth
        );
    }

    Ok(())
}
