use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::batch::{Batch, BatchJob, BatchReport, FileOutcome};
use crate::commands::{batch_progress, detect_target, source_dialect, Target};
use crate::config::{self, Config};
use crate::project::{default_output_dir, discover_files, output_path};
use crate::translator::{self, Dialect, Leniency, Warning};

/// Command-line choices for `convert`; anything left unset comes from codeshift.toml
#[derive(Debug, Clone, Default)]
pub struct ConvertArgs {
    pub target: String,
    pub to: Option<Dialect>,
    pub from: Option<Dialect>,
    pub out: Option<PathBuf>,
    pub strict: bool,
    pub jobs: Option<usize>,
}

pub fn execute(args: &ConvertArgs) -> Result<()> {
    let target = detect_target(&args.target)?;
    let path = match &target {
        Target::Directory(p) | Target::SingleFile(p) => p.clone(),
    };

    let mut config = config::discover_config(&path)?;
    if args.strict {
        config.translate.leniency = Leniency::Strict;
    }
    if let Some(jobs) = args.jobs {
        config.batch.jobs = jobs;
    }
    let to = args.to.or(config.translate.to).ok_or_else(|| {
        anyhow::anyhow!("No target dialect. Pass --to or set [translate] to in codeshift.toml")
    })?;
    let from = args.from.or(config.translate.from);

    match target {
        Target::SingleFile(file) => {
            execute_single_file(&file, from, to, args.out.as_deref(), &config)
        }
        Target::Directory(dir) => execute_directory(&dir, from, to, args.out.clone(), &config),
    }
}

/// Translate one file to stdout or `--out`
fn execute_single_file(
    file: &Path,
    from: Option<Dialect>,
    to: Dialect,
    out: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let source_dialect = source_dialect(file, from)?;
    let source = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;

    let options = config.options(source_dialect, to);
    let translation = translator::translate(&source, &options)
        .map_err(|failure| anyhow::anyhow!("{}: {}", file.display(), failure))?;

    print_warnings(file, &translation.warnings);

    match out {
        Some(out) => {
            write_output(out, &translation.output)?;
            eprintln!(
                "  {} {} ({} → {})",
                "Translated".green().bold(),
                out.display(),
                source_dialect,
                to
            );
        }
        None => print!("{}", translation.output),
    }

    Ok(())
}

/// Translate every file under `dir`, mirroring the layout under the output directory
fn execute_directory(
    dir: &Path,
    from: Option<Dialect>,
    to: Dialect,
    out: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let start = Instant::now();

    let files = discover_files(dir, from, &config.batch.exclude)
        .context("Failed to discover source files")?;
    if files.is_empty() {
        println!("{} No source files found in {}", "warning:".yellow().bold(), dir.display());
        return Ok(());
    }
    let out_dir = out.unwrap_or_else(|| default_output_dir(dir, to));

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }

    let jobs: Vec<BatchJob> = files
        .iter()
        .map(|f| BatchJob {
            path: f.path.clone(),
            dialect: f.dialect,
            output: output_path(&out_dir, &f.relative, to),
        })
        .collect();

    let pb = batch_progress(jobs.len(), "Translating");
    let batch = Batch {
        options: config.options(to, to),
        jobs: config.batch.jobs,
        cancel: &cancel,
        progress: Some(&pb),
    };
    let report = batch.run(&jobs, |path| fs::read_to_string(path));
    pb.finish_and_clear();

    let mut written = 0;
    for job in &jobs {
        if let Some(FileOutcome::Translated(translation)) = report.results.get(&job.path) {
            write_output(&job.output, &translation.output)?;
            written += 1;
        }
    }

    print_summary(&report, written, &out_dir, start);

    let failed = report.failed().len();
    if failed > 0 {
        anyhow::bail!("{} file(s) failed to translate", failed);
    }
    if cancel.load(Ordering::SeqCst) {
        anyhow::bail!("Interrupted; {} file(s) skipped", report.skipped().len());
    }
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).context(format!("Failed to write {}", path.display()))
}

fn print_warnings(file: &Path, warnings: &[Warning]) {
    for warning in warnings {
        eprintln!(
            "{} {}: {}",
            "warning:".yellow().bold(),
            file.display(),
            warning
        );
    }
}

fn print_summary(report: &BatchReport, written: usize, out_dir: &Path, start: Instant) {
    for (file, translation) in report.with_warnings() {
        print_warnings(file, &translation.warnings);
    }
    for (file, error) in report.failed() {
        eprintln!("{} {}: {}", "error:".red().bold(), file.display().to_string().yellow(), error);
    }

    println!(
        "  {} {} file(s) into {} in {:.2}s",
        "Translated".green().bold(),
        written,
        out_dir.display(),
        start.elapsed().as_secs_f64()
    );
    let with_warnings = report.with_warnings().len();
    if with_warnings > 0 {
        println!("  {} {} file(s) with warnings", "Warned".yellow().bold(), with_warnings);
    }
    let skipped = report.skipped().len();
    if skipped > 0 {
        println!("  {} {} file(s)", "Skipped".yellow().bold(), skipped);
    }
}
