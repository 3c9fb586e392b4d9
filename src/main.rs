use clap::{Parser, Subcommand};
use codeshift::commands;
use codeshift::commands::convert::ConvertArgs;
use codeshift::translator::Dialect;
use colored::Colorize;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "codeshift")]
#[command(
    about = "Structural source converter between C#, VB.NET, Python and Delphi",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Log more detail to stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a file or a directory of files to another dialect
    /// A file prints to stdout unless --out is given; a directory is written to <dir>_<TAG>
    Convert {
        /// Path to a source file or directory
        target: String,
        /// Target dialect (cs, vb, py, pas)
        #[arg(long)]
        to: Option<Dialect>,
        /// Source dialect, when it cannot be inferred from the extension
        #[arg(long)]
        from: Option<Dialect>,
        /// Output file or directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Fail a file on its first warning
        #[arg(long)]
        strict: bool,
        /// Worker threads for directory conversion
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Lex and check block structure without converting
    Check {
        /// Path to a source file or directory (defaults to current directory)
        #[arg(default_value = ".")]
        target: String,
        /// Source dialect, when it cannot be inferred from the extension
        #[arg(long)]
        from: Option<Dialect>,
    },
    /// Write a commented codeshift.toml
    Init {
        /// Directory to create it in
        #[arg(default_value = ".")]
        dir: String,
    },
    /// List supported dialects
    Dialects,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert { target, to, from, out, strict, jobs } => {
            commands::convert::execute(&ConvertArgs {
                target,
                to,
                from,
                out,
                strict,
                jobs,
            })
        }
        Commands::Check { target, from } => {
            commands::check::execute(&target, from)
        }
        Commands::Init { dir } => {
            commands::init::execute(&dir)
        }
        Commands::Dialects => {
            commands::dialects::execute()
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
