//! Flakedoc CLI - the flaky test doctor at the command line.
//!
//! ## Commands
//!
//! - `classify`: label a pass/fail history (Stable/Flaky/Regressing)
//! - `suggest`: deterministic-fix hints for a test history
//! - `history`: convert pytest output into a history array
//! - `audit-verify`: check an audit log's hash chain

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flakedoc_core::audit::{verify_chain, AuditRecord};
use flakedoc_core::{classify_tokens, normalize, suggest_fixes};
use std::io::Read;
use std::path::PathBuf;
use tracing::Level;

mod pytest;

#[derive(Parser)]
#[command(name = "flakedoc")]
#[command(author = "Flakedoc Developers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flaky test doctor", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a pass/fail history
    Classify {
        /// History tokens ("pass"/"fail"); spaces or commas both work
        #[arg(required = true)]
        history: Vec<String>,
    },

    /// Suggest deterministic fixes for a test history
    Suggest {
        /// History tokens ("pass"/"fail"); spaces or commas both work
        #[arg(required = true)]
        history: Vec<String>,
    },

    /// Convert pytest output into a history array
    History {
        /// pytest output file (stdin when omitted)
        path: Option<PathBuf>,

        /// Filter to one test (substring of the node id)
        #[arg(long)]
        test: Option<String>,

        /// Output per-test histories as a JSON object
        #[arg(long)]
        by_test: bool,

        /// Count skipped outcomes as passes
        #[arg(long)]
        include_skipped: bool,
    },

    /// Verify an audit log's hash chain
    AuditVerify {
        /// Audit log path
        #[arg(env = "AUDIT_LOG", default_value = "audit.log")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Classify { history } => {
            let report = classify_tokens(&split_tokens(&history));
            println!("{}", serde_json::to_string(&report)?);
        }

        Commands::Suggest { history } => {
            let outcomes = normalize(&split_tokens(&history));
            let suggestions = suggest_fixes(&outcomes);
            println!("{}", serde_json::to_string(&suggestions)?);
        }

        Commands::History {
            path,
            test,
            by_test,
            include_skipped,
        } => {
            let text = read_input(path.as_deref())?;
            let per_test = pytest::parse_plaintext(&text, include_skipped);

            if let Some(query) = test {
                match pytest::best_match(&per_test, &query) {
                    Some((_, history)) => println!("{}", serde_json::to_string(history)?),
                    // Fall back to the suite history, then to empty.
                    None => match per_test.get(pytest::SUITE_KEY) {
                        Some(suite) => println!("{}", serde_json::to_string(suite)?),
                        None => println!("[]"),
                    },
                }
            } else if by_test {
                println!("{}", serde_json::to_string_pretty(&per_test)?);
            } else if let Some(suite) = per_test.get(pytest::SUITE_KEY) {
                println!("{}", serde_json::to_string(suite)?);
            } else {
                // No suite entry: aggregate every per-test history.
                let aggregate: Vec<&String> = per_test
                    .values()
                    .flat_map(|history| history.iter())
                    .collect();
                println!("{}", serde_json::to_string(&aggregate)?);
            }
        }

        Commands::AuditVerify { path } => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("reading audit log {}", path.display()))?;
            let mut records: Vec<AuditRecord> = Vec::new();
            for (lineno, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record = serde_json::from_str(line)
                    .with_context(|| format!("parsing audit entry on line {}", lineno + 1))?;
                records.push(record);
            }
            match verify_chain(&records) {
                Ok(()) => println!("audit chain OK: {} entries", records.len()),
                Err(err) => bail!("audit chain verification failed: {err}"),
            }
        }
    }

    Ok(())
}

/// Flatten history args, allowing `pass,fail` as well as `pass fail`.
fn split_tokens(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(','))
        .map(str::to_string)
        .collect()
}

/// Read a file, or stdin when no path was given.
fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            Ok(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tokens_handles_commas_and_spaces() {
        let args = vec!["pass,fail".to_string(), "pass".to_string()];
        assert_eq!(split_tokens(&args), vec!["pass", "fail", "pass"]);
    }
}
