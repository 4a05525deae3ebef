//! CLI command definitions and handlers

mod analyze;
mod history;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shannon Insight - evidence-backed code quality findings
#[derive(Parser, Debug)]
#[command(name = "shannon-insight")]
#[command(
    version,
    about = "Quantitative code-quality analysis over scanner facts and git history",
    after_help = "\
Examples:
  shannon-insight analyze facts.json --save     Analyze and record a snapshot
  shannon-insight history --limit 5             Recent snapshots
  shannon-insight diff                          Baseline (or previous) vs latest
  shannon-insight baseline set 3                Pin snapshot 3 as the baseline
  shannon-insight scope facts.json --changed src/a.py,src/b.py"
)]
pub struct Cli {
    /// Repository root: config, git history and the snapshot store live here
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Log level (error, warn, info, debug, trace); RUST_LOG wins when set
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the analyzers and finders over a facts bundle
    Analyze {
        /// Scanner output (JSON facts bundle)
        facts: PathBuf,

        /// Store the result as a snapshot
        #[arg(long)]
        save: bool,

        /// Maximum findings to report (defaults to the configured cap)
        #[arg(long)]
        max_findings: Option<usize>,

        /// Do not read git history from the repository
        #[arg(long)]
        no_git: bool,

        /// Print phase progress to stderr
        #[arg(long)]
        progress: bool,
    },

    /// List stored snapshots, newest first
    History {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Compare two snapshots
    Diff {
        /// Old snapshot id (default: baseline, else the one before latest)
        #[arg(long)]
        from: Option<u64>,

        /// New snapshot id (default: latest)
        #[arg(long)]
        to: Option<u64>,

        /// Renamed file as OLD=NEW (repeatable)
        #[arg(long = "rename", value_parser = parse_rename)]
        renames: Vec<(String, String)>,
    },

    /// Manage the baseline snapshot pointer
    Baseline {
        #[command(subcommand)]
        action: BaselineAction,
    },

    /// Metric trends and long-lived findings across stored snapshots
    Trend {
        #[command(subcommand)]
        query: TrendQuery,
    },

    /// Risk report for a set of changed files
    Scope {
        /// Scanner output (JSON facts bundle)
        facts: PathBuf,

        /// Changed files, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        changed: Vec<String>,

        #[arg(long)]
        no_git: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BaselineAction {
    /// Point the baseline at a snapshot id
    Set { id: u64 },
    /// Remove the baseline pointer
    Clear,
    /// Show the baseline snapshot
    Show,
}

#[derive(Subcommand, Debug)]
pub enum TrendQuery {
    /// One file's signal over recent snapshots
    File {
        path: String,
        #[arg(long, default_value = "cognitive_load")]
        metric: String,
        #[arg(long, default_value = "20")]
        last: usize,
    },
    /// Global signals and finding counts over recent snapshots
    Health {
        #[arg(long, default_value = "20")]
        last: usize,
    },
    /// Files whose signal moved most over recent snapshots
    Movers {
        #[arg(long, default_value = "cognitive_load")]
        metric: String,
        #[arg(long, default_value = "5")]
        last: usize,
    },
    /// Active findings seen in many snapshots
    Chronic {
        #[arg(long, default_value = "3")]
        min: u32,
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Findings present in consecutive snapshots
    Persistent {
        #[arg(long, default_value = "3")]
        min: usize,
    },
}

fn parse_rename(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((old, new)) if !old.is_empty() && !new.is_empty() => Ok((old.to_string(), new.to_string())),
        _ => Err(format!("'{s}' is not OLD=NEW")),
    }
}

/// Pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            facts,
            save,
            max_findings,
            no_git,
            progress,
        } => analyze::run(&cli.repo, &facts, save, max_findings, no_git, progress),
        Commands::History { limit } => history::list(&cli.repo, limit),
        Commands::Diff { from, to, renames } => history::diff(&cli.repo, from, to, renames),
        Commands::Baseline { action } => history::baseline(&cli.repo, action),
        Commands::Trend { query } => history::trend(&cli.repo, query),
        Commands::Scope { facts, changed, no_git } => analyze::scope(&cli.repo, &facts, changed, no_git),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rename() {
        assert_eq!(parse_rename("a.py=b.py").unwrap(), ("a.py".to_string(), "b.py".to_string()));
        assert!(parse_rename("a.py").is_err());
        assert!(parse_rename("=b").is_err());
    }

    #[test]
    fn test_cli_parses_scope() {
        let cli = Cli::try_parse_from(["shannon-insight", "scope", "f.json", "--changed", "a.py,b.py"]).unwrap();
        match cli.command {
            Commands::Scope { changed, .. } => assert_eq!(changed, vec!["a.py", "b.py"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cli_baseline_set() {
        let cli = Cli::try_parse_from(["shannon-insight", "--repo", "/r", "baseline", "set", "4"]).unwrap();
        assert_eq!(cli.repo, PathBuf::from("/r"));
        assert!(matches!(cli.command, Commands::Baseline { action: BaselineAction::Set { id: 4 } }));
    }

    #[test]
    fn test_cli_trend_defaults() {
        let cli = Cli::try_parse_from(["shannon-insight", "trend", "file", "a.py"]).unwrap();
        match cli.command {
            Commands::Trend {
                query: TrendQuery::File { path, metric, last },
            } => assert_eq!((path.as_str(), metric.as_str(), last), ("a.py", "cognitive_load", 20)),
            other => panic!("unexpected {other:?}"),
        }
        let cli = Cli::try_parse_from(["shannon-insight", "trend", "chronic", "--min", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::Trend { query: TrendQuery::Chronic { min: 5, limit: 10 } }));
    }
}
