/*!
 * Completion CLI
 *
 * Command-line front end for the completion engine: resolve suggestions for
 * a partial command line, validate spec files, and parse installer listings.
 * Emits JSON for integration with shells and test pipelines.
 */

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use completion_core::installers::{parse_installers, SizeUnits};
use completion_core::structured_log::{init_logger, LogLevel};
use completion_core::{CompletionEngine, EngineConfig, Suggestion};
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Overrides the configured minimum log level
const LOG_ENV: &str = "COMPLETION_LOG";

#[derive(Parser)]
#[command(name = "completion_cli")]
#[command(about = "Spec-driven command line completion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// Directory of JSON/YAML completion specs (repeatable)
    #[arg(long = "spec-dir")]
    spec_dirs: Vec<PathBuf>,

    /// Engine config file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest completions for a partial command line
    Complete {
        /// The command line typed so far
        line: String,

        /// Cursor byte offset (end of line if not provided)
        #[arg(long)]
        cursor: Option<usize>,

        /// Working directory for generator scripts
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Emit JSON instead of tab-separated lines
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// List commands with a completion spec
    List {
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Validate specs; exits 1 if any spec is malformed
    Check {
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Parse `softwareupdate --list-full-installers` output from stdin
    ParseInstallers {
        /// Size conversion: faithful, decimal or binary
        #[arg(short, long, default_value = "faithful")]
        units: SizeUnits,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Complete {
            line,
            cursor,
            cwd,
            json,
            engine,
        } => {
            let engine = build_engine(&engine)?;
            let cursor = cursor.unwrap_or(line.len());
            let suggestions = engine.complete_in(&line, cursor, cwd.as_deref()).await;
            print_suggestions(&suggestions, json)?;
            Ok(true)
        }
        Commands::List { engine } => {
            let engine = build_engine(&engine)?;
            let mut out = io::stdout().lock();
            for name in engine.list_commands() {
                writeln!(out, "{}", name)?;
            }
            Ok(true)
        }
        Commands::Check { engine } => {
            let engine = build_engine(&engine)?;
            let mut clean = true;
            let mut out = io::stdout().lock();
            for name in engine.list_commands() {
                let issues = engine.issues_for(name);
                if issues.is_empty() {
                    writeln!(out, "ok       {}", name)?;
                    continue;
                }
                clean = false;
                writeln!(out, "invalid  {}", name)?;
                for issue in issues {
                    writeln!(out, "  - {}", issue)?;
                }
            }
            Ok(clean)
        }
        Commands::ParseInstallers { units } => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            let suggestions = parse_installers(&input, units);
            let pairs: Vec<serde_json::Value> = suggestions
                .iter()
                .map(|s| serde_json::json!({ "name": s.name, "description": s.description }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&pairs)?);
            Ok(true)
        }
        Commands::Version => {
            println!("completion_cli v{}", env!("CARGO_PKG_VERSION"));
            Ok(true)
        }
    }
}

fn build_engine(args: &EngineArgs) -> Result<CompletionEngine> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Ok(level) = std::env::var(LOG_ENV) {
        config.log.min_level = level
            .parse::<LogLevel>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid {}", LOG_ENV))?;
    }
    init_logger(config.log.clone());

    let mut engine = CompletionEngine::with_config(config);
    for dir in &args.spec_dirs {
        engine
            .load_from_directory(dir)
            .with_context(|| format!("failed to load specs from {}", dir.display()))?;
    }
    Ok(engine)
}

fn print_suggestions(suggestions: &[Suggestion], json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(suggestions)?)?;
        return Ok(());
    }
    for s in suggestions {
        writeln!(out, "{}\t{}", s.name, s.description.as_deref().unwrap_or(""))?;
    }
    Ok(())
}
