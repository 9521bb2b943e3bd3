//! Easel - generative sketch studio CLI
//!
//! ## Commands
//!
//! - `run`: run one generation cycle for the current period
//! - `render`: execute a single sketch program in the sandbox
//! - `judge-parse`: parse a saved judgment against a list of candidate ids
//! - `ledger`: print the preference history the judge sees
//! - `config`: print the effective configuration

mod settings;
mod wiring;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use easel_core::{
    BatchOrchestrator, Capabilities, CycleOutcome, CycleReport, FileLedger,
    JudgmentParser, PreferenceLedger, ProgramExtractor, SandboxExecutor,
};
use tracing::{info, Level};

use settings::{Settings, DEFAULT_CONFIG_PATH};
use wiring::Secrets;

#[derive(Parser)]
#[command(name = "easel")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generative sketch studio", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: easel.toml, optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one generation cycle
    Run {
        /// Model API key
        #[arg(long, env = "EASEL_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Bearer token for the HTTP status sink
        #[arg(long, env = "EASEL_STATUS_TOKEN", hide_env_values = true)]
        status_token: Option<String>,

        /// Pretend the cycle starts at this local time (e.g. 2026-01-24T13:05:00)
        #[arg(long)]
        at: Option<NaiveDateTime>,

        /// Print the full cycle report as JSON
        #[arg(long)]
        report: bool,
    },

    /// Execute one sketch program and write its PNG
    Render {
        /// Program file
        program: PathBuf,

        /// Output image (default: program path with .png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Deadline in milliseconds (default: from config)
        #[arg(long)]
        deadline_ms: Option<u64>,
    },

    /// Parse a judgment text (file or `-` for stdin)
    JudgeParse {
        input: PathBuf,

        /// Rendered candidate ids in batch order
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        /// Maximum reasoning length (default: from config)
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Print the preference history
    Ledger,

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    easel_core::init_tracing(cli.json, level);

    let explicit = cli.config.is_some();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let settings = Settings::load(&config_path, explicit)?;

    match cli.command {
        Commands::Run {
            api_key,
            status_token,
            at,
            report,
        } => {
            let secrets = Secrets {
                api_key,
                status_token,
            };
            cmd_run(settings, secrets, at, report).await
        }
        Commands::Render {
            program,
            output,
            deadline_ms,
        } => cmd_render(&settings, &program, output, deadline_ms).await,
        Commands::JudgeParse {
            input,
            ids,
            max_chars,
        } => cmd_judge_parse(&settings, &input, &ids, max_chars),
        Commands::Ledger => cmd_ledger(&settings).await,
        Commands::Config => cmd_config(&settings),
    }
}

async fn cmd_run(
    settings: Settings,
    secrets: Secrets,
    at: Option<NaiveDateTime>,
    report: bool,
) -> Result<()> {
    let collaborators = wiring::collaborators(&settings, secrets)?;
    let orchestrator = BatchOrchestrator::new(settings.studio.clone(), collaborators)
        .context("Failed to set up orchestrator")?;

    let cycle = match at {
        Some(at) => orchestrator.run_cycle(at).await,
        None => orchestrator.run_cycle_now().await,
    }
    .context("Cycle failed")?;

    if report {
        println!("{}", serde_json::to_string_pretty(&cycle)?);
    } else {
        print_summary(&cycle);
    }
    Ok(())
}

fn print_summary(cycle: &CycleReport) {
    println!("Cycle {} ({})", cycle.cycle_id, cycle.period.slug());
    println!("  Output:    {}", cycle.output_dir.display());
    println!(
        "  Rendered:  {}/{} ({} failed)",
        cycle.rendered(),
        cycle.generated,
        cycle.failed()
    );
    for (id, outcome) in &cycle.batch.failed {
        println!("    {id}: {} - {}", outcome.status, outcome.message);
    }

    match &cycle.outcome {
        CycleOutcome::Done {
            winner,
            judgment,
            promotion,
        } => {
            println!("  Winner:    {} ({})", winner.id, winner.theme);
            println!("  Score:     {}", judgment.score_label());
            println!("  Reasoning: {}", judgment.reasoning);
            match &promotion.display {
                Ok(()) => println!("  Display:   ok"),
                Err(e) => println!("  Display:   failed ({e})"),
            }
            match &promotion.publish {
                Ok(msg) => println!("  Gallery:   {msg}"),
                Err(e) => println!("  Gallery:   failed ({e})"),
            }
            println!(
                "  Ledger:    {}",
                if promotion.recorded { "recorded" } else { "not recorded" }
            );
        }
        CycleOutcome::Aborted { reason } => {
            println!("  Aborted:   {reason}");
        }
    }
    println!("  Duration:  {}ms", cycle.duration_ms);
}

async fn cmd_render(
    settings: &Settings,
    program: &Path,
    output: Option<PathBuf>,
    deadline_ms: Option<u64>,
) -> Result<()> {
    let text = tokio::fs::read_to_string(program)
        .await
        .with_context(|| format!("Failed to read {}", program.display()))?;
    let output = output.unwrap_or_else(|| program.with_extension("png"));
    let deadline = deadline_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.studio.deadline());

    let source = ProgramExtractor::new()?.extract(&text);
    let outcome = SandboxExecutor::new(Capabilities::standard())
        .execute(&source, &output, deadline)
        .await;
    info!(status = %outcome.status, elapsed_ms = outcome.elapsed_ms, "render finished");

    if !outcome.is_success() {
        bail!("{}: {}", outcome.status, outcome.message);
    }
    println!("Wrote {} in {}ms", output.display(), outcome.elapsed_ms);
    Ok(())
}

fn cmd_judge_parse(
    settings: &Settings,
    input: &Path,
    ids: &[String],
    max_chars: Option<usize>,
) -> Result<()> {
    let text = read_input(input)?;
    let parser = JudgmentParser::new(
        &settings.studio.id_prefix,
        max_chars.unwrap_or(settings.studio.reasoning_max_chars),
    )?;

    let ids: Vec<String> = ids.iter().map(|id| id.trim().to_string()).collect();
    let result = parser.parse(&text, &ids);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

async fn cmd_ledger(settings: &Settings) -> Result<()> {
    let ledger = FileLedger::new(&settings.ledger.path);
    let history = ledger
        .read_all()
        .await
        .with_context(|| format!("Failed to read {}", ledger.path().display()))?;
    println!("{history}");
    Ok(())
}

fn cmd_config(settings: &Settings) -> Result<()> {
    print!("{}", settings.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_judge_parse_splits_ids() {
        let cli = Cli::try_parse_from([
            "easel",
            "judge-parse",
            "-",
            "--ids",
            "sketch_000,sketch_002",
        ])
        .unwrap();
        match cli.command {
            Commands::JudgeParse { ids, .. } => assert_eq!(ids, vec!["sketch_000", "sketch_002"]),
            _ => panic!("expected judge-parse"),
        }
    }

    #[test]
    fn test_run_accepts_fixed_time() {
        let cli =
            Cli::try_parse_from(["easel", "run", "--at", "2026-01-24T13:05:00"]).unwrap();
        match cli.command {
            Commands::Run { at, .. } => assert!(at.is_some()),
            _ => panic!("expected run"),
        }
    }
}
