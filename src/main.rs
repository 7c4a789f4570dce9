mod config;
mod duration;
mod provider;
mod session;
mod summary;
mod tokens;
mod usage;

use clap::{Parser, Subcommand};
use config::ProviderConfig;
use provider::CopilotProvider;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runs the gh copilot CLI on behalf of an eval harness and separates the
/// answer from the usage summary Copilot appends to it.
#[derive(Parser, Debug)]
#[command(name = "copilot-provider", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "copilot-provider.toml", global = true)]
    config: PathBuf,

    /// Extra logging (spawn details, parsed fields)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a test prompt and report token usage
    Call {
        prompt: String,
        /// Print the resolved command line, don't run
        #[arg(long)]
        dry_run: bool,
    },
    /// Grade a rubric prompt; usage stats are stripped from the verdict
    Judge {
        prompt: String,
        /// Print the resolved command line, don't run
        #[arg(long)]
        dry_run: bool,
    },
    /// Parse previously captured Copilot output (stdin when FILE is omitted)
    Parse {
        file: Option<PathBuf>,
        /// Only strip the usage block, don't decode it
        #[arg(long)]
        content_only: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    if let Err(message) = run(cli).await {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = ProviderConfig::load(&cli.config)
        .map_err(|e| e.to_string())?
        .apply_env(|key| std::env::var(key).ok());

    match cli.command {
        Command::Call { prompt, dry_run } => {
            let provider = CopilotProvider::new(config);
            if dry_run {
                print_dry_run(&provider.config().provider, &prompt, provider.config());
                return Ok(());
            }
            print_json(&provider.call_api(&prompt).await)
        }
        Command::Judge { prompt, dry_run } => {
            let provider = CopilotProvider::new(config);
            if dry_run {
                print_dry_run(&provider.config().judge, &prompt, provider.config());
                return Ok(());
            }
            print_json(&provider.judge(&prompt).await)
        }
        Command::Parse { file, content_only } => {
            let raw = read_input(file.as_deref())?;
            if content_only {
                println!("{}", summary::strip_usage_block(&raw));
                return Ok(());
            }
            let parsed = summary::summarize(&raw).map_err(|e| e.to_string())?;
            print_json(&parsed)
        }
    }
}

fn read_input(file: Option<&std::path::Path>) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(raw)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn print_dry_run(role: &config::RoleConfig, prompt: &str, config: &ProviderConfig) {
    println!("{}", session::describe_command(role, prompt));
    println!("cwd: {}", config.working_dir().display());
    println!("timeout: {}s", role.timeout_secs);
}
