use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use rundock::config::RundockConfig;
use rundock::logging::{self, LoggingOptions};

mod cmd;

#[derive(Parser)]
#[command(name = "rundock")]
#[command(version, about = "Run agent scripts in terminal slots and work with their output")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Process host URL. Overrides rundock.toml and RUNDOCK_HOST_URL.
    #[arg(long, global = true)]
    pub host_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Strip terminal artifacts from captured agent output
    Strip {
        /// Input file (reads stdin if omitted)
        file: Option<PathBuf>,

        /// Finalize as the document written to this path
        #[arg(long)]
        document: Option<String>,
    },
    /// Extract a structured record from agent stdout
    Extract {
        kind: ExtractKind,

        /// Input file (reads stdin if omitted)
        file: Option<PathBuf>,
    },
    /// Summarize or export a saved run history (JSON array of entries)
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Start a run on the process host and stream its log
    Run {
        /// Prompt ids to run (repeatable)
        #[arg(short, long = "prompt", required = true)]
        prompts: Vec<u32>,

        /// Project paths to run against (repeatable)
        #[arg(long = "project", required = true)]
        projects: Vec<String>,

        /// Run label; decides whether the run takes a terminal slot
        #[arg(short, long)]
        label: Option<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractKind {
    Ticket,
    Idea,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    StatsCsv,
}

#[derive(Subcommand, Clone)]
pub enum HistoryCommands {
    /// Print run counts and total duration
    Stats {
        file: PathBuf,

        /// Print the compact toolbar line instead of the summary
        #[arg(long)]
        toolbar: bool,
    },
    /// Export the history in another format
    Export {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default rundock.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Strip { file, document } => cmd::cmd_strip(file.as_deref(), document.as_deref())?,
        Commands::Extract { kind, file } => {
            if !cmd::cmd_extract(*kind, file.as_deref())? {
                std::process::exit(1);
            }
        }
        Commands::History { command } => cmd::cmd_history(command.clone())?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
        Commands::Run {
            prompts,
            projects,
            label,
        } => {
            let config =
                RundockConfig::with_cli_args(project_dir, cli.verbose, cli.host_url.clone())?;
            let guard = logging::init(&LoggingOptions::from_config(&config))?;
            let succeeded =
                cmd::cmd_run(&config, prompts.clone(), projects.clone(), label.clone()).await?;
            // Flush file logs; process::exit skips destructors.
            drop(guard);
            if !succeeded {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
