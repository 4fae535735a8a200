use clap::{Parser, Subcommand};
use eqlive_cli::{AppError, commands, logging};
use eqlive_core::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about = "EverQuest log overlay server")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail the newest log and push overlay events (default)
    Serve,
    /// Count kills and deaths in a single log file
    Scan {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List game logs with their character and size
    Files {
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e.report());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve(&cli.config).await,
        Commands::Scan { path, json } => commands::scan(&path, json),
        Commands::Files { dir } => commands::files(dir, &cli.config),
    }
}
