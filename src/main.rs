//! Fracht Console maintenance entry point
//!
//! Usage: `fracht-console [--config <path>] <list|reindex>`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use fracht_console_lib::config::AppConfig;
use fracht_console_lib::domain::ordering::{sort_assets, SortMode};
use fracht_console_lib::repository::GalleryStore;
use fracht_console_lib::AppState;

#[derive(Parser, Debug)]
#[command(name = "fracht-console", version, about = "Fracht Console maintenance")]
struct Cli {
    /// Configuration file; storage paths resolve against its directory
    #[arg(short, long, default_value = "fracht.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print assets in gallery order
    List,
    /// Re-number display order densely from 0
    Reindex,
}

async fn run(config_path: &Path, command: Command) -> Result<(), String> {
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let config = AppConfig::load(config_path)
        .map_err(|e| e.to_string())?
        .rooted_at(base);

    if let Err(e) = rolling_logger::init_logger_with(
        config.logging.dir.clone(),
        &config.logging.app_name,
        config.logging.logger_config(),
    ) {
        eprintln!("Logging disabled: {}", e);
    }

    let (state, _notices) = AppState::open(config).await.map_err(|e| e.to_string())?;

    match command {
        Command::List => {
            let mut assets = state.assets.list_assets().await.map_err(|e| e.to_string())?;
            sort_assets(&mut assets, SortMode::Manual);
            for asset in assets {
                println!(
                    "{:>5} {:>4} {} {:<5} {}",
                    asset.id,
                    asset.display_order,
                    if asset.pinned { "*" } else { " " },
                    asset.rating.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
                    asset.title
                );
            }
        }
        Command::Reindex => {
            let updates = state.assets.reindex_assets().await.map_err(|e| e.to_string())?;
            log::info!("Reindexed {} assets", updates.len());
            println!("Reindexed {} assets", updates.len());
        }
    }

    state.db_state.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli.config, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
