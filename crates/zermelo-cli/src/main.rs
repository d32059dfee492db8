use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zermelo_api::{ScheduleClient, ZermeloError};
use zermelo_auth::FileTokenStore;
use zermelo_core::Config;

#[derive(Parser)]
#[command(name = "zermelo", about = "Fetch schedules from a Zermelo portal")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange an authorization code for an access token
    Login {
        user: String,
        code: String,
        /// Print the token without caching it
        #[arg(long)]
        no_save: bool,
    },
    /// Show the appointment grid
    Grid {
        id: String,
        #[arg(long, default_value_t = 1)]
        weeks: u32,
    },
    /// Show only cancelled classes
    Cancelled {
        id: String,
        #[arg(long, default_value_t = 1)]
        weeks: u32,
    },
    /// Show announcements
    Announcements {
        id: String,
        #[arg(long, default_value_t = 1)]
        weeks: u32,
    },
    /// Log the cached token out of the portal
    Logout { id: String },
    /// Remove every cached token
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    zermelo_core::init()?;

    let cli = Cli::parse();
    let (config, _) = Config::load_validated(cli.config.as_deref())?;

    let store = FileTokenStore::create(&config.cache.path)
        .with_context(|| format!("Failed to open token cache {:?}", config.cache.path))?;
    let client = ScheduleClient::from_config(&config.api, Arc::new(store))?;

    run(&client, cli.command).await.map_err(report)
}

/// Friendly message for the user; the full error only goes to the debug log.
fn report(e: ZermeloError) -> anyhow::Error {
    tracing::debug!("Command failed: {}", e);
    anyhow::anyhow!(e.user_message())
}

async fn run(client: &ScheduleClient, command: Commands) -> Result<(), ZermeloError> {
    match command {
        Commands::Login {
            user,
            code,
            no_save,
        } => {
            let token = client.grab_access_token(&user, &code, !no_save).await?;
            print_json(&token);
        }
        Commands::Grid { id, weeks } => {
            let grid = client.student_grid_ahead(&id, weeks).await?;
            print_json(&grid);
        }
        Commands::Cancelled { id, weeks } => {
            let grid = client.student_grid_ahead(&id, weeks).await?;
            print_json(&client.cancelled_classes(&grid));
        }
        Commands::Announcements { id, weeks } => {
            let announcements = client.announcements_ahead(&id, weeks).await?;
            print_json(&announcements);
        }
        Commands::Logout { id } => {
            if client.invalidate_access_token(&id).await? {
                println!("Logged out {}", id);
            } else {
                println!("The portal did not accept the logout for {}", id);
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                println!("Pass --yes to remove every cached token");
            }
            client.reset_cache(yes)?;
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("Failed to render output: {}", e),
    }
}
