use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use engagement::analytics::compute_analytics;
use engagement::config::Config;
use engagement::storage::{self, StorageError};

#[derive(Parser)]
#[command(name = "engagement-admin")]
#[command(about = "Engagement service admin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tracked views
    Views {
        #[command(subcommand)]
        command: ViewCommands,
    },
    /// Show aggregate statistics for a user
    Stats {
        /// User ID
        user_id: i64,
    },
    /// Print engagement analytics for a user as JSON
    Analytics {
        /// User ID
        user_id: i64,
        /// Lookback window in days (defaults to ANALYTICS_DEFAULT_DAYS)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ViewCommands {
    /// List all views
    List,
    /// Register a new view
    Add {
        /// View name
        name: String,
    },
}

fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database).await?;

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Views {
            command: ViewCommands::List,
        } => {
            let views = storage.list_views().await?;
            if views.is_empty() {
                println!("No views registered.");
            } else {
                println!("{:<8} {}", "ID", "View Name");
                println!("{}", "-".repeat(40));
                for view in views {
                    println!("{:<8} {}", view.id, view.view_name);
                }
            }
        }
        Commands::Views {
            command: ViewCommands::Add { name },
        } => {
            let name = name.trim();
            anyhow::ensure!(!name.is_empty(), "View name must not be empty");

            match storage.create_view(name).await {
                Ok(view) => println!("✓ Created view '{}' with id {}", view.view_name, view.id),
                Err(StorageError::Conflict) => println!("⚠ View '{}' already exists", name),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Stats { user_id } => {
            let stats = storage.user_stats(user_id).await?;
            println!("Engagement stats for user {}", user_id);
            println!("  Sessions:      {}", stats.total_sessions);
            println!("  Total seconds: {}", stats.total_duration);
            println!("  Avg seconds:   {:.1}", stats.avg_duration);
            println!("  Unique views:  {}", stats.unique_views);
            println!(
                "  Last activity: {}",
                stats
                    .last_activity
                    .map(format_timestamp)
                    .unwrap_or_else(|| "never".to_string())
            );
        }
        Commands::Analytics { user_id, days } => {
            let days = config
                .analytics
                .window_days(days)
                .context("Invalid --days")?;

            let sessions: Vec<_> = storage
                .list_by_user(user_id, config.analytics.fetch_limit, 0)
                .await?
                .iter()
                .map(|log| log.to_session())
                .collect();

            let result = compute_analytics(&sessions, days, Utc::now());
            let json =
                serde_json::to_string_pretty(&result).context("Failed to serialize analytics")?;
            println!("{}", json);
        }
    }

    Ok(())
}
