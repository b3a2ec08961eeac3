//! CleanCredit CLI - Main entry point

use anyhow::Context;
use cleancredit_cli::{commands, AppContext};
use cleancredit_report::ReportInput;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cleancredit")]
#[command(about = "CleanCredit - campus littering reports and points ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// JSON config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the identity slot pool
    Init,

    /// List all slots with balances
    Accounts,

    /// Attach a display name to a slot
    Claim {
        /// Slot ID (e.g. TAG_001)
        id: String,
        /// Display name
        name: String,
    },

    /// Report a scanned tag
    Scan {
        /// Reporter slot ID
        reporter: String,
        /// Scanned value: code, slot ID or QR payload
        value: String,
        /// Waste category, e.g. Plastic; classified reports earn a bonus
        #[arg(long)]
        waste: Option<String>,
        /// Free-text description
        #[arg(long)]
        description: Option<String>,
        /// Settle without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show an account's ledger history
    Ledger {
        /// Slot ID
        id: String,
        /// Number of recent entries to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rank claimed accounts by balance
    Leaderboard,

    /// Print codes and QR payloads for every slot
    Registry,

    /// List the badges an account holds
    Badges {
        /// Slot ID
        id: String,
    },

    /// Daily scan counts
    Trend,

    /// Verify cached balances against the ledger
    Reconcile,

    /// Export the audit trail as JSON lines
    Export {
        /// Output file
        file: PathBuf,
    },
}

fn prompt(label: &str) -> anyhow::Result<bool> {
    print!("Confirm report against {}? [y/N] ", label);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = AppContext::load_config(cli.config.as_deref())?;
    let ctx = AppContext::new(&cli.data, config)
        .await
        .context("Failed to open CleanCredit data directory")?;

    match cli.command {
        Commands::Init => {
            commands::init(&ctx).await?;
        }
        Commands::Accounts => {
            commands::accounts(&ctx).await?;
        }
        Commands::Claim { id, name } => {
            commands::claim(&ctx, &id, &name).await?;
        }
        Commands::Scan {
            reporter,
            value,
            waste,
            description,
            yes,
        } => {
            let input = ReportInput {
                description,
                waste_category: waste,
            };
            commands::scan(&ctx, &reporter, &value, input, |pending| {
                if yes {
                    Ok(true)
                } else {
                    prompt(&pending.reported_label)
                }
            })
            .await?;
        }
        Commands::Ledger { id, limit } => {
            let limit = limit.unwrap_or(ctx.config.views.recent_entries);
            commands::ledger(&ctx, &id, limit).await?;
        }
        Commands::Leaderboard => {
            commands::leaderboard(&ctx).await?;
        }
        Commands::Registry => {
            commands::registry(&ctx).await?;
        }
        Commands::Badges { id } => {
            commands::badges(&ctx, &id).await?;
        }
        Commands::Trend => {
            commands::trend(&ctx).await?;
        }
        Commands::Reconcile => {
            let report = commands::reconcile(&ctx).await?;
            if !report.is_consistent() {
                anyhow::bail!("Ledger inconsistent: {}", report);
            }
        }
        Commands::Export { file } => {
            commands::export(&ctx, &file).await?;
        }
    }

    Ok(())
}
