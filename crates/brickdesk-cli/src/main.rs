mod catalog;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "brickdesk")]
#[command(about = "brickdesk LEGO resale back office")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Marketplace synchronisation.
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Find Amazon ASINs for catalogue sets through Keepa.
    DiscoverAsins {
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 100)]
        limit: i64,
        /// Keep paging until nothing is left.
        #[arg(long)]
        all: bool,
    },
    /// Fill missing UK RRPs from Brickset, Amazon, Keepa history and regional prices.
    BackfillRrp {
        #[arg(long)]
        skip_brickset: bool,
    },
    /// Print current Keepa prices for the given sets as CSV.
    KeepaExport {
        #[arg(required = true)]
        set_numbers: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Migrate,
    Ping,
}

#[derive(Debug, Subcommand)]
enum SyncCommands {
    /// Run every configured platform job once.
    Full {
        /// Tenant to sync; defaults to `BRICKDESK_SYNC_USER_ID`.
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Drain the Amazon price/quantity queue with the two-phase sync.
    Amazon {
        #[arg(long)]
        user: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("nothing to do; run `brickdesk --help`");
        return Ok(());
    };

    let config = brickdesk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = brickdesk_db::PoolConfig::from_app_config(&config);
    let pool = brickdesk_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = brickdesk_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            brickdesk_db::ping(&pool).await?;
            println!("database reachable");
        }
        Commands::Sync {
            command: SyncCommands::Full { user },
        } => {
            let user = sync::resolve_user(user, &config)?;
            sync::run_full(&pool, &config, user).await?;
        }
        Commands::Sync {
            command: SyncCommands::Amazon { user },
        } => {
            let user = sync::resolve_user(user, &config)?;
            sync::run_amazon(&pool, &config, user).await?;
        }
        Commands::DiscoverAsins { offset, limit, all } => {
            catalog::run_discover_asins(&pool, &config, offset, limit, all).await?;
        }
        Commands::BackfillRrp { skip_brickset } => {
            catalog::run_backfill_rrp(&pool, &config, skip_brickset).await?;
        }
        Commands::KeepaExport { set_numbers } => {
            catalog::run_keepa_export(&pool, &config, &set_numbers).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
