mod seed;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "foodtruck-cli")]
#[command(about = "Food truck catalog command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Replace the vendor catalog from a permit CSV export
    Seed {
        /// CSV file to load (defaults to `FOODTRUCK_SEED_PATH`)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(Commands::Db { command }) = cli.command else {
        println!("foodtruck-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = foodtruck_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = foodtruck_db::PoolConfig::from_app_config(&config);
    let pool = foodtruck_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        DbCommands::Ping => {
            foodtruck_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = foodtruck_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed { file } => {
            foodtruck_db::run_migrations(&pool).await?;
            let path = file.unwrap_or_else(|| config.seed_path.clone());
            seed::run_db_seed(&pool, &path).await?;
        }
    }

    Ok(())
}
