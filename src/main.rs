//! tcg-client - TCGplayer catalog and pricing API CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tcg_client::commands::catalog::parse_filter;
use tcg_client::commands::{AuthCommand, CatalogCommand, CatalogQuery, PricingCommand};
use tcg_client::config::{Config, OutputFormat};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tcg-client",
    version,
    about = "TCGplayer catalog and pricing API client",
    long_about = "Query TCGplayer categories, products and market prices. Credentials come from \
                  the config file or TCG_PLAYER_API_PUBLIC_KEY / TCG_PLAYER_API_PRIVATE_KEY."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "TCG_PROXY")]
    proxy: Option<String>,

    /// Do not re-authenticate when the bearer token is rejected
    #[arg(long, global = true)]
    noretry: bool,

    /// File to keep the bearer token in between runs
    #[arg(long, global = true, env = "TCG_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a bearer token and print it
    Auth,

    /// List categories
    Categories {
        /// Page size
        #[arg(short, long)]
        limit: Option<u64>,

        /// Index of the first category
        #[arg(short, long)]
        offset: Option<u64>,

        /// Walk every page
        #[arg(short, long)]
        all: bool,
    },

    /// Show category details
    Category {
        /// Category id(s)
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Show sort options and filters for a category search
    Manifest {
        /// Category id
        category_id: u64,
    },

    /// Search a category for product ids
    #[command(alias = "s")]
    Search {
        /// Category id
        category_id: u64,

        /// Sort value from the manifest
        #[arg(long)]
        sort: Option<String>,

        /// Page size
        #[arg(short, long)]
        limit: Option<u64>,

        /// Filter as NAME=VALUE (repeatable)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Walk every page
        #[arg(short, long)]
        all: bool,
    },

    /// Show product details
    #[command(alias = "p")]
    Products {
        /// Product id(s)
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Show market prices grouped by product
    Prices {
        /// Product id(s)
        #[arg(required = true)]
        ids: Vec<u64>,

        /// Hide subtypes without any price
        #[arg(long)]
        valid_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if cli.noretry {
        config.noretry = true;
    }
    if let Some(path) = cli.token_file {
        config.token_file = Some(path);
    }

    let output = match cli.command {
        Commands::Auth => AuthCommand::new(config).execute().await?,

        Commands::Categories { limit, offset, all } => {
            CatalogCommand::new(config)
                .execute(&CatalogQuery::Categories { limit, offset, all })
                .await?
        }

        Commands::Category { ids } => {
            CatalogCommand::new(config).execute(&CatalogQuery::Category { ids }).await?
        }

        Commands::Manifest { category_id } => {
            CatalogCommand::new(config).execute(&CatalogQuery::Manifest { category_id }).await?
        }

        Commands::Search { category_id, sort, limit, filters, all } => {
            CatalogCommand::new(config)
                .execute(&CatalogQuery::Search { category_id, sort, limit, filters, all })
                .await?
        }

        Commands::Products { ids } => {
            CatalogCommand::new(config).execute(&CatalogQuery::Products { ids }).await?
        }

        Commands::Prices { ids, valid_only } => {
            PricingCommand::new(config).execute(&ids, valid_only).await?
        }
    };

    println!("{}", output);

    Ok(())
}
