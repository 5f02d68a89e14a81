use anyhow::Result;
use clap::{Parser, Subcommand};

use pollen_gauge::cli::{self, GaugesArgs, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "pollen-gauge")]
#[command(about = "Particulate and pollen gauges from a sensor API")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch readings and draw one gauge per category
    Gauges {
        /// Day to show (YYYY-MM-DD); defaults to today, midnight to now
        #[arg(long)]
        date: Option<String>,
        /// Comma-separated category codes, e.g. POL,GRA (default: POL)
        #[arg(long)]
        categories: Option<String>,
        /// Aggregation interval: hour or day
        #[arg(long)]
        interval: Option<String>,
        /// Skip the cache and fetch from the API
        #[arg(long)]
        no_cache: bool,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Run the gauge dashboard in the browser
    Serve {
        /// Bind address (default: web.addr from config)
        #[arg(long)]
        addr: Option<String>,
        /// Open the dashboard in the default browser
        #[arg(long)]
        open: bool,
    },
    /// List known category codes
    Categories {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show recent fetches from the activity log
    History {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Inspect or clear the cached response
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum CacheAction {
    /// Show the cached response and whether it is fresh
    Show,
    /// Delete the cached response
    Clear,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.pollen-gauge/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value by dotted key, e.g. `api.url https://...`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Gauges {
            date,
            categories,
            interval,
            no_cache,
            format,
        } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            let args = GaugesArgs {
                date,
                categories,
                interval,
                no_cache,
            };
            cli::run_gauges(&args, fmt)
        }
        Commands::Serve { addr, open } => cli::run_serve(addr.as_deref(), open),
        Commands::Categories { format } => {
            cli::run_categories(OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::History { limit, format } => {
            cli::run_history(limit, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Cache { action } => match action {
            CacheAction::Show => cli::run_cache_show(),
            CacheAction::Clear => cli::run_cache_clear(),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
