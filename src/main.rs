use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use rusqlite::Connection;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use ledger_simulator::{pipeline, AppConfig};

#[derive(Parser)]
#[command(name = "ledger-simulator")]
#[command(author, version, about = "Synthetic banking ledger generator", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create customers and simulate their transaction history
    Generate {
        /// Number of customers to create
        customers: usize,

        /// Months of history (30 days each)
        months: u32,

        /// Minimum transactions per account per day
        min_tx: u32,

        /// Maximum transactions per account per day
        max_tx: u32,

        /// Random seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Semicolon-delimited retailer CSV
        #[arg(long)]
        retailers: Option<PathBuf>,

        /// Last simulated day (YYYY-MM-DD, default today)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },

    /// Generate a banking product's scenario for one customer
    Scenario {
        /// Banking product id
        product_id: i64,

        /// Customer id (defaults to demo_customer_id from the config)
        #[arg(long)]
        customer: Option<i64>,

        /// Random seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Register a banking product
    AddProduct {
        /// Account type name (Transmission, Savings, Credit)
        account_type: String,

        /// Product name
        name: String,

        /// Product description
        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated scenario keywords ("salary,bonus")
        #[arg(long)]
        keywords: Option<String>,
    },

    /// Write un-exported records as NDJSON and mark them exported
    Export {
        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile every account chain and transfer pair
    Verify,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }

    let conn = Connection::open(&config.database)
        .with_context(|| format!("Failed to open database {}", config.database.display()))?;

    match cli.command {
        Commands::Generate {
            customers,
            months,
            min_tx,
            max_tx,
            seed,
            retailers,
            end_date,
        } => {
            let mut simulation = config.simulation;
            simulation.customer_count = customers;
            simulation.months = months;
            simulation.min_daily_transactions = min_tx;
            simulation.max_daily_transactions = max_tx;
            simulation.seed = seed.or(simulation.seed);
            simulation.retailers_csv = retailers.or(simulation.retailers_csv);
            simulation.end_date = end_date.or(simulation.end_date);

            let summary = pipeline::generate(&conn, &simulation)?;
            info!(
                "✓ {} customers, {} accounts, {} transactions over {} days",
                summary.customers_created,
                summary.accounts_created,
                summary.totals.transactions(),
                summary.days_simulated
            );
        }

        Commands::Scenario {
            product_id,
            customer,
            seed,
        } => {
            let customer_id = customer
                .or(config.demo_customer_id)
                .context("No customer given and no demo_customer_id configured")?;
            let mut simulation = config.simulation;
            simulation.seed = seed.or(simulation.seed);

            let summary = pipeline::scenario(&conn, &simulation, product_id, customer_id)?;
            info!(
                "✓ Scenario {}: {} transactions for customer {}",
                summary.product, summary.transactions, summary.customer_id
            );
        }

        Commands::AddProduct {
            account_type,
            name,
            description,
            keywords,
        } => {
            let id = pipeline::add_product(
                &conn,
                &account_type,
                &name,
                &description,
                keywords.as_deref(),
            )?;
            println!("{}", id);
        }

        Commands::Export { output } => {
            let report = match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    pipeline::export(&conn, &config.export, BufWriter::new(file))?
                }
                None => pipeline::export(&conn, &config.export, io::stdout().lock())?,
            };
            info!(
                "✓ Exported {} transactions and {} products",
                report.transactions, report.products
            );
        }

        Commands::Verify => {
            let report = pipeline::verify(&conn)?;
            for discrepancy in &report.discrepancies {
                println!("✗ account {}: {}", discrepancy.account_id, discrepancy.description);
            }
            println!("{}", report.summary());
            if !report.is_balanced() {
                anyhow::bail!("Ledger does not reconcile");
            }
        }
    }

    Ok(())
}
