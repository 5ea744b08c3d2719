// 🔁 Pipeline - Load → simulate → store, one function per command
//
// Every command opens with `prepare_database`, so a fresh file gets the
// schema and the standard reference rows before anything reads them.

use anyhow::{Context, Result};
use log::info;
use rusqlite::Connection;
use std::io::Write;

use crate::config::{ExportConfig, SimulationConfig};
use crate::db;
use crate::entities::{default_retailers, load_retailers_csv};
use crate::export::{self, ExportReport};
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::reference::ReferenceData;
use crate::scenario::ScenarioSummary;
use crate::simulator::{LedgerSimulator, SimulationSummary};

pub fn prepare_database(conn: &Connection) -> Result<ReferenceData> {
    db::setup_database(conn).context("Failed to set up database schema")?;
    db::seed_reference_data(conn, &ReferenceData::standard())?;
    db::load_reference_data(conn)
}

/// Build a simulator over everything already stored
fn load_simulator(conn: &Connection, config: &SimulationConfig) -> Result<LedgerSimulator> {
    let reference = prepare_database(conn)?;

    let retailers = match &config.retailers_csv {
        Some(path) => load_retailers_csv(path)?,
        None => default_retailers(),
    };
    db::insert_retailers(conn, &retailers)?;
    let retailers = db::load_retailers(conn)?;

    let population = db::load_population(conn, &reference)?;
    let ledger = db::load_ledger(conn, &reference)?;
    info!(
        "Loaded {} customers, {} accounts, {} transactions",
        population.customer_count(),
        population.account_count(),
        ledger.len()
    );

    Ok(LedgerSimulator::from_config(config.clone(), reference, retailers)?
        .with_dataset(population, ledger))
}

fn store(conn: &Connection, simulator: &LedgerSimulator) -> Result<()> {
    let rows = db::insert_population(conn, simulator.population())?;
    let transactions = db::insert_transactions(conn, simulator.ledger().transactions())?;
    info!(
        "Stored {} population rows and {} transactions",
        rows, transactions
    );
    Ok(())
}

/// Generate customers and their history, then persist them
pub fn generate(conn: &Connection, config: &SimulationConfig) -> Result<SimulationSummary> {
    let mut simulator = load_simulator(conn, config)?;
    let summary = simulator.run()?;
    store(conn, &simulator)?;
    Ok(summary)
}

/// Run a banking product's scenario for one customer, then persist it
pub fn scenario(
    conn: &Connection,
    config: &SimulationConfig,
    product_id: i64,
    customer_id: i64,
) -> Result<ScenarioSummary> {
    let mut simulator = load_simulator(conn, config)?;
    let product = db::load_banking_product(conn, simulator.reference(), product_id)?;
    let summary = simulator.generate_scenario(&product, customer_id)?;
    store(conn, &simulator)?;
    Ok(summary)
}

/// Register a banking product; returns its id
pub fn add_product(
    conn: &Connection,
    account_type: &str,
    product_name: &str,
    description: &str,
    generator_keywords: Option<&str>,
) -> Result<i64> {
    let reference = prepare_database(conn)?;
    let account_type = reference.account_type(account_type)?;
    let id = db::insert_banking_product(
        conn,
        account_type,
        product_name,
        description,
        generator_keywords,
    )?;
    info!("Added banking product {} ({}) as #{}", product_name, account_type, id);
    Ok(id)
}

pub fn export<W: Write>(conn: &Connection, config: &ExportConfig, writer: W) -> Result<ExportReport> {
    prepare_database(conn)?;
    export::export_pending(conn, config, writer)
}

/// Reconcile the stored ledger
pub fn verify(conn: &Connection) -> Result<ReconciliationReport> {
    let reference = prepare_database(conn)?;
    let ledger = db::load_ledger(conn, &reference)?;
    Ok(ReconciliationEngine::new().reconcile(&ledger))
}

// ============================================================================
// TESTS
// ============================================================================
