// Ledger Simulator - Core Library
// Exposes all modules for use in the CLI and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod export;
pub mod ledger;
pub mod pipeline;
pub mod population;
pub mod reconciliation;
pub mod reference;
pub mod scenario;
pub mod simulator;
pub mod synthetic;

// Re-export commonly used types
pub use config::{AppConfig, ExportConfig, SimulationConfig, ValueRange};
pub use db::{
    insert_banking_product, insert_population, insert_retailers, insert_transactions,
    load_banking_products, load_ledger, load_population, load_reference_data, load_retailers,
    seed_reference_data, setup_database, verify_count,
};
pub use entities::{
    AccountTransaction, AccountType, Address, BankAccount, BankingProduct, Customer, Operator,
    Retailer, TransactionCategory, TransactionType,
};
pub use export::{export_pending, DocumentBuilder, ExportReport, ProductDocument, TransactionDocument};
pub use ledger::{Ledger, Posting};
pub use population::Population;
pub use reconciliation::{
    Discrepancy, DiscrepancyCategory, ReconciliationEngine, ReconciliationReport,
    ReconciliationResult,
};
pub use reference::{CategoryWeights, ReferenceData};
pub use scenario::ScenarioSummary;
pub use simulator::{DaySummary, LedgerSimulator, SimulationSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
