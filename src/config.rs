// ⚙️ Configuration - Explicit settings passed into the simulator
//
// Loaded from an optional TOML file; CLI flags override individual values.
// Nothing reads the environment except the logger filter.

use anyhow::{anyhow, ensure, Context, Result};
use chrono::{Days, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// VALUE RANGE
// ============================================================================

/// Inclusive range of whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

impl ValueRange {
    pub const fn new(min: i64, max: i64) -> Self {
        ValueRange { min, max }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..=self.max) as f64
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min as f64 && value <= self.max as f64
    }

    fn validate(&self, name: &str) -> Result<()> {
        ensure!(self.min >= 0, "{}: minimum {} is negative", name, self.min);
        ensure!(
            self.min <= self.max,
            "{}: minimum {} is greater than maximum {}",
            name,
            self.min,
            self.max
        );
        Ok(())
    }
}

// ============================================================================
// SIMULATION CONFIG
// ============================================================================

/// Longest history accepted (100 years)
pub const MAX_MONTHS: u32 = 1200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub customer_count: usize,

    /// History length; one month is 30 days
    pub months: u32,

    /// Transactions drawn per account per simulated day
    pub min_daily_transactions: u32,
    pub max_daily_transactions: u32,

    pub purchase_value: ValueRange,
    pub payment_value: ValueRange,
    pub transfer_value: ValueRange,
    pub inbound_value: ValueRange,

    /// Opening balance of an account whose first entry is a purchase
    pub purchase_opening_seed: ValueRange,

    /// Fixed seed for reproducible runs (random when absent)
    pub seed: Option<u64>,

    /// Last simulated day (today when absent)
    pub end_date: Option<NaiveDate>,

    /// Category name → weight, overriding the reference weights
    pub category_weights: BTreeMap<String, u32>,

    pub retailers_csv: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            customer_count: 10,
            months: 3,
            min_daily_transactions: 0,
            max_daily_transactions: 2,
            purchase_value: ValueRange::new(10, 200),
            payment_value: ValueRange::new(50, 250),
            transfer_value: ValueRange::new(200, 800),
            inbound_value: ValueRange::new(100, 500),
            purchase_opening_seed: ValueRange::new(100, 5000),
            seed: None,
            end_date: None,
            category_weights: BTreeMap::new(),
            retailers_csv: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.customer_count > 0, "customer_count must be at least 1");
        ensure!(
            self.months <= MAX_MONTHS,
            "months {} exceeds the maximum of {}",
            self.months,
            MAX_MONTHS
        );
        ensure!(
            self.min_daily_transactions <= self.max_daily_transactions,
            "min_daily_transactions {} is greater than max_daily_transactions {}",
            self.min_daily_transactions,
            self.max_daily_transactions
        );
        self.purchase_value.validate("purchase_value")?;
        self.payment_value.validate("payment_value")?;
        self.transfer_value.validate("transfer_value")?;
        self.inbound_value.validate("inbound_value")?;
        self.purchase_opening_seed.validate("purchase_opening_seed")?;

        if !self.category_weights.is_empty() {
            ensure!(
                self.category_weights.values().any(|w| *w > 0),
                "category_weights must contain at least one non-zero weight"
            );
        }

        Ok(())
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// First simulated day: 30 days per month before the end date
    pub fn start_date(&self) -> Result<NaiveDate> {
        let end_date = self.end_date();
        end_date
            .checked_sub_days(Days::new(30 * u64::from(self.months)))
            .ok_or_else(|| anyhow!("{} months before {} is out of range", self.months, end_date))
    }
}

// ============================================================================
// EXPORT CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub transaction_index: String,
    pub product_index: String,

    /// Ingest pipeline named in each bulk action line
    pub pipeline: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            transaction_index: "bank-transactions".to_string(),
            product_index: "bank-products".to_string(),
            pipeline: None,
        }
    }
}

// ============================================================================
// APP CONFIG (file layout)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: PathBuf,

    /// Customer whose accounts receive scenario transactions
    pub demo_customer_id: Option<i64>,

    pub simulation: SimulationConfig,
    pub export: ExportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database: PathBuf::from("ledger.db"),
            demo_customer_id: None,
            simulation: SimulationConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<AppConfig> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        match path {
            Some(path) => AppConfig::load_from_file(path),
            None => Ok(AppConfig::default()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
