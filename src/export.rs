// 📤 Export - Search-index documents for un-exported records
//
// Output is NDJSON in bulk-API shape: an action line naming the index and
// document id, then the document itself. Records are marked exported only
// after every line has been written and flushed.

use anyhow::{anyhow, Context, Result};
use log::info;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;

use crate::config::ExportConfig;
use crate::db;
use crate::entities::{AccountTransaction, BankingProduct, Retailer};
use crate::population::Population;

const MERCHANT_PATTERN: &str = r"merchant: (.+?), location: (.+)$";

// ============================================================================
// DOCUMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDocument {
    pub transaction_date: String,
    pub bank_account_number: String,
    pub bank_account_type: String,
    pub transaction_category: String,
    pub transaction_type: String,
    pub opening_balance: f64,
    pub transaction_value: f64,
    pub closing_balance: f64,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDocument {
    pub product_name: String,
    pub description: String,
    pub bank_account_type: String,
}

impl From<&BankingProduct> for ProductDocument {
    fn from(product: &BankingProduct) -> Self {
        ProductDocument {
            product_name: product.product_name.clone(),
            description: product.description.clone(),
            bank_account_type: product.account_type.name.clone(),
        }
    }
}

/// Joins a transaction with its account, customer and retailer
pub struct DocumentBuilder<'a> {
    population: &'a Population,
    retailers: HashMap<&'a str, &'a Retailer>,
    merchant_pattern: Regex,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(population: &'a Population, retailers: &'a [Retailer]) -> Result<Self> {
        Ok(DocumentBuilder {
            population,
            retailers: retailers.iter().map(|r| (r.name.as_str(), r)).collect(),
            merchant_pattern: Regex::new(MERCHANT_PATTERN)?,
        })
    }

    pub fn transaction_document(&self, tx: &AccountTransaction) -> Result<TransactionDocument> {
        let account = self.population.account(tx.account_id)?;
        let customer = self.population.customer(account.customer_id)?;

        let mut document = TransactionDocument {
            transaction_date: tx.transaction_date.format("%Y-%m-%d").to_string(),
            bank_account_number: account.account_number.clone(),
            bank_account_type: account.account_type.name.clone(),
            transaction_category: tx.category.name.clone(),
            transaction_type: tx.transaction_type.name.clone(),
            opening_balance: tx.opening_balance,
            transaction_value: tx.transaction_value,
            closing_balance: tx.closing_balance,
            description: tx.description.clone(),
            customer_name: customer.full_name(),
            customer_email: customer.email.clone(),
            merchant_name: None,
            location: None,
            retail_category: None,
        };

        if let Some(captures) = self.merchant_pattern.captures(&tx.description) {
            let merchant = &captures[1];
            let retailer = self
                .retailers
                .get(merchant)
                .ok_or_else(|| anyhow!("Transaction {} names unknown retailer: {}", tx.id, merchant))?;

            if let Some(format) = &retailer.dominant_operational_format {
                document.description = format!("{} - retail category: {}", tx.description, format);
                document.retail_category = Some(format.clone());
            }
            document.merchant_name = Some(merchant.to_string());
            document.location = Some(captures[2].to_string());
        }

        Ok(document)
    }
}

// ============================================================================
// NDJSON WRITER
// ============================================================================

/// Write one action line and one document line
pub fn write_bulk_entry<W: Write, T: Serialize>(
    writer: &mut W,
    index: &str,
    pipeline: Option<&str>,
    id: i64,
    document: &T,
) -> Result<()> {
    let mut action = json!({ "_index": index, "_id": id.to_string() });
    if let Some(pipeline) = pipeline {
        action["pipeline"] = json!(pipeline);
    }

    serde_json::to_writer(&mut *writer, &json!({ "index": action }))?;
    writer.write_all(b"\n")?;
    serde_json::to_writer(&mut *writer, document)?;
    writer.write_all(b"\n")?;
    Ok(())
}

// ============================================================================
// EXPORT RUN
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub transactions: usize,
    pub products: usize,
}

impl ExportReport {
    pub fn is_empty(&self) -> bool {
        self.transactions == 0 && self.products == 0
    }
}

/// Write every un-exported transaction and product, then flag them exported
pub fn export_pending<W: Write>(
    conn: &Connection,
    config: &ExportConfig,
    mut writer: W,
) -> Result<ExportReport> {
    let reference = db::load_reference_data(conn)?;
    let population = db::load_population(conn, &reference)?;
    let retailers = db::load_retailers(conn)?;
    let transactions = db::load_transactions(conn, &reference)?;
    let products = db::load_banking_products(conn, &reference)?;

    let builder = DocumentBuilder::new(&population, &retailers)?;
    let pipeline = config.pipeline.as_deref();

    let mut transaction_ids = Vec::new();
    for tx in transactions.iter().filter(|tx| !tx.exported) {
        let document = builder
            .transaction_document(tx)
            .with_context(|| format!("Failed to build document for transaction {}", tx.id))?;
        write_bulk_entry(&mut writer, &config.transaction_index, pipeline, tx.id, &document)?;
        transaction_ids.push(tx.id);
    }

    let mut product_ids = Vec::new();
    for product in products.iter().filter(|p| !p.exported) {
        let document = ProductDocument::from(product);
        write_bulk_entry(&mut writer, &config.product_index, pipeline, product.id, &document)?;
        product_ids.push(product.id);
    }

    writer.flush().context("Failed to flush export output")?;

    db::mark_transactions_exported(conn, &transaction_ids)?;
    db::mark_products_exported(conn, &product_ids)?;

    let report = ExportReport {
        transactions: transaction_ids.len(),
        products: product_ids.len(),
    };
    info!(
        "Exported {} transactions to {} and {} products to {}",
        report.transactions, config.transaction_index, report.products, config.product_index
    );

    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================
