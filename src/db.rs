// 🗄️ Store - SQLite persistence for reference data, population and ledger
//
// Reference rows, customers, accounts and transactions are written with
// their in-memory ids, so re-saving a loaded dataset only adds new rows.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::entities::{
    AccountTransaction, AccountType, Address, BankAccount, BankingProduct, Customer, Operator,
    Retailer, TransactionCategory, TransactionType,
};
use crate::ledger::Ledger;
use crate::population::Population;
use crate::reference::ReferenceData;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Reference Tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS account_types (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            transactional INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transaction_types (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            operator TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transaction_categories (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            weight INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS retailers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            dominant_operational_format TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Population Tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            exported INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customer_addresses (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            address_line_one TEXT NOT NULL,
            address_line_two TEXT,
            suburb TEXT NOT NULL,
            state TEXT NOT NULL,
            postal_code TEXT NOT NULL,
            exported INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bank_accounts (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            account_type_id INTEGER NOT NULL REFERENCES account_types(id),
            account_number TEXT NOT NULL,
            exported INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS banking_products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_type_id INTEGER NOT NULL REFERENCES account_types(id),
            product_name TEXT NOT NULL,
            description TEXT NOT NULL,
            generator_keywords TEXT,
            exported INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // ==========================================================================
    // Ledger Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS account_transactions (
            id INTEGER PRIMARY KEY,
            bank_account_id INTEGER NOT NULL REFERENCES bank_accounts(id),
            transaction_type_id INTEGER NOT NULL REFERENCES transaction_types(id),
            category_id INTEGER NOT NULL REFERENCES transaction_categories(id),
            opening_balance REAL NOT NULL,
            transaction_value REAL NOT NULL,
            closing_balance REAL NOT NULL,
            description TEXT NOT NULL,
            transaction_date TEXT NOT NULL,
            reference TEXT UNIQUE NOT NULL,
            exported INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tx_account_date
         ON account_transactions(bank_account_id, transaction_date, id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tx_exported ON account_transactions(exported)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_customer ON bank_accounts(customer_id)",
        [],
    )?;

    Ok(())
}

fn parse_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_uuid(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ============================================================================
// REFERENCE DATA
// ============================================================================

/// Insert reference rows when the tables are empty
pub fn seed_reference_data(conn: &Connection, reference: &ReferenceData) -> Result<bool> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM account_types", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(false);
    }

    save_reference_data(conn, reference)?;
    info!(
        "Seeded reference data: {} account types, {} transaction types, {} categories",
        reference.account_types.len(),
        reference.transaction_types.len(),
        reference.categories.len()
    );
    Ok(true)
}

pub fn save_reference_data(conn: &Connection, reference: &ReferenceData) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    for account_type in &reference.account_types {
        tx.execute(
            "INSERT OR REPLACE INTO account_types (id, name, transactional) VALUES (?1, ?2, ?3)",
            params![account_type.id, account_type.name, account_type.transactional],
        )?;
    }

    for transaction_type in &reference.transaction_types {
        tx.execute(
            "INSERT OR REPLACE INTO transaction_types (id, name, operator) VALUES (?1, ?2, ?3)",
            params![
                transaction_type.id,
                transaction_type.name,
                transaction_type.operator.as_symbol()
            ],
        )?;
    }

    for category in &reference.categories {
        tx.execute(
            "INSERT OR REPLACE INTO transaction_categories (id, name, weight) VALUES (?1, ?2, ?3)",
            params![category.id, category.name, category.weight],
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub fn load_reference_data(conn: &Connection) -> Result<ReferenceData> {
    let account_types = conn
        .prepare("SELECT id, name, transactional FROM account_types ORDER BY id")?
        .query_map([], |row| {
            Ok(AccountType {
                id: row.get(0)?,
                name: row.get(1)?,
                transactional: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let raw_types = conn
        .prepare("SELECT id, name, operator FROM transaction_types ORDER BY id")?
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut transaction_types = Vec::with_capacity(raw_types.len());
    for (id, name, symbol) in raw_types {
        let operator = Operator::from_symbol(&symbol)
            .with_context(|| format!("Invalid operator for transaction type {}", name))?;
        transaction_types.push(TransactionType { id, name, operator });
    }

    let categories = conn
        .prepare("SELECT id, name, weight FROM transaction_categories ORDER BY id")?
        .query_map([], |row| {
            Ok(TransactionCategory {
                id: row.get(0)?,
                name: row.get(1)?,
                weight: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReferenceData {
        account_types,
        transaction_types,
        categories,
    })
}

// ============================================================================
// RETAILERS
// ============================================================================

/// Insert retailers, skipping names already present
pub fn insert_retailers(conn: &Connection, retailers: &[Retailer]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;

    for retailer in retailers {
        inserted += tx.execute(
            "INSERT OR IGNORE INTO retailers (name, dominant_operational_format) VALUES (?1, ?2)",
            params![retailer.name, retailer.dominant_operational_format],
        )?;
    }

    tx.commit()?;
    debug!("Imported {} of {} retailers", inserted, retailers.len());
    Ok(inserted)
}

pub fn load_retailers(conn: &Connection) -> Result<Vec<Retailer>> {
    let retailers = conn
        .prepare("SELECT id, name, dominant_operational_format FROM retailers ORDER BY id")?
        .query_map([], |row| {
            Ok(Retailer {
                id: row.get(0)?,
                name: row.get(1)?,
                dominant_operational_format: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(retailers)
}

// ============================================================================
// POPULATION
// ============================================================================

/// Insert customers, addresses and accounts; rows whose id exists are kept
pub fn insert_population(conn: &Connection, population: &Population) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;

    for customer in population.customers() {
        inserted += tx.execute(
            "INSERT OR IGNORE INTO customers (id, first_name, last_name, email, date_of_birth, exported)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                customer.id,
                customer.first_name,
                customer.last_name,
                customer.email,
                format_date(customer.date_of_birth),
                customer.exported,
            ],
        )?;
    }

    for address in population.addresses() {
        inserted += tx.execute(
            "INSERT OR IGNORE INTO customer_addresses (
                id, customer_id, address_line_one, address_line_two, suburb, state, postal_code, exported
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                address.id,
                address.customer_id,
                address.address_line_one,
                address.address_line_two,
                address.suburb,
                address.state,
                address.postal_code,
                address.exported,
            ],
        )?;
    }

    for account in population.accounts() {
        inserted += tx.execute(
            "INSERT OR IGNORE INTO bank_accounts (id, customer_id, account_type_id, account_number, exported)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.id,
                account.customer_id,
                account.account_type.id,
                account.account_number,
                account.exported,
            ],
        )?;
    }

    tx.commit()?;
    Ok(inserted)
}

pub fn load_population(conn: &Connection, reference: &ReferenceData) -> Result<Population> {
    let customers = conn
        .prepare(
            "SELECT id, first_name, last_name, email, date_of_birth, exported
             FROM customers ORDER BY id",
        )?
        .query_map([], |row| {
            let date_of_birth: String = row.get(4)?;
            Ok(Customer {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                date_of_birth: parse_date(4, &date_of_birth)?,
                exported: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let addresses = conn
        .prepare(
            "SELECT id, customer_id, address_line_one, address_line_two, suburb, state, postal_code, exported
             FROM customer_addresses ORDER BY id",
        )?
        .query_map([], |row| {
            Ok(Address {
                id: row.get(0)?,
                customer_id: row.get(1)?,
                address_line_one: row.get(2)?,
                address_line_two: row.get(3)?,
                suburb: row.get(4)?,
                state: row.get(5)?,
                postal_code: row.get(6)?,
                exported: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let raw_accounts = conn
        .prepare(
            "SELECT id, customer_id, account_type_id, account_number, exported
             FROM bank_accounts ORDER BY id",
        )?
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut accounts = Vec::with_capacity(raw_accounts.len());
    for (id, customer_id, account_type_id, account_number, exported) in raw_accounts {
        let account_type = reference
            .account_type_by_id(account_type_id)
            .with_context(|| format!("Bank account {} has an unknown type", id))?
            .clone();
        accounts.push(BankAccount {
            id,
            customer_id,
            account_type,
            account_number,
            exported,
        });
    }

    Ok(Population::from_parts(customers, addresses, accounts))
}

// ============================================================================
// LEDGER
// ============================================================================

fn is_duplicate_key(err: &rusqlite::ffi::Error) -> bool {
    err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
}

/// Insert ledger entries; entries already stored (same id or reference) are
/// skipped, any other constraint failure is an error
pub fn insert_transactions(
    conn: &Connection,
    transactions: &[AccountTransaction],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    let mut duplicates = 0;

    for entry in transactions {
        let result = tx.execute(
            "INSERT INTO account_transactions (
                id, bank_account_id, transaction_type_id, category_id,
                opening_balance, transaction_value, closing_balance,
                description, transaction_date, reference, exported
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.id,
                entry.account_id,
                entry.transaction_type.id,
                entry.category.id,
                entry.opening_balance,
                entry.transaction_value,
                entry.closing_balance,
                entry.description,
                format_date(entry.transaction_date),
                entry.reference.to_string(),
                entry.exported,
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _)) if is_duplicate_key(&err) => {
                duplicates += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to store transaction {} on account {}", entry.id, entry.account_id)
                })
            }
        }
    }

    tx.commit()?;
    debug!(
        "Stored {} transactions, skipped {} already present",
        inserted, duplicates
    );
    Ok(inserted)
}

struct TransactionRow {
    id: i64,
    account_id: i64,
    type_id: i64,
    category_id: i64,
    opening_balance: f64,
    transaction_value: f64,
    closing_balance: f64,
    description: String,
    transaction_date: NaiveDate,
    reference: Uuid,
    exported: bool,
}

pub fn load_transactions(
    conn: &Connection,
    reference: &ReferenceData,
) -> Result<Vec<AccountTransaction>> {
    let rows = conn
        .prepare(
            "SELECT id, bank_account_id, transaction_type_id, category_id,
                    opening_balance, transaction_value, closing_balance,
                    description, transaction_date, reference, exported
             FROM account_transactions
             ORDER BY id",
        )?
        .query_map([], |row| {
            let date: String = row.get(8)?;
            let uuid: String = row.get(9)?;
            Ok(TransactionRow {
                id: row.get(0)?,
                account_id: row.get(1)?,
                type_id: row.get(2)?,
                category_id: row.get(3)?,
                opening_balance: row.get(4)?,
                transaction_value: row.get(5)?,
                closing_balance: row.get(6)?,
                description: row.get(7)?,
                transaction_date: parse_date(8, &date)?,
                reference: parse_uuid(9, &uuid)?,
                exported: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| -> Result<AccountTransaction> {
            Ok(AccountTransaction {
                id: row.id,
                account_id: row.account_id,
                transaction_type: reference.transaction_type_by_id(row.type_id)?.clone(),
                category: reference.category_by_id(row.category_id)?.clone(),
                opening_balance: row.opening_balance,
                transaction_value: row.transaction_value,
                closing_balance: row.closing_balance,
                description: row.description,
                transaction_date: row.transaction_date,
                reference: row.reference,
                exported: row.exported,
            })
        })
        .collect()
}

pub fn load_ledger(conn: &Connection, reference: &ReferenceData) -> Result<Ledger> {
    Ok(Ledger::from_transactions(load_transactions(conn, reference)?))
}

pub fn mark_transactions_exported(conn: &Connection, ids: &[i64]) -> Result<usize> {
    mark_exported(conn, "account_transactions", ids)
}

pub fn mark_products_exported(conn: &Connection, ids: &[i64]) -> Result<usize> {
    mark_exported(conn, "banking_products", ids)
}

fn mark_exported(conn: &Connection, table: &str, ids: &[i64]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut updated = 0;
    {
        let mut stmt = tx.prepare(&format!("UPDATE {} SET exported = 1 WHERE id = ?1", table))?;
        for id in ids {
            updated += stmt.execute(params![id])?;
        }
    }
    tx.commit()?;
    Ok(updated)
}

// ============================================================================
// BANKING PRODUCTS
// ============================================================================

pub fn insert_banking_product(
    conn: &Connection,
    account_type: &AccountType,
    product_name: &str,
    description: &str,
    generator_keywords: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO banking_products (account_type_id, product_name, description, generator_keywords)
         VALUES (?1, ?2, ?3, ?4)",
        params![account_type.id, product_name, description, generator_keywords],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn load_banking_products(
    conn: &Connection,
    reference: &ReferenceData,
) -> Result<Vec<BankingProduct>> {
    let rows = conn
        .prepare(
            "SELECT id, account_type_id, product_name, description, generator_keywords, exported
             FROM banking_products ORDER BY id",
        )?
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(
            |(id, account_type_id, product_name, description, generator_keywords, exported)|
             -> Result<BankingProduct> {
                Ok(BankingProduct {
                    id,
                    account_type: reference.account_type_by_id(account_type_id)?.clone(),
                    product_name,
                    description,
                    generator_keywords,
                    exported,
                })
            },
        )
        .collect()
}

pub fn load_banking_product(
    conn: &Connection,
    reference: &ReferenceData,
    id: i64,
) -> Result<BankingProduct> {
    let row = conn
        .query_row(
            "SELECT account_type_id, product_name, description, generator_keywords, exported
             FROM banking_products WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            },
        )
        .optional()?;

    let (account_type_id, product_name, description, generator_keywords, exported) =
        row.ok_or_else(|| anyhow!("Banking product not found: {}", id))?;

    Ok(BankingProduct {
        id,
        account_type: reference.account_type_by_id(account_type_id)?.clone(),
        product_name,
        description,
        generator_keywords,
        exported,
    })
}

// ============================================================================
// COUNTS
// ============================================================================

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    count_rows(conn, "account_transactions")
}

// ============================================================================
// TESTS
// ============================================================================
