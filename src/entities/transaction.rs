// 🧾 Transaction Entity - Immutable ledger entry
//
// Invariant: closing_balance = opening_balance ± transaction_value,
// where the sign comes from the transaction type's operator.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// OPERATOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// "+" money coming in
    Add,

    /// "-" money going out
    Subtract,
}

impl Operator {
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        match symbol.trim() {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            other => bail!("Unknown transaction operator: {:?}", other),
        }
    }

    pub fn as_symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
        }
    }

    pub fn apply(&self, opening_balance: f64, value: f64) -> f64 {
        match self {
            Operator::Add => opening_balance + value,
            Operator::Subtract => opening_balance - value,
        }
    }
}

// ============================================================================
// TRANSACTION TYPE & CATEGORY (reference rows)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionType {
    pub id: i64,
    pub name: String,
    pub operator: Operator,
}

impl TransactionType {
    pub const DEBIT: &'static str = "Debit";
    pub const CREDIT: &'static str = "Credit";

    pub fn new(id: i64, name: &str, operator: Operator) -> Self {
        TransactionType {
            id,
            name: name.to_string(),
            operator,
        }
    }

    /// Closing balance produced by applying this type to an opening balance
    pub fn apply(&self, opening_balance: f64, value: f64) -> f64 {
        self.operator.apply(opening_balance, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCategory {
    pub id: i64,
    pub name: String,

    /// Relative weight for the daily category draw
    pub weight: u32,
}

impl TransactionCategory {
    pub const PURCHASE: &'static str = "Purchase";
    pub const TRANSFER: &'static str = "Transfer";
    pub const EFT: &'static str = "EFT";

    pub fn new(id: i64, name: &str, weight: u32) -> Self {
        TransactionCategory {
            id,
            name: name.to_string(),
            weight,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

// ============================================================================
// ACCOUNT TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTransaction {
    /// Insertion sequence, ties on the same date are ordered by it
    pub id: i64,
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub opening_balance: f64,
    pub transaction_value: f64,
    pub closing_balance: f64,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub reference: Uuid,
    pub exported: bool,
}

impl AccountTransaction {
    pub fn is_debit(&self) -> bool {
        self.transaction_type.operator == Operator::Subtract
    }

    pub fn is_credit(&self) -> bool {
        self.transaction_type.operator == Operator::Add
    }

    /// Closing balance the operator says this entry should have
    pub fn expected_closing_balance(&self) -> f64 {
        self.transaction_type
            .apply(self.opening_balance, self.transaction_value)
    }

    /// Check closing = opening ± value within tolerance
    pub fn is_arithmetically_sound(&self, tolerance: f64) -> bool {
        (self.expected_closing_balance() - self.closing_balance).abs() < tolerance
    }

    /// Sort key for the ledger chain (date, then insertion order)
    pub fn chain_key(&self) -> (NaiveDate, i64) {
        (self.transaction_date, self.id)
    }
}

impl fmt::Display for AccountTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}{:.2}",
            self.transaction_date,
            self.transaction_type.operator.as_symbol(),
            self.transaction_value
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_transaction(operator: Operator, opening: f64, value: f64) -> AccountTransaction {
        let name = match operator {
            Operator::Add => TransactionType::CREDIT,
            Operator::Subtract => TransactionType::DEBIT,
        };
        let transaction_type = TransactionType::new(1, name, operator);
        AccountTransaction {
            id: 1,
            account_id: 1,
            closing_balance: transaction_type.apply(opening, value),
            transaction_type,
            category: TransactionCategory::new(1, TransactionCategory::EFT, 1),
            opening_balance: opening,
            transaction_value: value,
            description: "test".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            reference: Uuid::nil(),
            exported: false,
        }
    }

    #[test]
    fn test_operator_from_symbol() {
        assert_eq!(Operator::from_symbol("+").unwrap(), Operator::Add);
        assert_eq!(Operator::from_symbol(" - ").unwrap(), Operator::Subtract);
        assert!(Operator::from_symbol("*").is_err());
    }

    #[test]
    fn test_debit_and_credit_arithmetic() {
        let debit = create_test_transaction(Operator::Subtract, 500.0, 120.0);
        assert_eq!(debit.closing_balance, 380.0);
        assert!(debit.is_debit());
        assert!(debit.is_arithmetically_sound(0.01));

        let credit = create_test_transaction(Operator::Add, 500.0, 120.0);
        assert_eq!(credit.closing_balance, 620.0);
        assert!(credit.is_credit());
    }

    #[test]
    fn test_tampered_closing_balance_is_detected() {
        let mut debit = create_test_transaction(Operator::Subtract, 500.0, 120.0);
        debit.closing_balance = 400.0;
        assert!(!debit.is_arithmetically_sound(0.01));
    }

    #[test]
    fn test_display() {
        let debit = create_test_transaction(Operator::Subtract, 10.0, 2.5);
        assert_eq!(debit.to_string(), "2024-03-01 - -2.50");
    }
}
