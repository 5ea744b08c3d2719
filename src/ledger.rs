// 📒 Ledger - Append-only transaction book with per-account chains
//
// Each account's history, ordered by (date, insertion id), is a chain:
// opening_balance[i+1] == closing_balance[i]. The ledger keeps an index of
// the latest entry per account so the next opening balance is looked up for
// that account only, never globally.

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{AccountTransaction, TransactionCategory, TransactionType};

/// Entry to be posted; balances are filled in by the ledger
#[derive(Debug, Clone)]
pub struct Posting {
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub value: f64,
    pub description: String,
    pub date: NaiveDate,
    pub reference: Uuid,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    transactions: Vec<AccountTransaction>,

    /// account id → index into `transactions` of its latest entry
    latest: HashMap<i64, usize>,
    next_id: i64,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            transactions: Vec::new(),
            latest: HashMap::new(),
            next_id: 1,
        }
    }

    /// Rebuild from stored rows (any order)
    pub fn from_transactions(mut transactions: Vec<AccountTransaction>) -> Self {
        transactions.sort_by_key(|tx| tx.id);

        let mut latest: HashMap<i64, usize> = HashMap::new();
        for (index, tx) in transactions.iter().enumerate() {
            let newer = match latest.get(&tx.account_id) {
                Some(&current) => tx.chain_key() > transactions[current].chain_key(),
                None => true,
            };
            if newer {
                latest.insert(tx.account_id, index);
            }
        }

        let next_id = transactions.last().map(|tx| tx.id + 1).unwrap_or(1);

        Ledger {
            transactions,
            latest,
            next_id,
        }
    }

    // ========================================================================
    // POSTING
    // ========================================================================

    /// Append an entry to its account's chain
    ///
    /// The opening balance is the account's latest closing balance; when the
    /// account has no history `initial_balance` supplies it. Posting a date
    /// earlier than the account's latest entry is rejected because it would
    /// break the chain order.
    pub fn post<F>(&mut self, posting: Posting, initial_balance: F) -> Result<&AccountTransaction>
    where
        F: FnOnce() -> f64,
    {
        ensure!(
            posting.value >= 0.0,
            "Transaction value must not be negative: {}",
            posting.value
        );

        let opening_balance = match self.latest_for(posting.account_id) {
            Some(latest) => {
                ensure!(
                    posting.date >= latest.transaction_date,
                    "Cannot post {} to account {} before its latest entry on {}",
                    posting.date,
                    posting.account_id,
                    latest.transaction_date
                );
                latest.closing_balance
            }
            None => initial_balance(),
        };

        let closing_balance = posting.transaction_type.apply(opening_balance, posting.value);

        let transaction = AccountTransaction {
            id: self.next_id,
            account_id: posting.account_id,
            transaction_type: posting.transaction_type,
            category: posting.category,
            opening_balance,
            transaction_value: posting.value,
            closing_balance,
            description: posting.description,
            transaction_date: posting.date,
            reference: posting.reference,
            exported: false,
        };

        debug!(
            "posted #{} on account {}: {:.2} {} {:.2} = {:.2}",
            transaction.id,
            transaction.account_id,
            opening_balance,
            transaction.transaction_type.operator.as_symbol(),
            transaction.transaction_value,
            closing_balance
        );

        self.next_id += 1;
        self.latest.insert(transaction.account_id, self.transactions.len());
        self.transactions.push(transaction);

        Ok(&self.transactions[self.transactions.len() - 1])
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn latest_for(&self, account_id: i64) -> Option<&AccountTransaction> {
        self.latest
            .get(&account_id)
            .map(|&index| &self.transactions[index])
    }

    /// One account's chain, ordered by date then insertion
    pub fn chain(&self, account_id: i64) -> Vec<&AccountTransaction> {
        let mut chain: Vec<&AccountTransaction> = self
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .collect();
        chain.sort_by_key(|tx| tx.chain_key());
        chain
    }

    /// Every account's chain, keyed by account id
    pub fn chains(&self) -> HashMap<i64, Vec<&AccountTransaction>> {
        let mut chains: HashMap<i64, Vec<&AccountTransaction>> = HashMap::new();
        for tx in &self.transactions {
            chains.entry(tx.account_id).or_default().push(tx);
        }
        for chain in chains.values_mut() {
            chain.sort_by_key(|tx| tx.chain_key());
        }
        chains
    }

    /// Entries in insertion order
    pub fn transactions(&self) -> &[AccountTransaction] {
        &self.transactions
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let oldest = self.transactions.iter().map(|tx| tx.transaction_date).min()?;
        let newest = self.transactions.iter().map(|tx| tx.transaction_date).max()?;
        Some((oldest, newest))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    fn posting(account_id: i64, type_name: &str, value: f64, day: u32) -> Posting {
        let reference = ReferenceData::standard();
        Posting {
            account_id,
            transaction_type: reference.transaction_type(type_name).unwrap().clone(),
            category: reference.category("EFT").unwrap().clone(),
            value,
            description: format!("test {}", value),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            reference: Uuid::nil(),
        }
    }

    #[test]
    fn test_first_entry_uses_initial_balance() {
        let mut ledger = Ledger::new();

        let tx = ledger
            .post(posting(1, TransactionType::DEBIT, 40.0, 1), || 1000.0)
            .unwrap();

        assert_eq!(tx.opening_balance, 1000.0);
        assert_eq!(tx.closing_balance, 960.0);
        assert_eq!(tx.id, 1);
    }

    #[test]
    fn test_opening_balance_is_looked_up_per_account() {
        let mut ledger = Ledger::new();

        ledger
            .post(posting(1, TransactionType::DEBIT, 100.0, 1), || 500.0)
            .unwrap();
        // interleave a different account
        ledger
            .post(posting(2, TransactionType::CREDIT, 75.0, 2), || 0.0)
            .unwrap();
        let tx = ledger
            .post(posting(1, TransactionType::CREDIT, 30.0, 3), || 0.0)
            .unwrap();

        assert_eq!(tx.opening_balance, 400.0);
        assert_eq!(tx.closing_balance, 430.0);
        assert_eq!(ledger.latest_for(2).unwrap().closing_balance, 75.0);
    }

    #[test]
    fn test_initial_balance_not_evaluated_when_history_exists() {
        let mut ledger = Ledger::new();
        ledger
            .post(posting(1, TransactionType::CREDIT, 10.0, 1), || 0.0)
            .unwrap();

        let mut evaluated = false;
        ledger
            .post(posting(1, TransactionType::CREDIT, 10.0, 1), || {
                evaluated = true;
                0.0
            })
            .unwrap();

        assert!(!evaluated);
    }

    #[test]
    fn test_backdated_posting_is_rejected() {
        let mut ledger = Ledger::new();
        ledger
            .post(posting(1, TransactionType::DEBIT, 10.0, 5), || 100.0)
            .unwrap();

        let result = ledger.post(posting(1, TransactionType::DEBIT, 10.0, 4), || 0.0);
        assert!(result.is_err());

        // other accounts are unaffected
        assert!(ledger
            .post(posting(2, TransactionType::DEBIT, 10.0, 4), || 0.0)
            .is_ok());
    }

    #[test]
    fn test_negative_value_is_rejected() {
        let mut ledger = Ledger::new();
        assert!(ledger
            .post(posting(1, TransactionType::DEBIT, -1.0, 1), || 0.0)
            .is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_from_transactions_restores_latest_and_next_id() {
        let mut ledger = Ledger::new();
        ledger
            .post(posting(1, TransactionType::DEBIT, 10.0, 1), || 100.0)
            .unwrap();
        ledger
            .post(posting(1, TransactionType::DEBIT, 10.0, 2), || 0.0)
            .unwrap();
        ledger
            .post(posting(2, TransactionType::CREDIT, 5.0, 2), || 0.0)
            .unwrap();

        let mut rows = ledger.transactions().to_vec();
        rows.reverse();
        let mut restored = Ledger::from_transactions(rows);

        assert_eq!(restored.latest_for(1).unwrap().closing_balance, 80.0);
        assert_eq!(restored.latest_for(2).unwrap().closing_balance, 5.0);

        let tx = restored
            .post(posting(1, TransactionType::DEBIT, 5.0, 3), || 0.0)
            .unwrap();
        assert_eq!(tx.id, 4);
        assert_eq!(tx.opening_balance, 80.0);
    }

    #[test]
    fn test_chain_and_date_range() {
        let mut ledger = Ledger::new();
        ledger
            .post(posting(1, TransactionType::DEBIT, 10.0, 3), || 100.0)
            .unwrap();
        ledger
            .post(posting(2, TransactionType::DEBIT, 10.0, 1), || 100.0)
            .unwrap();
        ledger
            .post(posting(1, TransactionType::DEBIT, 10.0, 9), || 0.0)
            .unwrap();

        let chain = ledger.chain(1);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].opening_balance, chain[0].closing_balance);

        let (oldest, newest) = ledger.date_range().unwrap();
        assert_eq!(oldest, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(newest, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(ledger.chains().len(), 2);
    }
}
