// ⚖️ Reconciliation Engine - Validate that every account chain balances
//
// Per account, ordered by (date, insertion):
//   opening_balance[i+1] == closing_balance[i]
//   closing_balance[i]   == opening_balance[i] ± transaction_value[i]
//   first opening + total credits - total debits == last closing
//
// Across accounts every transfer debit needs a credit on another account
// with the same date, value and description.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::entities::{AccountTransaction, TransactionCategory};
use crate::ledger::Ledger;

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconciliationResult {
    /// Chain is unbroken and sums to the final closing balance
    Balanced {
        opening_balance: f64,
        total_credits: f64,
        total_debits: f64,
        closing_balance: f64,
    },

    /// At least one link or the overall sum is off
    Unbalanced {
        expected_balance: f64,
        actual_balance: f64,
        difference: f64,
        broken_links: usize,
    },
}

impl ReconciliationResult {
    pub fn is_balanced(&self) -> bool {
        matches!(self, ReconciliationResult::Balanced { .. })
    }

    pub fn has_discrepancy(&self) -> bool {
        !self.is_balanced()
    }

    pub fn difference(&self) -> f64 {
        match self {
            ReconciliationResult::Balanced { .. } => 0.0,
            ReconciliationResult::Unbalanced { difference, .. } => *difference,
        }
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountReconciliation {
    pub account_id: i64,
    pub transaction_count: usize,
    pub result: ReconciliationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub accounts: Vec<AccountReconciliation>,
    pub transaction_count: usize,
    pub transfer_pairs: usize,
    pub discrepancies: Vec<Discrepancy>,
    pub reconciled_at: chrono::DateTime<chrono::Utc>,
}

impl ReconciliationReport {
    pub fn is_balanced(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn unbalanced_accounts(&self) -> usize {
        self.accounts
            .iter()
            .filter(|account| account.result.has_discrepancy())
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} accounts ({} unbalanced), {} transactions, {} transfer pairs, {} discrepancies",
            self.accounts.len(),
            self.unbalanced_accounts(),
            self.transaction_count,
            self.transfer_pairs,
            self.discrepancies.len()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub account_id: i64,
    pub transaction_id: Option<i64>,
    pub description: String,
    pub amount: f64,
    pub category: DiscrepancyCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscrepancyCategory {
    /// opening_balance differs from the previous closing_balance
    BrokenChain,

    /// closing_balance differs from opening ± value
    ArithmeticMismatch,

    /// Transfer leg without its counterpart
    UnmatchedTransfer,
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    /// Tolerance for floating-point comparisons (default: 0.01)
    pub tolerance: f64,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine { tolerance: 0.01 }
    }

    /// Check every chain and every transfer in the ledger
    pub fn reconcile(&self, ledger: &Ledger) -> ReconciliationReport {
        let (accounts, mut discrepancies) = self.verify_chains(ledger);
        let (transfer_pairs, mut unmatched) = self.verify_transfers(ledger.transactions());
        discrepancies.append(&mut unmatched);

        ReconciliationReport {
            accounts,
            transaction_count: ledger.len(),
            transfer_pairs,
            discrepancies,
            reconciled_at: chrono::Utc::now(),
        }
    }

    /// Reconcile each account's chain, ordered by account id
    pub fn verify_chains(&self, ledger: &Ledger) -> (Vec<AccountReconciliation>, Vec<Discrepancy>) {
        let chains: BTreeMap<i64, Vec<&AccountTransaction>> = ledger.chains().into_iter().collect();
        let mut discrepancies = Vec::new();

        let accounts = chains
            .iter()
            .map(|(&account_id, chain)| {
                let (result, mut found) = self.reconcile_chain(account_id, chain);
                discrepancies.append(&mut found);
                AccountReconciliation {
                    account_id,
                    transaction_count: chain.len(),
                    result,
                }
            })
            .collect();

        (accounts, discrepancies)
    }

    /// Verify one account's chain (already ordered by date then insertion)
    pub fn reconcile_chain(
        &self,
        account_id: i64,
        chain: &[&AccountTransaction],
    ) -> (ReconciliationResult, Vec<Discrepancy>) {
        let mut discrepancies = Vec::new();

        for tx in chain {
            if !tx.is_arithmetically_sound(self.tolerance) {
                discrepancies.push(Discrepancy {
                    account_id,
                    transaction_id: Some(tx.id),
                    description: format!(
                        "Transaction {} closes at {:.2}, expected {:.2}",
                        tx.id,
                        tx.closing_balance,
                        tx.expected_closing_balance()
                    ),
                    amount: (tx.closing_balance - tx.expected_closing_balance()).abs(),
                    category: DiscrepancyCategory::ArithmeticMismatch,
                });
            }
        }

        for pair in chain.windows(2) {
            let (previous, next) = (pair[0], pair[1]);
            let gap = (next.opening_balance - previous.closing_balance).abs();
            if gap >= self.tolerance {
                discrepancies.push(Discrepancy {
                    account_id,
                    transaction_id: Some(next.id),
                    description: format!(
                        "Transaction {} opens at {:.2} but transaction {} closed at {:.2}",
                        next.id, next.opening_balance, previous.id, previous.closing_balance
                    ),
                    amount: gap,
                    category: DiscrepancyCategory::BrokenChain,
                });
            }
        }

        let (Some(first), Some(last)) = (chain.first(), chain.last()) else {
            let result = ReconciliationResult::Balanced {
                opening_balance: 0.0,
                total_credits: 0.0,
                total_debits: 0.0,
                closing_balance: 0.0,
            };
            return (result, discrepancies);
        };

        let total_credits = self.calculate_credits(chain);
        let total_debits = self.calculate_debits(chain);

        // Formula: opening + credits - debits = closing
        let calculated_balance = first.opening_balance + total_credits - total_debits;
        let difference = (calculated_balance - last.closing_balance).abs();

        let result = if discrepancies.is_empty() && difference < self.tolerance {
            ReconciliationResult::Balanced {
                opening_balance: first.opening_balance,
                total_credits,
                total_debits,
                closing_balance: last.closing_balance,
            }
        } else {
            ReconciliationResult::Unbalanced {
                expected_balance: calculated_balance,
                actual_balance: last.closing_balance,
                difference,
                broken_links: discrepancies.len(),
            }
        };

        (result, discrepancies)
    }

    /// Pair transfer debits with credits; returns (pairs, unmatched legs)
    pub fn verify_transfers(&self, transactions: &[AccountTransaction]) -> (usize, Vec<Discrepancy>) {
        let mut groups: HashMap<(NaiveDate, i64, &str), (Vec<&AccountTransaction>, Vec<&AccountTransaction>)> =
            HashMap::new();

        for tx in transactions
            .iter()
            .filter(|tx| tx.category.is(TransactionCategory::TRANSFER))
        {
            let key = (
                tx.transaction_date,
                (tx.transaction_value * 100.0).round() as i64,
                tx.description.as_str(),
            );
            let (debits, credits) = groups.entry(key).or_default();
            if tx.is_debit() {
                debits.push(tx);
            } else {
                credits.push(tx);
            }
        }

        let mut pairs = 0;
        let mut unmatched = Vec::new();

        for (debits, mut credits) in groups.into_values() {
            for debit in debits {
                match credits.iter().position(|c| c.account_id != debit.account_id) {
                    Some(index) => {
                        credits.swap_remove(index);
                        pairs += 1;
                    }
                    None => unmatched.push(self.unmatched_leg(debit, "credit")),
                }
            }
            unmatched.extend(credits.into_iter().map(|credit| self.unmatched_leg(credit, "debit")));
        }

        unmatched.sort_by_key(|d| d.transaction_id);
        (pairs, unmatched)
    }

    fn unmatched_leg(&self, tx: &AccountTransaction, missing: &str) -> Discrepancy {
        Discrepancy {
            account_id: tx.account_id,
            transaction_id: Some(tx.id),
            description: format!(
                "Transfer {} on {} has no matching {} leg: {}",
                tx.id, tx.transaction_date, missing, tx.description
            ),
            amount: tx.transaction_value,
            category: DiscrepancyCategory::UnmatchedTransfer,
        }
    }

    fn calculate_credits(&self, chain: &[&AccountTransaction]) -> f64 {
        chain
            .iter()
            .filter(|tx| tx.is_credit())
            .map(|tx| tx.transaction_value)
            .sum()
    }

    fn calculate_debits(&self, chain: &[&AccountTransaction]) -> f64 {
        chain
            .iter()
            .filter(|tx| tx.is_debit())
            .map(|tx| tx.transaction_value)
            .sum()
    }
}

impl Default for ReconciliationEngine {
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
    use uuid::Uuid;

    fn create_test_transaction(
        id: i64,
        account_id: i64,
        type_name: &str,
        category: &str,
        opening: f64,
        value: f64,
        day: u32,
    ) -> AccountTransaction {
        let reference = ReferenceData::standard();
        let transaction_type = reference.transaction_type(type_name).unwrap().clone();
        let closing = transaction_type.apply(opening, value);
        AccountTransaction {
            id,
            account_id,
            transaction_type,
            category: reference.category(category).unwrap().clone(),
            opening_balance: opening,
            transaction_value: value,
            closing_balance: closing,
            description: format!("Test transaction {}", id),
            transaction_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            reference: Uuid::nil(),
            exported: false,
        }
    }

    #[test]
    fn test_reconciliation_balanced() {
        let engine = ReconciliationEngine::new();
        let ledger = Ledger::from_transactions(vec![
            create_test_transaction(1, 1, "Credit", "EFT", 1000.0, 2000.0, 1), // 3000
            create_test_transaction(2, 1, "Debit", "Purchase", 3000.0, 500.0, 2), // 2500
            create_test_transaction(3, 1, "Debit", "Purchase", 2500.0, 300.0, 3), // 2200
        ]);

        let report = engine.reconcile(&ledger);

        assert!(report.is_balanced());
        assert_eq!(report.transaction_count, 3);
        assert_eq!(
            report.accounts[0].result,
            ReconciliationResult::Balanced {
                opening_balance: 1000.0,
                total_credits: 2000.0,
                total_debits: 800.0,
                closing_balance: 2200.0,
            }
        );

        println!("✅ Test passed: {}", report.summary());
    }

    #[test]
    fn test_broken_chain_is_reported() {
        let engine = ReconciliationEngine::new();
        let ledger = Ledger::from_transactions(vec![
            create_test_transaction(1, 1, "Debit", "EFT", 0.0, 100.0, 1), // -100
            create_test_transaction(2, 1, "Debit", "EFT", 0.0, 50.0, 2),  // should open at -100
        ]);

        let report = engine.reconcile(&ledger);

        assert!(!report.is_balanced());
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].category, DiscrepancyCategory::BrokenChain);
        assert_eq!(report.discrepancies[0].transaction_id, Some(2));
        assert!((report.discrepancies[0].amount - 100.0).abs() < 0.01);
        assert_eq!(report.unbalanced_accounts(), 1);
    }

    #[test]
    fn test_chain_order_uses_date_before_id() {
        let engine = ReconciliationEngine::new();
        // id 1 is dated after id 2; the chain runs 2 → 1
        let ledger = Ledger::from_transactions(vec![
            create_test_transaction(1, 1, "Debit", "EFT", -100.0, 10.0, 5),
            create_test_transaction(2, 1, "Debit", "EFT", 0.0, 100.0, 1),
        ]);

        assert!(engine.reconcile(&ledger).is_balanced());
    }

    #[test]
    fn test_arithmetic_mismatch_is_reported() {
        let engine = ReconciliationEngine::new();
        let mut tx = create_test_transaction(1, 1, "Credit", "EFT", 0.0, 100.0, 1);
        tx.closing_balance = 95.0;

        let report = engine.reconcile(&Ledger::from_transactions(vec![tx]));

        assert_eq!(
            report.discrepancies[0].category,
            DiscrepancyCategory::ArithmeticMismatch
        );
        assert!(report.accounts[0].result.has_discrepancy());
    }

    #[test]
    fn test_transfers_pair_up() {
        let engine = ReconciliationEngine::new();
        let mut debit = create_test_transaction(1, 1, "Debit", "Transfer", 0.0, 300.0, 1);
        let mut credit = create_test_transaction(2, 2, "Credit", "Transfer", 0.0, 300.0, 1);
        debit.description = "Transfer made from A to B - Reason: internal".to_string();
        credit.description = debit.description.clone();
        let orphan = create_test_transaction(3, 3, "Debit", "Transfer", 0.0, 200.0, 1);

        let (pairs, unmatched) = engine.verify_transfers(&[debit, credit, orphan]);

        assert_eq!(pairs, 1);
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].transaction_id, Some(3));
        assert_eq!(unmatched[0].category, DiscrepancyCategory::UnmatchedTransfer);
    }

    #[test]
    fn test_transfer_to_same_account_is_not_a_pair() {
        let engine = ReconciliationEngine::new();
        let debit = create_test_transaction(1, 1, "Debit", "Transfer", 0.0, 300.0, 1);
        let mut credit = create_test_transaction(2, 1, "Credit", "Transfer", -300.0, 300.0, 1);
        credit.description = debit.description.clone();

        let (pairs, unmatched) = engine.verify_transfers(&[debit, credit]);

        assert_eq!(pairs, 0);
        assert_eq!(unmatched.len(), 2);
    }

    #[test]
    fn test_reconciliation_result_methods() {
        let balanced = ReconciliationResult::Balanced {
            opening_balance: 1000.0,
            total_credits: 2000.0,
            total_debits: 500.0,
            closing_balance: 2500.0,
        };
        assert!(balanced.is_balanced());
        assert_eq!(balanced.difference(), 0.0);

        let unbalanced = ReconciliationResult::Unbalanced {
            expected_balance: 2500.0,
            actual_balance: 2495.0,
            difference: 5.0,
            broken_links: 1,
        };
        assert!(unbalanced.has_discrepancy());
        assert_eq!(unbalanced.difference(), 5.0);
    }
}
