// 📚 Reference Data - Account types, transaction types, categories
//
// Every lookup returns an error when the row is absent. Generation treats
// that as fatal: there is nothing sensible to post without the row.

use anyhow::{anyhow, Context, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::{AccountType, Operator, TransactionCategory, TransactionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub account_types: Vec<AccountType>,
    pub transaction_types: Vec<TransactionType>,
    pub categories: Vec<TransactionCategory>,
}

impl ReferenceData {
    /// Reference rows a fresh database is seeded with
    pub fn standard() -> Self {
        ReferenceData {
            account_types: vec![
                AccountType::new(1, AccountType::TRANSMISSION, true),
                AccountType::new(2, AccountType::SAVINGS, false),
                AccountType::new(3, AccountType::CREDIT, true),
            ],
            transaction_types: vec![
                TransactionType::new(1, TransactionType::DEBIT, Operator::Subtract),
                TransactionType::new(2, TransactionType::CREDIT, Operator::Add),
            ],
            categories: vec![
                TransactionCategory::new(1, TransactionCategory::PURCHASE, 6),
                TransactionCategory::new(2, TransactionCategory::TRANSFER, 1),
                TransactionCategory::new(3, TransactionCategory::EFT, 3),
            ],
        }
    }

    pub fn account_type(&self, name: &str) -> Result<&AccountType> {
        self.account_types
            .iter()
            .find(|t| t.is(name))
            .ok_or_else(|| anyhow!("Account type not found: {}", name))
    }

    pub fn account_type_by_id(&self, id: i64) -> Result<&AccountType> {
        self.account_types
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow!("Account type not found: id {}", id))
    }

    /// Type given to every customer's first account
    pub fn default_account_type(&self) -> Result<&AccountType> {
        self.account_type(AccountType::TRANSMISSION)
            .context("Default transactional account type is missing")
    }

    pub fn transaction_type(&self, name: &str) -> Result<&TransactionType> {
        self.transaction_types
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("Transaction type not found: {}", name))
    }

    pub fn transaction_type_by_id(&self, id: i64) -> Result<&TransactionType> {
        self.transaction_types
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow!("Transaction type not found: id {}", id))
    }

    pub fn category(&self, name: &str) -> Result<&TransactionCategory> {
        self.categories
            .iter()
            .find(|c| c.is(name))
            .ok_or_else(|| anyhow!("Transaction category not found: {}", name))
    }

    pub fn category_by_id(&self, id: i64) -> Result<&TransactionCategory> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("Transaction category not found: id {}", id))
    }

    /// Replace category weights by name; unknown names are an error
    pub fn apply_weights(&mut self, weights: &BTreeMap<String, u32>) -> Result<()> {
        for (name, weight) in weights {
            let category = self
                .categories
                .iter_mut()
                .find(|c| c.is(name))
                .ok_or_else(|| anyhow!("Cannot weight unknown category: {}", name))?;
            category.weight = *weight;
        }
        Ok(())
    }

    pub fn category_weights(&self) -> Result<CategoryWeights> {
        CategoryWeights::new(self.categories.clone())
    }
}

// ============================================================================
// CATEGORY WEIGHTS
// ============================================================================

/// Weighted draw over transaction categories
#[derive(Debug, Clone)]
pub struct CategoryWeights {
    categories: Vec<TransactionCategory>,
    index: WeightedIndex<u32>,
}

impl CategoryWeights {
    pub fn new(categories: Vec<TransactionCategory>) -> Result<Self> {
        let index = WeightedIndex::new(categories.iter().map(|c| c.weight))
            .map_err(|e| anyhow!("Invalid category weights: {}", e))?;
        Ok(CategoryWeights { categories, index })
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &TransactionCategory {
        &self.categories[self.index.sample(rng)]
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_standard_lookups() {
        let reference = ReferenceData::standard();

        assert!(reference.default_account_type().unwrap().transactional);
        assert_eq!(
            reference.transaction_type("debit").unwrap().operator,
            Operator::Subtract
        );
        assert_eq!(reference.category("EFT").unwrap().id, 3);
        assert_eq!(reference.account_type_by_id(2).unwrap().name, "Savings");
    }

    #[test]
    fn test_missing_rows_are_errors() {
        let mut reference = ReferenceData::standard();
        reference.transaction_types.retain(|t| t.name != TransactionType::CREDIT);
        reference.account_types.clear();

        assert!(reference.transaction_type(TransactionType::CREDIT).is_err());
        assert!(reference.default_account_type().is_err());
        assert!(reference.category("Refund").is_err());
    }

    #[test]
    fn test_apply_weights() {
        let mut reference = ReferenceData::standard();
        let mut weights = BTreeMap::new();
        weights.insert("purchase".to_string(), 0);
        weights.insert("EFT".to_string(), 9);
        reference.apply_weights(&weights).unwrap();

        assert_eq!(reference.category("Purchase").unwrap().weight, 0);
        assert_eq!(reference.category("EFT").unwrap().weight, 9);

        weights.insert("Refund".to_string(), 1);
        assert!(reference.apply_weights(&weights).is_err());
    }

    #[test]
    fn test_zero_weight_category_is_never_drawn() {
        let mut reference = ReferenceData::standard();
        let mut weights = BTreeMap::new();
        weights.insert("Purchase".to_string(), 0);
        weights.insert("Transfer".to_string(), 0);
        reference.apply_weights(&weights).unwrap();

        let category_weights = reference.category_weights().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            assert_eq!(category_weights.draw(&mut rng).name, "EFT");
        }
    }

    #[test]
    fn test_all_zero_weights_are_rejected() {
        let categories = vec![
            TransactionCategory::new(1, "Purchase", 0),
            TransactionCategory::new(2, "EFT", 0),
        ];
        assert!(CategoryWeights::new(categories).is_err());
        assert!(CategoryWeights::new(Vec::new()).is_err());
    }
}
