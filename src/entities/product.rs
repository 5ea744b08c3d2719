// 🏦 Banking Product - Offer tied to an account type
//
// Generator keywords drive the descriptions of scenario transactions.

use serde::{Deserialize, Serialize};

use super::account::AccountType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingProduct {
    pub id: i64,
    pub account_type: AccountType,
    pub product_name: String,
    pub description: String,

    /// Comma separated ("salary,bonus,dividends")
    pub generator_keywords: Option<String>,
    pub exported: bool,
}

impl BankingProduct {
    /// Keywords split on commas, trimmed, blanks dropped
    pub fn keywords(&self) -> Vec<String> {
        self.generator_keywords
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_string)
            .collect()
    }
}
