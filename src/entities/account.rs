// 💳 Account Entity - Bank account owned by exactly one customer
//
// Account type decides whether card purchases are allowed on the account
// ("transactional"). The first account of every customer is a Transmission
// account, which is the default transactional type.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountType {
    pub id: i64,

    /// Display name ("Transmission", "Savings", "Credit")
    pub name: String,

    /// Purchases may only be posted to transactional accounts
    pub transactional: bool,
}

impl AccountType {
    pub const TRANSMISSION: &'static str = "Transmission";
    pub const SAVINGS: &'static str = "Savings";
    pub const CREDIT: &'static str = "Credit";

    pub fn new(id: i64, name: &str, transactional: bool) -> Self {
        AccountType {
            id,
            name: name.to_string(),
            transactional,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// BANK ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: i64,
    pub customer_id: i64,
    pub account_type: AccountType,

    /// Example: "EL03-482913-Savings"
    pub account_number: String,
    pub exported: bool,
}

impl BankAccount {
    pub fn new(id: i64, customer_id: i64, account_type: AccountType, account_number: String) -> Self {
        BankAccount {
            id,
            customer_id,
            account_type,
            account_number,
            exported: false,
        }
    }

    pub fn is_transactional(&self) -> bool {
        self.account_type.transactional
    }

    /// Build an account number from its random parts
    ///
    /// Example: (3, 482913, "Savings") → "EL03-482913-Savings"
    pub fn format_account_number(prefix: u8, number: u32, account_type: &str) -> String {
        format!("EL0{}-{}-{}", prefix, number, account_type)
    }
}

impl fmt::Display for BankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.account_number)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_creation() {
        let account_type = AccountType::new(1, AccountType::TRANSMISSION, true);
        let account = BankAccount::new(
            7,
            3,
            account_type.clone(),
            "EL01-123456-Transmission".to_string(),
        );

        assert_eq!(account.customer_id, 3);
        assert_eq!(account.account_type, account_type);
        assert!(account.is_transactional());
        assert!(!account.exported);
        assert_eq!(account.to_string(), "EL01-123456-Transmission");
    }

    #[test]
    fn test_format_account_number() {
        assert_eq!(
            BankAccount::format_account_number(3, 482913, "Savings"),
            "EL03-482913-Savings"
        );
    }

    #[test]
    fn test_account_type_name_match_is_case_insensitive() {
        let savings = AccountType::new(2, AccountType::SAVINGS, false);
        assert!(savings.is("savings"));
        assert!(!savings.is(AccountType::CREDIT));
        assert_eq!(savings.to_string(), "Savings");
    }
}
