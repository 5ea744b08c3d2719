// 👥 Population - Customers, addresses and accounts of one dataset
//
// Append-only registry. Ids continue from the highest id already present,
// so a population loaded from the database can be extended in place.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::entities::{AccountType, Address, BankAccount, Customer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    customers: Vec<Customer>,
    addresses: Vec<Address>,
    accounts: Vec<BankAccount>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored rows
    pub fn from_parts(
        customers: Vec<Customer>,
        addresses: Vec<Address>,
        accounts: Vec<BankAccount>,
    ) -> Self {
        Population {
            customers,
            addresses,
            accounts,
        }
    }

    // ========================================================================
    // ID ALLOCATION
    // ========================================================================

    pub fn next_customer_id(&self) -> i64 {
        self.customers.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }

    pub fn next_address_id(&self) -> i64 {
        self.addresses.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }

    pub fn next_account_id(&self) -> i64 {
        self.accounts.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    pub fn add_customer(&mut self, customer: Customer) -> &Customer {
        self.customers.push(customer);
        &self.customers[self.customers.len() - 1]
    }

    pub fn add_address(&mut self, address: Address) -> Result<&Address> {
        self.customer(address.customer_id)?;
        self.addresses.push(address);
        Ok(&self.addresses[self.addresses.len() - 1])
    }

    /// Open a new account for an existing customer
    pub fn open_account(
        &mut self,
        customer_id: i64,
        account_type: AccountType,
        account_number: String,
    ) -> Result<&BankAccount> {
        self.customer(customer_id)?;
        let account = BankAccount::new(
            self.next_account_id(),
            customer_id,
            account_type,
            account_number,
        );
        self.accounts.push(account);
        Ok(&self.accounts[self.accounts.len() - 1])
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn accounts(&self) -> &[BankAccount] {
        &self.accounts
    }

    pub fn customer(&self, id: i64) -> Result<&Customer> {
        self.customers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("Customer not found: {}", id))
    }

    pub fn account(&self, id: i64) -> Result<&BankAccount> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow!("Bank account not found: {}", id))
    }

    pub fn address_of(&self, customer_id: i64) -> Option<&Address> {
        self.addresses.iter().find(|a| a.customer_id == customer_id)
    }

    pub fn accounts_of(&self, customer_id: i64) -> Vec<&BankAccount> {
        self.accounts
            .iter()
            .filter(|a| a.customer_id == customer_id)
            .collect()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn create_test_customer(id: i64) -> Customer {
        Customer::new(
            id,
            "Test".to_string(),
            "Customer".to_string(),
            "test@demo-domain.org".to_string(),
            NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_ids_continue_after_existing_rows() {
        let mut population = Population::new();
        assert_eq!(population.next_customer_id(), 1);

        population.add_customer(create_test_customer(7));
        assert_eq!(population.next_customer_id(), 8);

        let transmission = AccountType::new(1, AccountType::TRANSMISSION, true);
        let first = population
            .open_account(7, transmission.clone(), "EL01-100000-Transmission".to_string())
            .unwrap()
            .id;
        let second = population
            .open_account(7, transmission, "EL02-100001-Transmission".to_string())
            .unwrap()
            .id;

        assert_eq!((first, second), (1, 2));
        assert_eq!(population.accounts_of(7).len(), 2);
    }

    #[test]
    fn test_unknown_customer_is_rejected() {
        let mut population = Population::new();
        let savings = AccountType::new(2, AccountType::SAVINGS, false);

        assert!(population
            .open_account(42, savings, "EL01-100000-Savings".to_string())
            .is_err());
        assert!(population.customer(42).is_err());
        assert!(population.account(1).is_err());
    }
}
