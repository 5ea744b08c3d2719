// 🎬 Scenario Generator - Product-driven transactions for one customer
//
// A scenario attaches a banking product to a customer and back-fills
// transactions that fit the product. Savings products receive inbound
// credits whose descriptions come from the product's generator keywords.

use anyhow::{anyhow, ensure, Result};
use chrono::{Duration, NaiveDate};
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::entities::{AccountType, BankAccount, BankingProduct, TransactionCategory, TransactionType};
use crate::ledger::Posting;
use crate::simulator::LedgerSimulator;
use crate::synthetic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSummary {
    pub product: String,
    pub customer_id: i64,
    pub account_id: Option<i64>,
    pub account_opened: bool,
    pub transactions: usize,
}

impl<R: Rng> LedgerSimulator<R> {
    /// Generate the product's scenario for a customer
    ///
    /// The customer's first account of the product's type is used, opening
    /// one when none exists. The transaction count is drawn from
    /// 0..=span days of the existing ledger, plus one; dates fall within
    /// that many days before the end date and never precede the account's
    /// latest entry.
    pub fn generate_scenario(
        &mut self,
        product: &BankingProduct,
        customer_id: i64,
    ) -> Result<ScenarioSummary> {
        self.population.customer(customer_id)?;

        let mut summary = ScenarioSummary {
            product: product.product_name.clone(),
            customer_id,
            account_id: None,
            account_opened: false,
            transactions: 0,
        };

        let account_type = self.reference.account_type_by_id(product.account_type.id)?.clone();

        if account_type.is(AccountType::TRANSMISSION) || account_type.is(AccountType::CREDIT) {
            info!(
                "No scenario transactions for {} products ({})",
                account_type, product.product_name
            );
            return Ok(summary);
        }
        if !account_type.is(AccountType::SAVINGS) {
            warn!(
                "No scenario generator for account type {} ({})",
                account_type, product.product_name
            );
            return Ok(summary);
        }

        let keywords = product.keywords();
        ensure!(
            !keywords.is_empty(),
            "Product {} has no generator keywords",
            product.product_name
        );

        let (oldest, newest) = self
            .ledger
            .date_range()
            .ok_or_else(|| anyhow!("Scenario needs existing transactions to size its window"))?;
        let span = (newest - oldest).num_days();

        let existing = self
            .population
            .accounts_of(customer_id)
            .into_iter()
            .find(|account| account.account_type.id == account_type.id)
            .cloned();
        let account = match existing {
            Some(account) => account,
            None => {
                summary.account_opened = true;
                let account = self.open_account(customer_id, account_type)?;
                info!("Opened {} for customer {}", account, customer_id);
                account
            }
        };
        summary.account_id = Some(account.id);

        let n = self.rng.gen_range(0..=span);
        let end_date = self.config.end_date();
        let floor = self
            .ledger
            .latest_for(account.id)
            .map(|tx| tx.transaction_date);

        let mut dates: Vec<NaiveDate> = (0..=n)
            .map(|_| end_date - Duration::days(self.rng.gen_range(0..=n)))
            .collect();
        dates.sort();

        for date in dates {
            let date = floor.map_or(date, |floor| date.max(floor));
            self.generate_inbound_payment(&account, date, &keywords)?;
            summary.transactions += 1;
        }

        info!(
            "Scenario {} posted {} inbound payments to {}",
            product.product_name, summary.transactions, account
        );

        Ok(summary)
    }

    /// Credit the account from a synthetic external payer
    pub fn generate_inbound_payment(
        &mut self,
        account: &BankAccount,
        date: NaiveDate,
        keywords: &[String],
    ) -> Result<()> {
        let transaction_type = self.reference.transaction_type(TransactionType::CREDIT)?.clone();
        let category = self.reference.category(TransactionCategory::EFT)?.clone();
        let value = self.config.inbound_value.draw(&mut self.rng);

        let keyword = keywords
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| synthetic::payment_topic(&mut self.rng).to_string());
        let reference = self.next_reference();
        let description = format!(
            "Inbound payment made from {} for {}, {}: {}",
            account,
            keyword,
            synthetic::company(&mut self.rng),
            reference
        );

        self.ledger.post(
            Posting {
                account_id: account.id,
                transaction_type,
                category,
                value,
                description,
                date,
                reference,
            },
            || 0.0,
        )?;

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
