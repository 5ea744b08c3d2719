// 🏭 Ledger Simulator - Synthetic customers, accounts and transactions
//
// Pipeline: population → day-by-day simulation → done.
//
// All randomness flows through one injected RNG, so a fixed seed and a fixed
// end date reproduce the same dataset down to the transaction references.

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::entities::{
    AccountType, Address, BankAccount, Customer, Retailer, TransactionCategory, TransactionType,
};
use crate::ledger::{Ledger, Posting};
use crate::population::Population;
use crate::reference::{CategoryWeights, ReferenceData};
use crate::synthetic;

/// Accounts opened per new customer (inclusive)
pub const MIN_ACCOUNTS_PER_CUSTOMER: usize = 1;
pub const MAX_ACCOUNTS_PER_CUSTOMER: usize = 5;

// ============================================================================
// SUMMARIES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub purchases: usize,
    pub payments: usize,
    pub transfers: usize,

    /// Transfers drawn while no second account existed
    pub skipped_transfers: usize,
}

impl DaySummary {
    /// Ledger entries written (a transfer writes two)
    pub fn transactions(&self) -> usize {
        self.purchases + self.payments + 2 * self.transfers
    }

    pub fn absorb(&mut self, other: &DaySummary) {
        self.purchases += other.purchases;
        self.payments += other.payments;
        self.transfers += other.transfers;
        self.skipped_transfers += other.skipped_transfers;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub customers_created: usize,
    pub accounts_created: usize,
    pub days_simulated: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub totals: DaySummary,
}

// ============================================================================
// SIMULATOR
// ============================================================================

pub struct LedgerSimulator<R: Rng = ChaCha8Rng> {
    pub(crate) config: SimulationConfig,
    pub(crate) reference: ReferenceData,
    pub(crate) retailers: Vec<Retailer>,
    pub(crate) rng: R,
    pub(crate) population: Population,
    pub(crate) ledger: Ledger,
}

impl LedgerSimulator<ChaCha8Rng> {
    /// Simulator seeded from `config.seed`, or from a fresh random seed
    pub fn from_config(
        config: SimulationConfig,
        reference: ReferenceData,
        retailers: Vec<Retailer>,
    ) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        info!("Random seed: {}", seed);
        LedgerSimulator::new(config, reference, retailers, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> LedgerSimulator<R> {
    pub fn new(
        config: SimulationConfig,
        mut reference: ReferenceData,
        retailers: Vec<Retailer>,
        rng: R,
    ) -> Result<Self> {
        config.validate()?;
        reference.apply_weights(&config.category_weights)?;

        Ok(LedgerSimulator {
            config,
            reference,
            retailers,
            rng,
            population: Population::new(),
            ledger: Ledger::new(),
        })
    }

    /// Continue from an existing dataset instead of an empty one
    pub fn with_dataset(mut self, population: Population, ledger: Ledger) -> Self {
        self.population = population;
        self.ledger = ledger;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_dataset(self) -> (Population, Ledger) {
        (self.population, self.ledger)
    }

    // ========================================================================
    // BATCH RUN
    // ========================================================================

    /// Generate `customer_count` customers, then simulate every day of the
    /// configured window over all accounts
    ///
    /// When the ledger already holds entries the window starts the day after
    /// its newest day, so existing chains are only ever extended forward and
    /// no day is drawn twice.
    pub fn run(&mut self) -> Result<SimulationSummary> {
        let weights = self.reference.category_weights()?;

        let customers_before = self.population.customer_count();
        let accounts_before = self.population.account_count();
        self.generate_population(self.config.customer_count)?;

        let customers_created = self.population.customer_count() - customers_before;
        let accounts_created = self.population.account_count() - accounts_before;
        info!(
            "Created {} customers with {} accounts",
            customers_created, accounts_created
        );

        let end_date = self.config.end_date();
        let mut start_date = self.config.start_date()?;
        if let Some((_, newest)) = self.ledger.date_range() {
            if newest >= start_date {
                start_date = newest
                    .succ_opt()
                    .ok_or_else(|| anyhow!("No day follows the newest transaction on {}", newest))?;
                warn!(
                    "Existing transactions run until {}; simulation resumes on {}",
                    newest, start_date
                );
            }
        }

        let accounts = self.population.accounts().to_vec();
        let mut totals = DaySummary::default();
        let mut days_simulated = 0;
        let mut first_day = None;
        let mut last_day = None;

        for date in start_date.iter_days().take_while(|date| *date <= end_date) {
            let day = self.simulate_day(date, &accounts, &weights)?;
            totals.absorb(&day);
            days_simulated += 1;
            first_day.get_or_insert(date);
            last_day = Some(date);

            if days_simulated % 30 == 0 {
                info!(
                    "Simulated {} days up to {} ({} transactions so far)",
                    days_simulated,
                    date,
                    totals.transactions()
                );
            }
        }

        info!(
            "Simulation complete: {} days, {} purchases, {} payments, {} transfers",
            days_simulated, totals.purchases, totals.payments, totals.transfers
        );

        Ok(SimulationSummary {
            customers_created,
            accounts_created,
            days_simulated,
            first_day,
            last_day,
            totals,
        })
    }

    // ========================================================================
    // POPULATION
    // ========================================================================

    /// Create customers, each with one address and 1-5 accounts
    ///
    /// The first account is always of the default transactional type; the
    /// others draw their type uniformly. Returns the new customer ids.
    pub fn generate_population(&mut self, customer_count: usize) -> Result<Vec<i64>> {
        let default_type = self.reference.default_account_type()?.clone();
        let today = self.config.end_date();
        let mut created = Vec::with_capacity(customer_count);

        for _ in 0..customer_count {
            let customer = Customer::new(
                self.population.next_customer_id(),
                synthetic::first_name(&mut self.rng).to_string(),
                synthetic::last_name(&mut self.rng).to_string(),
                synthetic::email(&mut self.rng),
                synthetic::date_of_birth(&mut self.rng, today),
            );
            let customer_id = self.population.add_customer(customer).id;

            let template = synthetic::address(&mut self.rng);
            self.population.add_address(Address {
                id: self.population.next_address_id(),
                customer_id,
                address_line_one: template.address_line_one.to_string(),
                address_line_two: template.address_line_two.map(str::to_string),
                suburb: template.city().to_string(),
                state: template.state.to_string(),
                postal_code: template.postal_code.to_string(),
                exported: false,
            })?;

            let account_count =
                self.rng.gen_range(MIN_ACCOUNTS_PER_CUSTOMER..=MAX_ACCOUNTS_PER_CUSTOMER);
            for n in 0..account_count {
                let account_type = if n == 0 {
                    default_type.clone()
                } else {
                    self.reference
                        .account_types
                        .choose(&mut self.rng)
                        .cloned()
                        .ok_or_else(|| anyhow!("No account types available"))?
                };
                self.open_account(customer_id, account_type)?;
            }

            created.push(customer_id);
        }

        Ok(created)
    }

    pub(crate) fn open_account(
        &mut self,
        customer_id: i64,
        account_type: AccountType,
    ) -> Result<BankAccount> {
        let (prefix, number) = synthetic::account_number_parts(&mut self.rng);
        let account_number = BankAccount::format_account_number(prefix, number, &account_type.name);
        let account = self
            .population
            .open_account(customer_id, account_type, account_number)?;
        Ok(account.clone())
    }

    // ========================================================================
    // DAILY SIMULATION
    // ========================================================================

    /// Draw and post one day of transactions for every account
    pub fn simulate_day(
        &mut self,
        date: NaiveDate,
        accounts: &[BankAccount],
        category_weights: &CategoryWeights,
    ) -> Result<DaySummary> {
        let mut day = DaySummary::default();

        for account in accounts {
            let count = self.rng.gen_range(
                self.config.min_daily_transactions..=self.config.max_daily_transactions,
            );

            for _ in 0..count {
                let category = category_weights.draw(&mut self.rng).name.clone();

                if category.eq_ignore_ascii_case(TransactionCategory::PURCHASE) {
                    self.generate_purchase(account, accounts, date)?;
                    day.purchases += 1;
                } else if category.eq_ignore_ascii_case(TransactionCategory::TRANSFER) {
                    if self.generate_transfer(account, accounts, date)? {
                        day.transfers += 1;
                    } else {
                        day.skipped_transfers += 1;
                    }
                } else if category.eq_ignore_ascii_case(TransactionCategory::EFT) {
                    self.generate_outbound_payment(account, date)?;
                    day.payments += 1;
                } else {
                    bail!("No generator for transaction category: {}", category);
                }
            }
        }

        Ok(day)
    }

    /// Debit a transactional account at a random retailer
    ///
    /// A purchase drawn for a non-transactional account is posted to one of
    /// the same customer's transactional accounts instead.
    pub fn generate_purchase(
        &mut self,
        account: &BankAccount,
        accounts: &[BankAccount],
        date: NaiveDate,
    ) -> Result<()> {
        let target = if account.is_transactional() {
            account
        } else {
            let transactional: Vec<&BankAccount> = accounts
                .iter()
                .filter(|a| a.customer_id == account.customer_id && a.is_transactional())
                .collect();
            transactional
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(account)
        };

        let transaction_type = self.reference.transaction_type(TransactionType::DEBIT)?.clone();
        let category = self.reference.category(TransactionCategory::PURCHASE)?.clone();
        let value = self.config.purchase_value.draw(&mut self.rng);

        let retailer = self
            .retailers
            .choose(&mut self.rng)
            .ok_or_else(|| anyhow!("No retailers available for purchases"))?;
        let location = synthetic::address(&mut self.rng);
        let description = format!(
            "Purchase at merchant: {}, location: {},{}",
            retailer.name,
            location.city(),
            location.state
        );

        let reference = self.next_reference();
        let seed = self.config.purchase_opening_seed;
        self.ledger.post(
            Posting {
                account_id: target.id,
                transaction_type,
                category,
                value,
                description,
                date,
                reference,
            },
            || seed.draw(&mut self.rng),
        )?;

        Ok(())
    }

    /// Debit the account to a synthetic external payee
    pub fn generate_outbound_payment(&mut self, account: &BankAccount, date: NaiveDate) -> Result<()> {
        let transaction_type = self.reference.transaction_type(TransactionType::DEBIT)?.clone();
        let category = self.reference.category(TransactionCategory::EFT)?.clone();
        let value = self.config.payment_value.draw(&mut self.rng);

        let reference = self.next_reference();
        let description = format!(
            "Payment made from {} to {} {}, {}: {}",
            account,
            synthetic::first_name(&mut self.rng),
            synthetic::last_name(&mut self.rng),
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

    /// Post a matched debit/credit pair between two distinct accounts
    ///
    /// Returns false (and posts nothing) when no second account exists.
    pub fn generate_transfer(
        &mut self,
        account: &BankAccount,
        accounts: &[BankAccount],
        date: NaiveDate,
    ) -> Result<bool> {
        let candidates: Vec<&BankAccount> = accounts.iter().filter(|a| a.id != account.id).collect();
        let Some(other) = candidates.choose(&mut self.rng).copied() else {
            warn!("No second account to transfer to from {}; skipping", account);
            return Ok(false);
        };

        let outbound_type = self.reference.transaction_type(TransactionType::DEBIT)?.clone();
        let inbound_type = self.reference.transaction_type(TransactionType::CREDIT)?.clone();
        let category = self.reference.category(TransactionCategory::TRANSFER)?.clone();
        let value = self.config.transfer_value.draw(&mut self.rng);
        let description = format!("Transfer made from {} to {} - Reason: internal", account, other);

        let outbound_reference = self.next_reference();
        self.ledger.post(
            Posting {
                account_id: account.id,
                transaction_type: outbound_type,
                category: category.clone(),
                value,
                description: description.clone(),
                date,
                reference: outbound_reference,
            },
            || 0.0,
        )?;

        let inbound_reference = self.next_reference();
        self.ledger.post(
            Posting {
                account_id: other.id,
                transaction_type: inbound_type,
                category,
                value,
                description,
                date,
                reference: inbound_reference,
            },
            || 0.0,
        )?;

        Ok(true)
    }

    pub(crate) fn next_reference(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::default_retailers;
    use crate::reconciliation::ReconciliationEngine;
    use proptest::prelude::*;

    fn test_config(customers: usize, months: u32) -> SimulationConfig {
        SimulationConfig {
            customer_count: customers,
            months,
            min_daily_transactions: 0,
            max_daily_transactions: 3,
            seed: Some(7),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..SimulationConfig::default()
        }
    }

    fn test_simulator(config: SimulationConfig, seed: u64) -> LedgerSimulator {
        LedgerSimulator::new(
            config,
            ReferenceData::standard(),
            default_retailers(),
            ChaCha8Rng::seed_from_u64(seed),
        )
        .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_population_shape() {
        let mut simulator = test_simulator(test_config(25, 1), 1);
        let created = simulator.generate_population(25).unwrap();

        let population = simulator.population();
        assert_eq!(created.len(), 25);
        assert_eq!(population.customer_count(), 25);
        assert_eq!(population.addresses().len(), 25);

        for customer in population.customers() {
            let accounts = population.accounts_of(customer.id);
            assert!((MIN_ACCOUNTS_PER_CUSTOMER..=MAX_ACCOUNTS_PER_CUSTOMER).contains(&accounts.len()));
            assert_eq!(accounts[0].account_type.name, "Transmission");
            assert!(accounts[0].is_transactional());
            assert!(population.address_of(customer.id).is_some());

            let age = customer.age_on(simulator.config().end_date());
            assert!((17..=100).contains(&age));
        }
    }

    #[test]
    fn test_first_purchase_opens_with_seed_and_payment_opens_at_zero() {
        let mut simulator = test_simulator(test_config(2, 1), 2);
        simulator.generate_population(2).unwrap();
        let accounts = simulator.population().accounts().to_vec();
        let first = accounts[0].clone();
        let second_customer_account = accounts
            .iter()
            .find(|a| a.customer_id != first.customer_id)
            .unwrap()
            .clone();

        simulator.generate_purchase(&first, &accounts, day(1)).unwrap();
        let purchase = simulator.ledger().latest_for(first.id).unwrap().clone();
        assert!((100.0..=5000.0).contains(&purchase.opening_balance));
        assert!((10.0..=200.0).contains(&purchase.transaction_value));
        assert_eq!(
            purchase.closing_balance,
            purchase.opening_balance - purchase.transaction_value
        );
        assert!(purchase.description.starts_with("Purchase at merchant: "));
        assert_eq!(purchase.category.name, "Purchase");

        simulator
            .generate_outbound_payment(&second_customer_account, day(1))
            .unwrap();
        let payment = simulator
            .ledger()
            .latest_for(second_customer_account.id)
            .unwrap();
        assert_eq!(payment.opening_balance, 0.0);
        assert_eq!(payment.closing_balance, -payment.transaction_value);
        assert_eq!(payment.category.name, "EFT");
        assert!(payment.description.contains(&payment.reference.to_string()));
    }

    #[test]
    fn test_purchase_on_savings_goes_to_transactional_account() {
        let mut simulator = test_simulator(test_config(1, 1), 3);
        let reference = ReferenceData::standard();
        let customer = Customer::new(
            1,
            "A".to_string(),
            "B".to_string(),
            "ab@demo-domain.org".to_string(),
            NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
        );
        simulator.population.add_customer(customer);
        let transmission = simulator
            .open_account(1, reference.account_type("Transmission").unwrap().clone())
            .unwrap();
        let savings = simulator
            .open_account(1, reference.account_type("Savings").unwrap().clone())
            .unwrap();
        let accounts = vec![transmission.clone(), savings.clone()];

        simulator.generate_purchase(&savings, &accounts, day(1)).unwrap();

        assert!(simulator.ledger().latest_for(savings.id).is_none());
        assert!(simulator.ledger().latest_for(transmission.id).is_some());
    }

    #[test]
    fn test_transfer_creates_matched_pair() {
        let mut simulator = test_simulator(test_config(3, 1), 4);
        simulator.generate_population(3).unwrap();
        let accounts = simulator.population().accounts().to_vec();

        assert!(simulator.generate_transfer(&accounts[0], &accounts, day(2)).unwrap());

        let entries = simulator.ledger().transactions();
        assert_eq!(entries.len(), 2);
        let (debit, credit) = (&entries[0], &entries[1]);
        assert!(debit.is_debit());
        assert!(credit.is_credit());
        assert_ne!(debit.account_id, credit.account_id);
        assert_eq!(debit.account_id, accounts[0].id);
        assert_eq!(debit.transaction_value, credit.transaction_value);
        assert_eq!(debit.transaction_date, credit.transaction_date);
        assert_eq!(debit.description, credit.description);
        assert_eq!(credit.opening_balance, 0.0);
        assert!((200.0..=800.0).contains(&debit.transaction_value));
    }

    #[test]
    fn test_transfer_without_second_account_is_skipped() {
        let mut simulator = test_simulator(test_config(1, 1), 5);
        let customer = Customer::new(
            1,
            "Solo".to_string(),
            "Saver".to_string(),
            "solo@demo-domain.org".to_string(),
            NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
        );
        simulator.population.add_customer(customer);
        let only = simulator
            .open_account(1, ReferenceData::standard().default_account_type().unwrap().clone())
            .unwrap();

        let posted = simulator
            .generate_transfer(&only, std::slice::from_ref(&only), day(1))
            .unwrap();

        assert!(!posted);
        assert!(simulator.ledger().is_empty());
    }

    #[test]
    fn test_missing_reference_row_is_fatal() {
        let mut reference = ReferenceData::standard();
        reference.transaction_types.retain(|t| t.name != TransactionType::CREDIT);

        let mut config = test_config(3, 1);
        let mut weights = std::collections::BTreeMap::new();
        weights.insert("Purchase".to_string(), 0);
        weights.insert("EFT".to_string(), 0);
        weights.insert("Transfer".to_string(), 1);
        config.category_weights = weights;
        config.min_daily_transactions = 1;

        let mut simulator = LedgerSimulator::new(
            config,
            reference,
            default_retailers(),
            ChaCha8Rng::seed_from_u64(6),
        )
        .unwrap();

        let result = simulator.run();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Credit"));
    }

    #[test]
    fn test_purchase_without_retailers_is_fatal() {
        let mut simulator = LedgerSimulator::new(
            test_config(1, 1),
            ReferenceData::standard(),
            Vec::new(),
            ChaCha8Rng::seed_from_u64(8),
        )
        .unwrap();
        simulator.generate_population(1).unwrap();
        let accounts = simulator.population().accounts().to_vec();

        assert!(simulator.generate_purchase(&accounts[0], &accounts, day(1)).is_err());
    }

    #[test]
    fn test_run_covers_window_inclusive() {
        let mut simulator = test_simulator(test_config(4, 1), 9);
        let summary = simulator.run().unwrap();

        assert_eq!(summary.customers_created, 4);
        assert_eq!(summary.days_simulated, 31);
        assert_eq!(summary.first_day, NaiveDate::from_ymd_opt(2024, 5, 31));
        assert_eq!(summary.last_day, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(summary.totals.transactions(), simulator.ledger().len());
    }

    #[test]
    fn test_resumed_run_extends_chains_forward() {
        let mut first = test_simulator(test_config(3, 1), 10);
        first.run().unwrap();
        let (population, ledger) = first.into_dataset();
        let before = ledger.len();
        let first_ledger = ledger.clone();

        let mut config = test_config(2, 1);
        config.end_date = NaiveDate::from_ymd_opt(2024, 7, 15);
        let mut second = test_simulator(config, 11).with_dataset(population, ledger);
        let summary = second.run().unwrap();

        assert_eq!(second.population().customer_count(), 5);
        let newest = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(summary.first_day, newest.succ_opt());
        assert!(second.ledger().len() >= before);

        // the newest stored day is not simulated a second time
        let on_newest = |ledger: &Ledger| {
            ledger
                .transactions()
                .iter()
                .filter(|tx| tx.transaction_date == newest)
                .count()
        };
        assert_eq!(on_newest(second.ledger()), on_newest(&first_ledger));

        let report = ReconciliationEngine::new().reconcile(second.ledger());
        assert!(report.is_balanced(), "{}", report.summary());
    }

    #[test]
    fn test_same_seed_same_ledger() {
        let mut a = test_simulator(test_config(5, 2), 42);
        let mut b = test_simulator(test_config(5, 2), 42);
        a.run().unwrap();
        b.run().unwrap();

        assert_eq!(a.population(), b.population());
        assert_eq!(a.ledger().transactions(), b.ledger().transactions());

        let mut c = test_simulator(test_config(5, 2), 43);
        c.run().unwrap();
        assert_ne!(a.ledger().transactions(), c.ledger().transactions());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 24,
            ..ProptestConfig::default()
        })]

        /// Property: every generated account history is an unbroken chain and
        /// every transfer debit has a matching credit on the same day.
        #[test]
        fn generated_ledgers_always_reconcile(
            seed in any::<u64>(),
            customers in 1usize..6,
            max_daily in 0u32..4,
        ) {
            let mut config = test_config(customers, 1);
            config.max_daily_transactions = max_daily;
            let mut simulator = test_simulator(config, seed);
            simulator.run().unwrap();

            let report = ReconciliationEngine::new().reconcile(simulator.ledger());
            prop_assert!(report.is_balanced(), "{}", report.summary());

            for chain in simulator.ledger().chains().values() {
                for pair in chain.windows(2) {
                    prop_assert_eq!(pair[1].opening_balance, pair[0].closing_balance);
                }
            }

            prop_assert_eq!(simulator.population().customer_count(), customers);
            for customer in simulator.population().customers() {
                let n = simulator.population().accounts_of(customer.id).len();
                prop_assert!((1..=5).contains(&n));
            }
        }
    }
}
