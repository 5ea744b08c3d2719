// 👤 Customer Entity - Identity attributes + postal address
//
// A customer owns exactly one address and one or more bank accounts.
// Both are created once during generation; only `exported` changes later.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CUSTOMER ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,

    /// Set once the record has been pushed to the search index
    pub exported: bool,
}

impl Customer {
    pub fn new(
        id: i64,
        first_name: String,
        last_name: String,
        email: String,
        date_of_birth: NaiveDate,
    ) -> Self {
        Customer {
            id,
            first_name,
            last_name,
            email,
            date_of_birth,
            exported: false,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on the given date
    pub fn age_on(&self, date: NaiveDate) -> i32 {
        let mut age = date.year() - self.date_of_birth.year();
        if (date.month(), date.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            age -= 1;
        }
        age
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// ADDRESS ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub customer_id: i64,
    pub address_line_one: String,
    pub address_line_two: Option<String>,

    /// City
    pub suburb: String,
    pub state: String,
    pub postal_code: String,
    pub exported: bool,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address_line_two {
            Some(line_two) => write!(f, "{}, {}", self.address_line_one, line_two),
            None => write!(f, "{}", self.address_line_one),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
