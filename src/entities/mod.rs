// Entity Models
//
// Each entity has an integer identity (the SQLite primary key) and is
// immutable after generation, apart from its `exported` flag.

pub mod account;
pub mod customer;
pub mod product;
pub mod retailer;
pub mod transaction;

pub use account::{AccountType, BankAccount};
pub use customer::{Address, Customer};
pub use product::BankingProduct;
pub use retailer::{default_retailers, load_retailers_csv, Retailer};
pub use transaction::{AccountTransaction, Operator, TransactionCategory, TransactionType};
