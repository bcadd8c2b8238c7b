//! HTTP handlers for the Lehem ERP backend

pub mod direct_payment;
pub mod financial_ledger;
pub mod health;
pub mod production;
pub mod purchase;
pub mod recipe;
pub mod stock_ledger;

pub use direct_payment::*;
pub use financial_ledger::*;
pub use health::*;
pub use production::*;
pub use purchase::*;
pub use recipe::*;
pub use stock_ledger::*;
