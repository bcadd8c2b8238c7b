//! Domain models for the Lehem ERP backend

mod item;
mod ledger;
mod payment;
mod production;
mod purchase;
mod recipe;

pub use item::*;
pub use ledger::*;
pub use payment::*;
pub use production::*;
pub use purchase::*;
pub use recipe::*;
