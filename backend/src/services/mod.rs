//! Business logic services for the Lehem ERP backend

pub mod costing;
pub mod direct_payment;
pub mod financial_ledger;
pub mod ids;
pub mod items;
pub mod production;
pub mod purchase;
pub mod recipe;
pub mod stock_ledger;

pub use direct_payment::DirectPaymentService;
pub use financial_ledger::FinancialLedgerService;
pub use production::ProductionService;
pub use purchase::PurchaseService;
pub use recipe::RecipeService;
pub use stock_ledger::StockLedgerService;
