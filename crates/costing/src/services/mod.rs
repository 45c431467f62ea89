//! Business logic services for costing.
//!
//! # Services
//!
//! - `confirmation` - Remision confirmation (FIFO allocation, transactional)
//! - `cost_report` - Line and remision FIFO cost breakdowns
//! - `receiving` - Recording receipts into the entry ledger
//! - `valuation` - Current value of undepleted lots

pub mod confirmation;
pub mod cost_report;
pub mod receiving;
pub mod valuation;

pub use confirmation::ConfirmationService;
pub use cost_report::CostReportService;
pub use receiving::ReceivingService;
pub use valuation::ValuationService;
