//! Concreto Core - Shared types and FIFO costing engine.
//!
//! This crate provides the pieces of the material-costing subsystem that do
//! no I/O. The other workspace crates build on it:
//! - `costing` - Persistence, confirmation orchestration, and valuation reports
//! - `cli` - Command-line tools for migrations, seeding, and confirmations
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no database access,
//! no clocks, no configuration. The allocation engine works over a snapshot
//! of cost layers handed to it by the caller, which makes it deterministic and
//! easy to test.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and money rounding
//! - [`fifo`] - The FIFO allocation engine
//! - [`valuation`] - Remaining-inventory valuation over cost layers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fifo;
pub mod types;
pub mod valuation;

pub use fifo::{
    AllocationError, AllocationLine, AllocationResult, ConsumptionRequest, CostLayer,
    PriceSource, allocate,
};
pub use types::*;
pub use valuation::{LayerValuation, Valuation, value_layers};
