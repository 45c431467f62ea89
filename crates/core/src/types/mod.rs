//! Core types for Concreto.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;

pub use id::*;
pub use money::{
    checked_sum, fits_numeric, is_storable_price, is_storable_quantity, round_money,
    round_unit_cost, weighted_unit_cost,
};
