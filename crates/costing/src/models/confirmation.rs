//! Result types of a remision confirmation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use concreto_core::{AllocationLine, MaterialId, RemisionId, RemisionLineId};

use crate::error::ErrorKind;

/// Outcome of confirming a remision.
///
/// Confirmation is atomic per remision: when `errors` is non-empty nothing
/// was committed, `success` is false and `allocations_created` is zero.
/// `lines` then still shows what the lines that did fit would have drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationOutcome {
    pub remision_id: RemisionId,
    pub success: bool,
    /// Number of allocation rows written to the ledger.
    pub allocations_created: usize,
    /// Exact FIFO cost of the whole remision (zero when nothing was committed).
    pub total_cost: Decimal,
    /// Per-line allocation results, in line order.
    pub lines: Vec<LineAllocation>,
    /// Lines that could not be allocated.
    pub errors: Vec<LineError>,
    /// Attempts used (more than one when lock contention forced a retry).
    pub attempts: u32,
}

/// Allocation result for one material-usage line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAllocation {
    pub remision_line_id: RemisionLineId,
    pub material_id: MaterialId,
    pub quantity: Decimal,
    pub total_cost: Decimal,
    pub weighted_unit_cost: Decimal,
    pub allocations: Vec<AllocationLine>,
}

/// Why a line could not be allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineError {
    pub remision_line_id: RemisionLineId,
    pub material_id: MaterialId,
    pub kind: ErrorKind,
    pub message: String,
}
