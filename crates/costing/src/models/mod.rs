//! Domain models for the costing subsystem.

pub mod allocation;
pub mod catalog;
pub mod confirmation;
pub mod entry;
pub mod remision;
pub mod report;

pub use allocation::{Allocation, AllocationDetail, NewAllocation};
pub use catalog::{CreateMaterialInput, CreatePlantInput, CreatePriceInput, Material, Plant};
pub use confirmation::{ConfirmationOutcome, LineAllocation, LineError};
pub use entry::{CreateEntryInput, Entry, EntryFilter};
pub use remision::{CreateRemisionInput, Remision, RemisionLine, RemisionLineInput};
pub use report::{LineCost, MaterialValuation, RemisionCost};
