//! Stock ledger domain module.
//!
//! Per-(product, store) on-hand quantities and the immutable movement records
//! that audit every change, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod stock;
pub mod transfer;

pub use stock::{
    AdjustStock, MovementDirection, MovementId, StockEntry, StockEvent, StockKey, StockMovement,
};
pub use transfer::{TransferOutcome, TransferStock, execute_transfer};
