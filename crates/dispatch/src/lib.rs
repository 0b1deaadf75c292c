//! Batched multi-channel dispatch pipeline.
//!
//! An admin-initiated job flows through:
//! 1. Org authorization — requested recipients checked against the acting
//!    admin's visible subtree (`herald-directory`)
//! 2. Batch planning — order-preserving fixed-size chunks (`planner`)
//! 3. Sequential per-batch dispatch through the notification gateway with
//!    partial-failure accounting (`engine`)
//! 4. Append-only audit of successful sends (`audit`)

pub mod audit;
pub mod engine;
pub mod planner;
pub mod recurrence;
pub mod roster;
pub mod service;
