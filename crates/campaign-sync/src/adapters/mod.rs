//! # Adapters Layer
//!
//! Implementations of the outbound ledger port.

mod memory_ledger;

pub use memory_ledger::{Fault, InMemoryLedger, LedgerHandle, DEFAULT_FEED_CAPACITY};
