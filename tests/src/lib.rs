//! # Campaign-Sync Test Suite
//!
//! End-to-end scenarios driving the client, saga, and synchronizer against
//! the in-memory ledger.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── donation_flows.rs    # saga outcomes, pending overlay
//!     ├── sync_recovery.rs     # resync, reconnect, duplicate delivery
//!     └── withdrawal_flows.rs  # eligibility, concurrent withdrawals
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p campaign-tests
//! cargo test -p campaign-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
