//! # Campaign Sync
//!
//! Client-side core for a donation-campaign ledger: a local mirror of
//! campaigns and donations, kept consistent with an authoritative,
//! append-only remote event log.
//!
//! The ledger is the final arbiter of every money-relevant rule (no double
//! withdrawal, no donation after closure, monotonic totals). This crate's
//! job is to mirror it correctly and to submit well-formed operations:
//!
//! - reads and writes go through the [`ports::LedgerConnection`] port;
//! - donations run as a two-step saga (allowance grant, then transfer)
//!   with explicit partial-failure policy;
//! - the [`application::EventSynchronizer`] owns the subscription,
//!   deduplicates and orders deliveries, and resynchronizes from reads
//!   whenever the feed cannot be trusted to be complete;
//! - [`domain::invariants`] holds the pure validation both the client and
//!   the in-memory ledger double enforce.
//!
//! ## Module Structure
//!
//! ```text
//! campaign-sync/
//! ├── domain/          # Campaign, Donation, store, events, invariants, errors
//! ├── ports/           # Inbound API trait + outbound ledger trait
//! ├── adapters/        # In-memory authoritative ledger double
//! ├── application/     # CampaignClient, donation saga, synchronizer
//! └── config.rs        # ClientConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{Fault, InMemoryLedger, LedgerHandle, DEFAULT_FEED_CAPACITY};
pub use application::{CampaignClient, Clock, DonationRequest, EventSynchronizer, SyncHandle};
pub use config::ClientConfig;
pub use domain::{
    can_donate, can_withdraw, check_creation, check_donation, check_withdrawal, unix_now,
    AccountId, Amount, AppendOutcome, Campaign, CampaignId, CampaignStore, ClientError, Donation,
    EventEnvelope, EventKey, EventKind, InvariantViolation, LedgerEvent, LedgerOp,
    PendingDonation, PlatformStats, Receipt, ResyncReport, SubmissionId, SyncState, Timestamp,
    MIN_CAMPAIGN_DURATION_SECS,
};
pub use ports::{CampaignApi, EventFeed, FeedItem, LedgerConnection};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
