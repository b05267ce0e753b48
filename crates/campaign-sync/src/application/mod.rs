//! # Application Module
//!
//! Services orchestrating the domain and the ledger port: the client API
//! implementation, the donation saga, and the event synchronizer.

pub mod client;
pub mod orchestrator;
pub mod synchronizer;

pub use client::{CampaignClient, Clock};
pub use orchestrator::{execute_donation, DonationRequest};
pub use synchronizer::{EventSynchronizer, SyncHandle};
