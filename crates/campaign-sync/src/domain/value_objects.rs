//! # Domain Value Objects
//!
//! Immutable value types: ledger operations, receipts, the pending overlay
//! record, and synchronizer state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{AccountId, Amount, CampaignId};

/// Client-side identifier for a submitted operation.
pub type SubmissionId = Uuid;

/// State-changing operations accepted by the remote ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerOp {
    /// Open a new campaign. The ledger assigns the id and computes the
    /// deadline from its own clock.
    CreateCampaign {
        /// Display name, non-empty.
        name: String,
        /// Funding goal, positive.
        goal: Amount,
        /// Campaign duration in seconds, at least the ledger minimum.
        duration_secs: u64,
    },
    /// Grant the ledger a spending ceiling over the caller's funds.
    /// The ceiling is consumed by subsequent donations.
    ApproveAllowance {
        /// New allowance ceiling.
        amount: Amount,
    },
    /// Transfer funds and record a donation against a campaign.
    Donate {
        /// Target campaign.
        campaign_id: CampaignId,
        /// Donor display name (may be empty).
        donor_name: String,
        /// Free-text note (may be empty).
        note: String,
        /// Donated amount, positive.
        amount: Amount,
    },
    /// Pay out a campaign's funds to the organizer and close it.
    Withdraw {
        /// Campaign to withdraw from.
        campaign_id: CampaignId,
    },
}

/// Proof that the ledger durably accepted and applied an operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Receipt {
    /// A campaign was created under the returned id.
    CampaignCreated {
        /// Ledger-assigned campaign id.
        id: CampaignId,
        /// Sequence of the emitted creation event.
        sequence: u64,
    },
    /// The caller's allowance ceiling was set.
    AllowanceGranted {
        /// The granted ceiling.
        amount: Amount,
    },
    /// A donation was transferred and recorded.
    DonationApplied {
        /// Campaign the donation funds.
        campaign_id: CampaignId,
        /// Sequence of the emitted donation event.
        sequence: u64,
    },
    /// Funds were paid out and the campaign closed.
    FundsWithdrawn {
        /// The closed campaign.
        campaign_id: CampaignId,
        /// Sequence of the emitted withdrawal event.
        sequence: u64,
    },
}

/// A donation this client submitted that the feed has not yet confirmed.
///
/// Shown to callers as an overlay instead of optimistically mutating the
/// store; the synchronizer removes it once the matching event (or a resync)
/// lands.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingDonation {
    /// Submission id handed back to the caller.
    pub submission: SubmissionId,
    /// Target campaign.
    pub campaign_id: CampaignId,
    /// Donor account (this connection's caller identity).
    pub donor: AccountId,
    /// Donated amount.
    pub amount: Amount,
    /// True when a receipt confirmed the ledger applied the donation;
    /// false when the outcome is unknown until resync.
    pub confirmed: bool,
}

impl PendingDonation {
    /// Record a donation submission awaiting feed confirmation.
    pub fn new(
        submission: SubmissionId,
        campaign_id: CampaignId,
        donor: AccountId,
        amount: Amount,
        confirmed: bool,
    ) -> Self {
        Self {
            submission,
            campaign_id,
            donor,
            amount,
            confirmed,
        }
    }
}

/// Connection state of the event synchronizer.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncState {
    /// No live subscription; the mirror may be stale.
    #[default]
    Disconnected,
    /// Subscribing and resynchronizing before live application.
    Connecting,
    /// Applying live events in emission order.
    Live,
}

/// Result of one full resynchronization pass.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResyncReport {
    /// Campaigns fetched and merged.
    pub campaigns_seen: u64,
    /// Donations fetched and merged (including already-known ones).
    pub donations_seen: u64,
}
