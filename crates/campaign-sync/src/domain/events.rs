//! # Ledger Events
//!
//! The closed set of events the ledger emits, decoded at the boundary and
//! never passed around as loosely-typed records.

use serde::{Deserialize, Serialize};

use super::entities::{AccountId, Amount, CampaignId, Timestamp};

/// Events emitted by the ledger, in per-campaign emission order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A campaign was opened.
    CampaignCreated {
        /// Ledger-assigned campaign id.
        id: CampaignId,
        /// Creating account.
        organizer: AccountId,
        /// Display name.
        name: String,
        /// Funding goal.
        goal: Amount,
        /// Absolute expiry timestamp.
        deadline: Timestamp,
    },
    /// A donation was accepted and recorded.
    DonationReceived {
        /// Funded campaign.
        campaign_id: CampaignId,
        /// Donor account.
        donor: AccountId,
        /// Donor display name.
        donor_name: String,
        /// Free-text note.
        note: String,
        /// Donated amount.
        amount: Amount,
        /// Index of this donation in the campaign's append order.
        position: u64,
    },
    /// The campaign's funds were paid out; the campaign is closed forever.
    FundsWithdrawn {
        /// The closed campaign.
        campaign_id: CampaignId,
    },
}

impl LedgerEvent {
    /// Discriminant of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CampaignCreated { .. } => EventKind::CampaignCreated,
            Self::DonationReceived { .. } => EventKind::DonationReceived,
            Self::FundsWithdrawn { .. } => EventKind::FundsWithdrawn,
        }
    }

    /// The campaign this event concerns.
    #[must_use]
    pub fn campaign_id(&self) -> CampaignId {
        match self {
            Self::CampaignCreated { id, .. } => *id,
            Self::DonationReceived { campaign_id, .. } | Self::FundsWithdrawn { campaign_id } => {
                *campaign_id
            }
        }
    }
}

/// Event discriminant used in deduplication keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Campaign creation.
    CampaignCreated,
    /// Donation accepted.
    DonationReceived,
    /// Funds withdrawn, campaign closed.
    FundsWithdrawn,
}

/// An event plus its ledger-assigned emission sequence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Global emission sequence assigned by the ledger.
    pub sequence: u64,
    /// The event payload.
    pub event: LedgerEvent,
}

impl EventEnvelope {
    /// Wrap an event with its sequence.
    pub fn new(sequence: u64, event: LedgerEvent) -> Self {
        Self { sequence, event }
    }

    /// Key identifying this delivery for at-least-once deduplication.
    #[must_use]
    pub fn dedup_key(&self) -> EventKey {
        let (donor, amount) = match &self.event {
            LedgerEvent::DonationReceived { donor, amount, .. } => {
                (Some(donor.clone()), Some(*amount))
            }
            _ => (None, None),
        };
        EventKey {
            kind: self.event.kind(),
            campaign_id: self.event.campaign_id(),
            donor,
            amount,
            sequence: self.sequence,
        }
    }
}

/// Deduplication key for feed deliveries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventKey {
    /// Event discriminant.
    pub kind: EventKind,
    /// Campaign concerned.
    pub campaign_id: CampaignId,
    /// Donor, for donation events.
    pub donor: Option<AccountId>,
    /// Amount, for donation events.
    pub amount: Option<Amount>,
    /// Ledger emission sequence.
    pub sequence: u64,
}
