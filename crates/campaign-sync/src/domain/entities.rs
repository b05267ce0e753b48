//! # Domain Entities
//!
//! Campaigns, donations, and the in-memory store that mirrors the ledger.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

/// Ledger-assigned campaign identifier (positive, starts at 1).
pub type CampaignId = u64;

/// Ledger account address string.
pub type AccountId = String;

/// Fixed-point monetary amount in token base units (6 decimals).
pub type Amount = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Current wall-clock time as a unix timestamp.
pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A donation-funded campaign as recorded on the ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    /// Ledger-assigned identifier, immutable.
    pub id: CampaignId,
    /// Account that created the campaign and may withdraw, immutable.
    pub organizer: AccountId,
    /// Display name, immutable.
    pub name: String,
    /// Funding goal, immutable, positive.
    pub goal: Amount,
    /// Absolute expiry timestamp, immutable.
    pub deadline: Timestamp,
    /// Sum of all accepted donations; never decreases while open.
    pub total_donations: Amount,
    /// Set by the single successful withdrawal; never unset.
    pub is_closed: bool,
}

impl Campaign {
    /// Create a freshly opened campaign with no donations.
    pub fn new(
        id: CampaignId,
        organizer: AccountId,
        name: String,
        goal: Amount,
        deadline: Timestamp,
    ) -> Self {
        Self {
            id,
            organizer,
            name,
            goal,
            deadline,
            total_donations: 0,
            is_closed: false,
        }
    }

    /// Whether the deadline has passed at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.deadline
    }

    /// Whether donations have reached the goal.
    pub fn goal_reached(&self) -> bool {
        self.total_donations >= self.goal
    }

    /// Add an accepted donation amount to the running total.
    pub fn record_donation(&mut self, amount: Amount) {
        self.total_donations = self.total_donations.saturating_add(amount);
    }

    /// Mark the campaign withdrawn. Terminal and idempotent.
    pub fn close(&mut self) {
        self.is_closed = true;
    }
}

/// A single accepted donation, immutable once recorded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Donation {
    /// Campaign this donation funds.
    pub campaign_id: CampaignId,
    /// Donor account address.
    pub donor: AccountId,
    /// Display name chosen by the donor (may be empty).
    pub donor_name: String,
    /// Free-text note (may be empty).
    pub note: String,
    /// Donated amount, positive.
    pub amount: Amount,
}

/// Aggregates over everything currently mirrored.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformStats {
    /// Total campaigns known.
    pub campaign_count: u64,
    /// Campaigns still open and unexpired.
    pub active_count: u64,
    /// Total donations across all campaigns.
    pub donation_count: u64,
    /// Sum of `total_donations` across all campaigns.
    pub total_raised: Amount,
}

/// Outcome of an idempotent donation append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The position was new; the donation is now in the store.
    Appended,
    /// A donation already occupies this position; nothing changed.
    Duplicate,
    /// The position skips ahead of the local list; the mirror is missing
    /// earlier donations and needs a resync.
    Gap,
}

/// In-memory mirror of ledger state, keyed by campaign id.
///
/// All mutations are idempotent. The store itself does no locking; every
/// mutation path must funnel through the single synchronizer consumer.
#[derive(Clone, Debug, Default)]
pub struct CampaignStore {
    campaigns: BTreeMap<CampaignId, Campaign>,
    donations: HashMap<CampaignId, Vec<Donation>>,
}

impl CampaignStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a campaign by id.
    pub fn get(&self, id: CampaignId) -> Option<&Campaign> {
        self.campaigns.get(&id)
    }

    /// All campaigns ordered by id.
    pub fn campaigns(&self) -> Vec<Campaign> {
        self.campaigns.values().cloned().collect()
    }

    /// Number of campaigns known.
    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    /// Whether the store holds no campaigns.
    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// Insert or refresh a campaign snapshot.
    ///
    /// The merge is monotonic so an out-of-order stale snapshot cannot
    /// regress the mirror: `total_donations` never decreases and
    /// `is_closed` never flips back to false. Applying the same snapshot
    /// twice is a no-op.
    pub fn upsert(&mut self, incoming: Campaign) {
        use std::collections::btree_map::Entry;
        match self.campaigns.entry(incoming.id) {
            Entry::Occupied(mut entry) => {
                let current = entry.get_mut();
                current.total_donations = current.total_donations.max(incoming.total_donations);
                current.is_closed = current.is_closed || incoming.is_closed;
            }
            Entry::Vacant(entry) => {
                entry.insert(incoming);
            }
        }
    }

    /// Append a donation at its ledger-assigned position.
    ///
    /// The position is the donation's index in the campaign's append order,
    /// which makes replays (same position seen again) detectable regardless
    /// of whether the copy arrived over the live feed or a resync.
    pub fn append_donation(&mut self, donation: Donation, position: u64) -> AppendOutcome {
        let list = self.donations.entry(donation.campaign_id).or_default();
        let position = position as usize;
        match position.cmp(&list.len()) {
            Ordering::Less => AppendOutcome::Duplicate,
            Ordering::Equal => {
                list.push(donation);
                AppendOutcome::Appended
            }
            Ordering::Greater => AppendOutcome::Gap,
        }
    }

    /// Add an accepted donation amount to a campaign's running total.
    ///
    /// Additive on purpose: totals are never recomputed from a possibly
    /// stale read. Returns false when the campaign is unknown.
    pub fn add_to_total(&mut self, id: CampaignId, amount: Amount) -> bool {
        match self.campaigns.get_mut(&id) {
            Some(campaign) => {
                campaign.record_donation(amount);
                true
            }
            None => false,
        }
    }

    /// Mark a campaign closed. Terminal, idempotent. Returns false when the
    /// campaign is unknown.
    pub fn mark_closed(&mut self, id: CampaignId) -> bool {
        match self.campaigns.get_mut(&id) {
            Some(campaign) => {
                campaign.close();
                true
            }
            None => false,
        }
    }

    /// Donations for one campaign in append order.
    pub fn donations_for(&self, id: CampaignId) -> &[Donation] {
        self.donations.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of donations recorded for one campaign.
    pub fn donation_count(&self, id: CampaignId) -> u64 {
        self.donations.get(&id).map(|d| d.len() as u64).unwrap_or(0)
    }

    /// All donations by one donor across campaigns, in campaign-id order.
    pub fn donations_by(&self, donor: &str) -> Vec<Donation> {
        let mut result = Vec::new();
        for id in self.campaigns.keys() {
            if let Some(list) = self.donations.get(id) {
                result.extend(list.iter().filter(|d| d.donor == donor).cloned());
            }
        }
        result
    }

    /// Aggregate platform statistics at `now`.
    pub fn stats(&self, now: Timestamp) -> PlatformStats {
        PlatformStats {
            campaign_count: self.campaigns.len() as u64,
            active_count: self
                .campaigns
                .values()
                .filter(|c| !c.is_closed && !c.is_expired(now))
                .count() as u64,
            donation_count: self.donations.values().map(|d| d.len() as u64).sum(),
            total_raised: self.campaigns.values().map(|c| c.total_donations).sum(),
        }
    }
}
