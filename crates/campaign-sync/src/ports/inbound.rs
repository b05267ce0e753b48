//! # Inbound Ports
//!
//! What the client offers the presentation layer: intents that are
//! validated and submitted to the ledger, plus the read surface over the
//! local mirror.

use async_trait::async_trait;

use crate::domain::{
    Amount, Campaign, CampaignId, ClientError, Donation, PendingDonation, PlatformStats,
    SubmissionId, SyncState,
};

/// Campaign client API - inbound port.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    /// Create a campaign and return its ledger-assigned id.
    ///
    /// The mirror is updated by the resulting event, not by this call.
    async fn create_campaign(
        &self,
        name: &str,
        goal: Amount,
        duration_secs: u64,
    ) -> Result<CampaignId, ClientError>;

    /// Donate to a campaign: allowance grant followed by transfer.
    ///
    /// On success the donation appears in `pending` until the feed confirms
    /// it. `UnknownOutcome` leaves a pending entry for the next resync to
    /// settle.
    async fn donate(
        &self,
        campaign_id: CampaignId,
        amount: Amount,
        donor_name: &str,
        note: &str,
    ) -> Result<SubmissionId, ClientError>;

    /// Withdraw a campaign's funds. Only the organizer may call this, and
    /// only once; the campaign closes permanently.
    async fn withdraw(&self, campaign_id: CampaignId) -> Result<(), ClientError>;

    /// A campaign from the local mirror.
    fn campaign(&self, id: CampaignId) -> Option<Campaign>;

    /// All mirrored campaigns ordered by id.
    fn campaigns(&self) -> Vec<Campaign>;

    /// Donations for a campaign in append order.
    fn donations(&self, id: CampaignId) -> Vec<Donation>;

    /// Donation history for one donor across all campaigns.
    fn donations_by(&self, donor: &str) -> Vec<Donation>;

    /// Aggregate statistics over the mirror.
    fn stats(&self) -> PlatformStats;

    /// Donations submitted by this client not yet confirmed by the feed.
    fn pending(&self) -> Vec<PendingDonation>;

    /// Current synchronizer connection state.
    fn sync_state(&self) -> SyncState;
}
