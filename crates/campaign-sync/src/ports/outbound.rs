//! # Outbound Ports
//!
//! The ledger client contract: reads, operation submission, and the event
//! subscription. The remote ledger is a black box behind this trait; it is
//! the final arbiter of every invariant, and nothing here assumes control
//! over its concurrency.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{
    AccountId, Campaign, CampaignId, ClientError, Donation, EventEnvelope, LedgerOp, Receipt,
};

/// Connection to the remote ledger - outbound port.
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Fetch a campaign's current state by id.
    ///
    /// # Errors
    /// - `NotFound` when the ledger has no such id
    /// - `Transport` on transport-level failure
    async fn read_campaign(&self, id: CampaignId) -> Result<Campaign, ClientError>;

    /// Number of campaigns ever created. Ids are dense from 1, so the count
    /// also enumerates them.
    async fn read_campaign_count(&self) -> Result<u64, ClientError>;

    /// Donations for a campaign in append order.
    ///
    /// # Errors
    /// - `NotFound` when the campaign is absent
    async fn read_donations(&self, id: CampaignId) -> Result<Vec<Donation>, ClientError>;

    /// Submit a state-changing operation.
    ///
    /// A `Receipt` is returned only when the ledger durably applied the
    /// operation. Rejections carry the remote reason verbatim; transport
    /// failures are surfaced, never swallowed. A dispatched submit cannot
    /// be cancelled; a lost confirmation means the outcome is unknown.
    async fn submit(&self, op: LedgerOp) -> Result<Receipt, ClientError>;

    /// Subscribe to the ledger's event feed.
    ///
    /// Delivery is at-least-once, in true emission order per campaign.
    /// Dropping the returned feed is the cancellation handle: no further
    /// events are observed after the drop returns.
    fn subscribe(&self) -> EventFeed;

    /// The account identity this connection submits as.
    fn caller(&self) -> &AccountId;
}

/// One item pulled off the event feed.
#[derive(Clone, Debug)]
pub enum FeedItem {
    /// A ledger event in emission order.
    Event(EventEnvelope),
    /// The feed fell behind and `missed` events are unrecoverable from the
    /// feed alone; only a resync can close the gap.
    Gap {
        /// Number of events dropped.
        missed: u64,
    },
    /// The transport ended; resubscribe to continue.
    Closed,
}

/// Live event subscription handle.
///
/// Wraps a broadcast receiver; dropping it releases the subscription.
pub struct EventFeed {
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl EventFeed {
    /// Wrap a broadcast receiver as a feed.
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<EventEnvelope>) -> Self {
        Self { receiver }
    }

    /// Wait for the next feed item.
    ///
    /// Lagging behind the broadcast buffer is reported as a `Gap` rather
    /// than skipped, because missed events break the mirror until a resync.
    pub async fn next(&mut self) -> FeedItem {
        match self.receiver.recv().await {
            Ok(envelope) => FeedItem::Event(envelope),
            Err(broadcast::error::RecvError::Lagged(missed)) => FeedItem::Gap { missed },
            Err(broadcast::error::RecvError::Closed) => FeedItem::Closed,
        }
    }
}
