//! # Campaign Client
//!
//! Implements the inbound API over a ledger connection: validates intents
//! locally, submits them, and serves reads from the mirror the synchronizer
//! maintains. Writes never touch the mirror directly; confirmed state
//! always arrives through the event feed.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::application::orchestrator::{self, DonationRequest};
use crate::application::synchronizer::{EventSynchronizer, SyncHandle};
use crate::config::ClientConfig;
use crate::domain::{
    check_creation, check_donation, check_withdrawal, unix_now, Amount, Campaign, CampaignId,
    CampaignStore, ClientError, Donation, InvariantViolation, LedgerOp, PendingDonation,
    PlatformStats, Receipt, SubmissionId, SyncState,
};
use crate::ports::{CampaignApi, LedgerConnection};

/// Time source for local invariant checks.
///
/// Defaults to wall-clock time; tests inject the ledger double's clock so
/// deadline arithmetic agrees on both sides.
pub type Clock = Arc<dyn Fn() -> crate::domain::Timestamp + Send + Sync>;

/// Client-side view of the campaign ledger.
pub struct CampaignClient<L: LedgerConnection> {
    ledger: Arc<L>,
    store: Arc<RwLock<CampaignStore>>,
    pending: Arc<RwLock<Vec<PendingDonation>>>,
    state: watch::Receiver<SyncState>,
    clock: Clock,
}

impl<L: LedgerConnection + 'static> CampaignClient<L> {
    /// Start a client and its synchronizer. The returned handle owns the
    /// subscription; shutting it down stops all mirror updates.
    pub fn start(config: ClientConfig, ledger: Arc<L>) -> (Self, SyncHandle) {
        Self::start_with_clock(config, ledger, Arc::new(unix_now))
    }

    /// Start with an explicit time source for guard checks.
    pub fn start_with_clock(config: ClientConfig, ledger: Arc<L>, clock: Clock) -> (Self, SyncHandle) {
        let store = Arc::new(RwLock::new(CampaignStore::new()));
        let pending = Arc::new(RwLock::new(Vec::new()));
        let (state_tx, state_rx) = watch::channel(SyncState::Disconnected);
        let (stop_tx, stop_rx) = watch::channel(false);

        let synchronizer = EventSynchronizer::new(
            config,
            Arc::clone(&ledger),
            Arc::clone(&store),
            Arc::clone(&pending),
            state_tx,
        );
        let task = tokio::spawn(synchronizer.run(stop_rx));

        (
            Self {
                ledger,
                store,
                pending,
                state: state_rx,
                clock,
            },
            SyncHandle::new(stop_tx, task),
        )
    }

    /// A watch over the synchronizer's connection state.
    pub fn sync_state_watch(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    fn now(&self) -> crate::domain::Timestamp {
        (self.clock)()
    }

    fn track_pending(
        &self,
        submission: SubmissionId,
        campaign_id: CampaignId,
        amount: Amount,
        confirmed: bool,
    ) {
        if let Ok(mut pending) = self.pending.write() {
            pending.push(PendingDonation::new(
                submission,
                campaign_id,
                self.ledger.caller().clone(),
                amount,
                confirmed,
            ));
        }
    }
}

#[async_trait]
impl<L: LedgerConnection + 'static> CampaignApi for CampaignClient<L> {
    async fn create_campaign(
        &self,
        name: &str,
        goal: Amount,
        duration_secs: u64,
    ) -> Result<CampaignId, ClientError> {
        check_creation(name, goal, duration_secs)?;
        match self
            .ledger
            .submit(LedgerOp::CreateCampaign {
                name: name.to_string(),
                goal,
                duration_secs,
            })
            .await?
        {
            Receipt::CampaignCreated { id, .. } => {
                info!(id, "campaign creation confirmed");
                Ok(id)
            }
            other => Err(ClientError::Rejected(format!(
                "unexpected receipt for creation: {other:?}"
            ))),
        }
    }

    async fn donate(
        &self,
        campaign_id: CampaignId,
        amount: Amount,
        donor_name: &str,
        note: &str,
    ) -> Result<SubmissionId, ClientError> {
        if amount == 0 {
            return Err(InvariantViolation::ZeroAmount.into());
        }
        // Pre-check against the mirror when the campaign is known. This is
        // a fast local no; the ledger re-checks either way.
        {
            let Ok(store) = self.store.read() else {
                return Err(ClientError::Transport("store lock poisoned".into()));
            };
            if let Some(campaign) = store.get(campaign_id) {
                check_donation(campaign, amount, self.now())?;
            }
        }

        let submission = Uuid::new_v4();
        let request = DonationRequest {
            campaign_id,
            amount,
            donor_name: donor_name.to_string(),
            note: note.to_string(),
        };
        match orchestrator::execute_donation(self.ledger.as_ref(), submission, request).await {
            Ok(_) => {
                self.track_pending(submission, campaign_id, amount, true);
                Ok(submission)
            }
            Err(err @ ClientError::UnknownOutcome { .. }) => {
                // Keep the overlay entry; the next resync settles its fate.
                self.track_pending(submission, campaign_id, amount, false);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn withdraw(&self, campaign_id: CampaignId) -> Result<(), ClientError> {
        {
            let Ok(store) = self.store.read() else {
                return Err(ClientError::Transport("store lock poisoned".into()));
            };
            if let Some(campaign) = store.get(campaign_id) {
                check_withdrawal(campaign, self.ledger.caller(), self.now())?;
            }
        }
        match self.ledger.submit(LedgerOp::Withdraw { campaign_id }).await {
            Ok(Receipt::FundsWithdrawn { .. }) => {
                info!(campaign_id, "withdrawal confirmed");
                Ok(())
            }
            Ok(other) => Err(ClientError::WithdrawFailed(format!(
                "unexpected receipt: {other:?}"
            ))),
            Err(ClientError::Rejected(reason)) => Err(ClientError::WithdrawFailed(reason)),
            Err(err) => Err(err),
        }
    }

    fn campaign(&self, id: CampaignId) -> Option<Campaign> {
        self.store.read().ok().and_then(|s| s.get(id).cloned())
    }

    fn campaigns(&self) -> Vec<Campaign> {
        self.store.read().map(|s| s.campaigns()).unwrap_or_default()
    }

    fn donations(&self, id: CampaignId) -> Vec<Donation> {
        self.store
            .read()
            .map(|s| s.donations_for(id).to_vec())
            .unwrap_or_default()
    }

    fn donations_by(&self, donor: &str) -> Vec<Donation> {
        self.store
            .read()
            .map(|s| s.donations_by(donor))
            .unwrap_or_default()
    }

    fn stats(&self) -> PlatformStats {
        self.store
            .read()
            .map(|s| s.stats(self.now()))
            .unwrap_or_default()
    }

    fn pending(&self) -> Vec<PendingDonation> {
        self.pending.read().map(|p| p.clone()).unwrap_or_default()
    }

    fn sync_state(&self) -> SyncState {
        *self.state.borrow()
    }
}
