//! # Event Synchronizer
//!
//! Owns the ledger subscription and is the only writer to the campaign
//! store. Runs a `Disconnected -> Connecting -> Live` loop: every
//! (re)connect subscribes first, then fully resynchronizes from reads, then
//! applies live events in arrival order. Events missed while disconnected
//! are unrecoverable from the feed alone, which is why the resync comes
//! before live application and why a feed gap forces another resync.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::domain::{
    AppendOutcome, Amount, Campaign, CampaignId, CampaignStore, ClientError, Donation,
    EventEnvelope, EventKey, LedgerEvent, PendingDonation, ResyncReport, SyncState,
};
use crate::ports::{FeedItem, LedgerConnection};

/// Retry a ledger read with exponential backoff.
///
/// Only transport failures are retried; `NotFound` and rejections pass
/// through immediately. Exhaustion surfaces as `TransportTimeout`.
async fn read_with_retry<T, F, Fut>(
    attempts: u32,
    base_ms: u64,
    mut read: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let attempts = attempts.max(1);
    let mut delay = base_ms;
    for attempt in 1..=attempts {
        match read().await {
            Ok(value) => return Ok(value),
            Err(ClientError::Transport(reason)) => {
                debug!(attempt, %reason, "ledger read failed, backing off");
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    delay = delay.saturating_mul(2);
                }
            }
            Err(other) => return Err(other),
        }
    }
    Err(ClientError::TransportTimeout { attempts })
}

fn next_backoff(current: u64, max: u64) -> u64 {
    current.saturating_mul(2).min(max)
}

/// Sleep for `delay_ms` unless a stop arrives first. Returns false when the
/// loop should exit.
async fn sleep_or_stop(stop: &mut watch::Receiver<bool>, delay_ms: u64) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => true,
        changed = stop.changed() => !(changed.is_err() || *stop.borrow()),
    }
}

/// Applies the ledger's event stream to the local mirror.
pub struct EventSynchronizer<L: LedgerConnection> {
    config: ClientConfig,
    ledger: Arc<L>,
    store: Arc<RwLock<CampaignStore>>,
    pending: Arc<RwLock<Vec<PendingDonation>>>,
    seen: HashSet<EventKey>,
    state: watch::Sender<SyncState>,
}

impl<L: LedgerConnection> EventSynchronizer<L> {
    /// Wire a synchronizer onto shared client state.
    pub fn new(
        config: ClientConfig,
        ledger: Arc<L>,
        store: Arc<RwLock<CampaignStore>>,
        pending: Arc<RwLock<Vec<PendingDonation>>>,
        state: watch::Sender<SyncState>,
    ) -> Self {
        Self {
            config,
            ledger,
            store,
            pending,
            seen: HashSet::new(),
            state,
        }
    }

    /// Run until stopped. Owns the subscription for its whole life.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        let mut backoff = self.config.reconnect_base_ms;
        'outer: loop {
            if *stop.borrow() {
                break;
            }
            let _ = self.state.send(SyncState::Connecting);
            // Subscribe before the snapshot reads so no event can fall
            // between the resync and live application; overlap is handled
            // by dedup and position checks.
            let mut feed = self.ledger.subscribe();
            match self.resync().await {
                Ok(report) => {
                    info!(
                        campaigns = report.campaigns_seen,
                        donations = report.donations_seen,
                        "resync complete"
                    );
                    backoff = self.config.reconnect_base_ms;
                }
                Err(err) => {
                    warn!(error = %err, "resync failed");
                    let _ = self.state.send(SyncState::Disconnected);
                    if !sleep_or_stop(&mut stop, backoff).await {
                        break 'outer;
                    }
                    backoff = next_backoff(backoff, self.config.reconnect_max_ms);
                    continue;
                }
            }
            let _ = self.state.send(SyncState::Live);
            loop {
                tokio::select! {
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break 'outer;
                        }
                    }
                    item = feed.next() => match item {
                        FeedItem::Event(envelope) => {
                            if self.apply(envelope) {
                                warn!("mirror out of step with feed, resyncing");
                                continue 'outer;
                            }
                        }
                        FeedItem::Gap { missed } => {
                            warn!(missed, "feed gap, resyncing");
                            continue 'outer;
                        }
                        FeedItem::Closed => {
                            warn!("feed closed");
                            break;
                        }
                    }
                }
            }
            let _ = self.state.send(SyncState::Disconnected);
            if !sleep_or_stop(&mut stop, backoff).await {
                break;
            }
            backoff = next_backoff(backoff, self.config.reconnect_max_ms);
        }
        let _ = self.state.send(SyncState::Disconnected);
        debug!("synchronizer stopped");
    }

    /// Full resynchronization: discover ids by count, merge every campaign
    /// snapshot and donation list, then settle pending entries.
    pub async fn resync(&self) -> Result<ResyncReport, ClientError> {
        let attempts = self.config.read_retry_attempts;
        let base_ms = self.config.retry_base_ms;
        let ledger = Arc::clone(&self.ledger);

        let count =
            read_with_retry(attempts, base_ms, || ledger.read_campaign_count()).await?;
        let mut report = ResyncReport::default();
        for id in 1..=count {
            let campaign =
                match read_with_retry(attempts, base_ms, || ledger.read_campaign(id)).await {
                    Ok(campaign) => campaign,
                    Err(ClientError::NotFound(_)) => continue,
                    Err(err) => return Err(err),
                };
            let donations =
                match read_with_retry(attempts, base_ms, || ledger.read_donations(id)).await {
                    Ok(donations) => donations,
                    Err(ClientError::NotFound(_)) => Vec::new(),
                    Err(err) => return Err(err),
                };
            let Ok(mut store) = self.store.write() else {
                return Err(ClientError::Transport("store lock poisoned".into()));
            };
            store.upsert(campaign.clone());
            report.campaigns_seen += 1;
            for (position, donation) in donations.into_iter().enumerate() {
                let _ = store.append_donation(donation, position as u64);
                report.donations_seen += 1;
            }
            // The snapshot and the donation list are two separate reads; a
            // donate can commit between them, leaving the snapshot total
            // behind the list. Reconcile the total to the donations that
            // are actually present (the upsert merge keeps the max).
            let donated: Amount = store.donations_for(id).iter().map(|d| d.amount).sum();
            let mut reconciled = campaign;
            reconciled.total_donations = donated;
            store.upsert(reconciled);
        }
        self.sweep_pending();
        Ok(report)
    }

    /// Apply one feed delivery. Returns true when the mirror cannot follow
    /// the feed and needs a resync.
    fn apply(&mut self, envelope: EventEnvelope) -> bool {
        let key = envelope.dedup_key();
        if self.seen.contains(&key) {
            debug!(sequence = envelope.sequence, "duplicate delivery dropped");
            return false;
        }
        let needs_resync = self.apply_event(envelope);
        // A delivery the mirror could not follow is not consumed; a later
        // redelivery (or the resync) must still be able to land it.
        if !needs_resync {
            self.seen.insert(key);
        }
        needs_resync
    }

    fn apply_event(&mut self, envelope: EventEnvelope) -> bool {
        let Ok(mut store) = self.store.write() else {
            warn!("store lock poisoned, event dropped");
            return false;
        };
        match envelope.event {
            LedgerEvent::CampaignCreated {
                id,
                organizer,
                name,
                goal,
                deadline,
            } => {
                if store.get(id).is_some() {
                    debug!(id, "creation replay for known campaign");
                } else {
                    info!(id, %organizer, "campaign mirrored");
                    store.upsert(Campaign::new(id, organizer, name, goal, deadline));
                }
                false
            }
            LedgerEvent::DonationReceived {
                campaign_id,
                donor,
                donor_name,
                note,
                amount,
                position,
            } => {
                // Re-validate before applying; the feed is not trusted
                // blindly. A donation for an unknown campaign means the
                // creation was missed.
                match store.get(campaign_id) {
                    None => {
                        warn!(campaign_id, "donation for unknown campaign");
                        return true;
                    }
                    Some(campaign) if campaign.is_closed => {
                        warn!(campaign_id, "donation for closed campaign dropped");
                        return false;
                    }
                    Some(_) => {}
                }
                let donation = Donation {
                    campaign_id,
                    donor: donor.clone(),
                    donor_name,
                    note,
                    amount,
                };
                match store.append_donation(donation, position) {
                    AppendOutcome::Appended => {
                        // Additive on purpose: never recomputed from a read
                        // that may race a concurrent event.
                        store.add_to_total(campaign_id, amount);
                        drop(store);
                        self.resolve_pending(campaign_id, &donor, amount);
                        debug!(campaign_id, amount, position, "donation applied");
                        false
                    }
                    AppendOutcome::Duplicate => {
                        debug!(campaign_id, position, "donation replay dropped");
                        false
                    }
                    AppendOutcome::Gap => {
                        warn!(campaign_id, position, "donation ahead of mirror");
                        true
                    }
                }
            }
            LedgerEvent::FundsWithdrawn { campaign_id } => {
                if store.mark_closed(campaign_id) {
                    info!(campaign_id, "campaign closed");
                    false
                } else {
                    warn!(campaign_id, "withdrawal for unknown campaign");
                    true
                }
            }
        }
    }

    /// Remove the pending entry matched by a confirmed donation.
    fn resolve_pending(&self, campaign_id: CampaignId, donor: &str, amount: Amount) {
        let Ok(mut pending) = self.pending.write() else {
            return;
        };
        if let Some(index) = pending
            .iter()
            .position(|p| p.campaign_id == campaign_id && p.donor == donor && p.amount == amount)
        {
            let entry = pending.remove(index);
            debug!(submission = %entry.submission, "pending donation confirmed");
        }
    }

    /// Drop pending entries whose donation the resync brought into the
    /// store. This is how an unknown-outcome submission is settled.
    fn sweep_pending(&self) {
        let Ok(store) = self.store.read() else {
            return;
        };
        let Ok(mut pending) = self.pending.write() else {
            return;
        };
        pending.retain(|entry| {
            let settled = store
                .donations_for(entry.campaign_id)
                .iter()
                .any(|d| d.donor == entry.donor && d.amount == entry.amount);
            if settled {
                debug!(submission = %entry.submission, "pending donation settled by resync");
            }
            !settled
        });
    }
}

/// Owned handle over a running synchronizer task.
///
/// Shutting down guarantees no further events are applied after it returns.
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub(crate) fn new(stop: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }

    /// Whether the synchronizer task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the synchronizer and wait for it to wind down.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}
