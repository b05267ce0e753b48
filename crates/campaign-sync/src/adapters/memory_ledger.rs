//! # In-Memory Ledger
//!
//! In-process stand-in for the remote ledger: serialized writes, dense id
//! and sequence assignment, allowance accounting, and an event feed with
//! history replay. It enforces the same invariants the real ledger would,
//! through the same guard functions, so client-side checks can never drift
//! from the authoritative rules.
//!
//! Test controls: a manual clock (`advance`/`set_now`), scripted per-handle
//! faults, `replay` for at-least-once delivery, and `sever_feeds` for
//! transport failure.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::{
    check_creation, check_donation, check_withdrawal, unix_now, AccountId, Amount, Campaign,
    CampaignId, ClientError, Donation, EventEnvelope, LedgerEvent, LedgerOp, Receipt, Timestamp,
};
use crate::ports::{EventFeed, LedgerConnection};

/// Events buffered per subscriber before the feed reports a gap.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// One step of a scripted failure sequence. Each call on a handle consumes
/// the next queued entry; an empty queue means the call goes through.
#[derive(Clone, Debug)]
pub enum Fault {
    /// Consume the slot without failing; the call proceeds normally.
    Pass,
    /// The ledger rejects the call with this reason.
    Reject(String),
    /// The transport drops the call; the outcome is never confirmed.
    Timeout,
}

#[derive(Debug)]
struct LedgerCore {
    campaigns: BTreeMap<CampaignId, Campaign>,
    donations: HashMap<CampaignId, Vec<Donation>>,
    allowances: HashMap<AccountId, Amount>,
    history: Vec<EventEnvelope>,
    next_id: CampaignId,
    next_sequence: u64,
}

impl LedgerCore {
    fn new() -> Self {
        Self {
            campaigns: BTreeMap::new(),
            donations: HashMap::new(),
            allowances: HashMap::new(),
            history: Vec::new(),
            next_id: 1,
            next_sequence: 1,
        }
    }
}

/// The shared authoritative ledger. Connect per-identity handles with
/// [`InMemoryLedger::connect`].
pub struct InMemoryLedger {
    core: Mutex<LedgerCore>,
    events: RwLock<broadcast::Sender<EventEnvelope>>,
    now: AtomicU64,
    capacity: usize,
}

impl InMemoryLedger {
    /// Create a ledger with the default feed capacity, clock at wall time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Create a ledger with a specific feed capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            core: Mutex::new(LedgerCore::new()),
            events: RwLock::new(sender),
            now: AtomicU64::new(unix_now()),
            capacity,
        }
    }

    /// Connect a handle that submits as `account`.
    pub fn connect(self: &Arc<Self>, account: impl Into<AccountId>) -> LedgerHandle {
        LedgerHandle {
            ledger: Arc::clone(self),
            caller: account.into(),
            submit_faults: Mutex::new(VecDeque::new()),
            read_faults: Mutex::new(VecDeque::new()),
        }
    }

    /// The ledger's current clock.
    pub fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }

    /// Pin the ledger clock to an absolute timestamp.
    pub fn set_now(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advance the ledger clock by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Remaining allowance ceiling for an account.
    pub fn allowance_of(&self, account: &str) -> Amount {
        self.core
            .lock()
            .map(|core| core.allowances.get(account).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total events emitted so far.
    pub fn event_count(&self) -> u64 {
        self.core
            .lock()
            .map(|core| core.history.len() as u64)
            .unwrap_or(0)
    }

    /// Re-broadcast history from `from_sequence` onward, simulating
    /// at-least-once delivery. Returns the number of events resent.
    pub fn replay(&self, from_sequence: u64) -> usize {
        let Ok(core) = self.core.lock() else {
            return 0;
        };
        let Ok(sender) = self.events.read() else {
            return 0;
        };
        let mut sent = 0;
        for envelope in core.history.iter().filter(|e| e.sequence >= from_sequence) {
            if sender.send(envelope.clone()).is_ok() {
                sent += 1;
            }
        }
        sent
    }

    /// Tear down the live feed channel. Existing subscriptions observe
    /// `Closed`; new `subscribe` calls attach to a fresh channel.
    pub fn sever_feeds(&self) {
        if let Ok(mut sender) = self.events.write() {
            *sender = broadcast::channel(self.capacity).0;
            warn!("event feeds severed");
        }
    }

    fn lock_core(&self) -> Result<std::sync::MutexGuard<'_, LedgerCore>, ClientError> {
        self.core
            .lock()
            .map_err(|_| ClientError::Transport("ledger state lock poisoned".into()))
    }

    fn emit(&self, core: &mut LedgerCore, event: LedgerEvent) -> u64 {
        let sequence = core.next_sequence;
        core.next_sequence += 1;
        let envelope = EventEnvelope::new(sequence, event);
        core.history.push(envelope.clone());
        if let Ok(sender) = self.events.read() {
            if sender.send(envelope).is_err() {
                debug!(sequence, "event emitted with no subscribers");
            }
        }
        sequence
    }

    /// Apply one operation under the write lock. The lock serializes
    /// conflicting writers, which is the atomicity the real ledger provides.
    fn apply(&self, caller: &AccountId, op: LedgerOp) -> Result<Receipt, ClientError> {
        let now = self.now();
        let mut core = self.lock_core()?;
        match op {
            LedgerOp::CreateCampaign {
                name,
                goal,
                duration_secs,
            } => {
                check_creation(&name, goal, duration_secs)
                    .map_err(|v| ClientError::Rejected(v.to_string()))?;
                let id = core.next_id;
                core.next_id += 1;
                let deadline = now + duration_secs;
                core.campaigns.insert(
                    id,
                    Campaign::new(id, caller.clone(), name.clone(), goal, deadline),
                );
                let sequence = self.emit(
                    &mut core,
                    LedgerEvent::CampaignCreated {
                        id,
                        organizer: caller.clone(),
                        name,
                        goal,
                        deadline,
                    },
                );
                info!(id, organizer = %caller, "campaign created");
                Ok(Receipt::CampaignCreated { id, sequence })
            }
            LedgerOp::ApproveAllowance { amount } => {
                core.allowances.insert(caller.clone(), amount);
                debug!(account = %caller, amount, "allowance ceiling set");
                Ok(Receipt::AllowanceGranted { amount })
            }
            LedgerOp::Donate {
                campaign_id,
                donor_name,
                note,
                amount,
            } => {
                {
                    let campaign = core
                        .campaigns
                        .get(&campaign_id)
                        .ok_or_else(|| ClientError::Rejected(format!("unknown campaign {campaign_id}")))?;
                    check_donation(campaign, amount, now)
                        .map_err(|v| ClientError::Rejected(v.to_string()))?;
                }
                let remaining = core.allowances.get(caller).copied().unwrap_or(0);
                if remaining < amount {
                    return Err(ClientError::Rejected(format!(
                        "allowance {remaining} below donation amount {amount}"
                    )));
                }
                core.allowances.insert(caller.clone(), remaining - amount);

                let list = core.donations.entry(campaign_id).or_default();
                let position = list.len() as u64;
                list.push(Donation {
                    campaign_id,
                    donor: caller.clone(),
                    donor_name: donor_name.clone(),
                    note: note.clone(),
                    amount,
                });
                if let Some(campaign) = core.campaigns.get_mut(&campaign_id) {
                    campaign.record_donation(amount);
                }
                let sequence = self.emit(
                    &mut core,
                    LedgerEvent::DonationReceived {
                        campaign_id,
                        donor: caller.clone(),
                        donor_name,
                        note,
                        amount,
                        position,
                    },
                );
                debug!(campaign_id, donor = %caller, amount, position, "donation recorded");
                Ok(Receipt::DonationApplied {
                    campaign_id,
                    sequence,
                })
            }
            LedgerOp::Withdraw { campaign_id } => {
                {
                    let campaign = core
                        .campaigns
                        .get(&campaign_id)
                        .ok_or_else(|| ClientError::Rejected(format!("unknown campaign {campaign_id}")))?;
                    check_withdrawal(campaign, caller, now)
                        .map_err(|v| ClientError::Rejected(v.to_string()))?;
                }
                if let Some(campaign) = core.campaigns.get_mut(&campaign_id) {
                    campaign.close();
                }
                let sequence = self.emit(&mut core, LedgerEvent::FundsWithdrawn { campaign_id });
                info!(campaign_id, organizer = %caller, "funds withdrawn, campaign closed");
                Ok(Receipt::FundsWithdrawn {
                    campaign_id,
                    sequence,
                })
            }
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-identity connection to an [`InMemoryLedger`].
pub struct LedgerHandle {
    ledger: Arc<InMemoryLedger>,
    caller: AccountId,
    submit_faults: Mutex<VecDeque<Fault>>,
    read_faults: Mutex<VecDeque<Fault>>,
}

impl LedgerHandle {
    /// Script a failure for the next `submit` on this handle.
    pub fn queue_submit_fault(&self, fault: Fault) {
        if let Ok(mut faults) = self.submit_faults.lock() {
            faults.push_back(fault);
        }
    }

    /// Script a failure for the next read on this handle.
    pub fn queue_read_fault(&self, fault: Fault) {
        if let Ok(mut faults) = self.read_faults.lock() {
            faults.push_back(fault);
        }
    }

    /// The shared ledger behind this handle.
    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    fn take_fault(queue: &Mutex<VecDeque<Fault>>) -> Result<(), ClientError> {
        let fault = queue.lock().ok().and_then(|mut q| q.pop_front());
        match fault {
            None | Some(Fault::Pass) => Ok(()),
            Some(Fault::Reject(reason)) => Err(ClientError::Rejected(reason)),
            Some(Fault::Timeout) => {
                Err(ClientError::Transport("simulated transport timeout".into()))
            }
        }
    }
}

#[async_trait]
impl LedgerConnection for LedgerHandle {
    async fn read_campaign(&self, id: CampaignId) -> Result<Campaign, ClientError> {
        Self::take_fault(&self.read_faults)?;
        let core = self.ledger.lock_core()?;
        core.campaigns
            .get(&id)
            .cloned()
            .ok_or(ClientError::NotFound(id))
    }

    async fn read_campaign_count(&self) -> Result<u64, ClientError> {
        Self::take_fault(&self.read_faults)?;
        let core = self.ledger.lock_core()?;
        Ok(core.campaigns.len() as u64)
    }

    async fn read_donations(&self, id: CampaignId) -> Result<Vec<Donation>, ClientError> {
        Self::take_fault(&self.read_faults)?;
        let core = self.ledger.lock_core()?;
        if !core.campaigns.contains_key(&id) {
            return Err(ClientError::NotFound(id));
        }
        Ok(core.donations.get(&id).cloned().unwrap_or_default())
    }

    async fn submit(&self, op: LedgerOp) -> Result<Receipt, ClientError> {
        Self::take_fault(&self.submit_faults)?;
        self.ledger.apply(&self.caller, op)
    }

    fn subscribe(&self) -> EventFeed {
        match self.ledger.events.read() {
            Ok(sender) => EventFeed::new(sender.subscribe()),
            Err(_) => {
                // Poisoned sender lock: hand back a feed that reports Closed.
                let (sender, receiver) = broadcast::channel(1);
                drop(sender);
                EventFeed::new(receiver)
            }
        }
    }

    fn caller(&self) -> &AccountId {
        &self.caller
    }
}
