//! # Integration Scenarios
//!
//! Shared fixtures plus the scenario modules.

use std::sync::Arc;
use std::time::Duration;

use campaign_sync::{
    CampaignClient, CampaignId, ClientConfig, InMemoryLedger, LedgerConnection, LedgerHandle,
    LedgerOp, Receipt, SyncHandle, SyncState,
};

mod donation_flows;
mod sync_recovery;
mod withdrawal_flows;

/// A ledger pinned to a deterministic clock.
pub fn test_ledger() -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_now(1_000);
    ledger
}

/// Start a client for `account` whose guard clock follows the ledger's
/// manual clock, so deadline arithmetic agrees on both sides.
pub fn start_client(
    ledger: &Arc<InMemoryLedger>,
    account: &str,
) -> (CampaignClient<LedgerHandle>, SyncHandle) {
    let clock = Arc::clone(ledger);
    CampaignClient::start_with_clock(
        ClientConfig::for_testing(),
        Arc::new(ledger.connect(account)),
        Arc::new(move || clock.now()),
    )
}

/// Start a client over an existing handle, clock aligned with the ledger.
pub fn start_client_on(
    ledger: &Arc<InMemoryLedger>,
    handle: Arc<LedgerHandle>,
) -> (CampaignClient<LedgerHandle>, SyncHandle) {
    let clock = Arc::clone(ledger);
    CampaignClient::start_with_clock(
        ClientConfig::for_testing(),
        handle,
        Arc::new(move || clock.now()),
    )
}

/// Create a campaign through a raw handle and return its id.
pub async fn create_campaign(
    handle: &LedgerHandle,
    name: &str,
    goal: u64,
    duration_secs: u64,
) -> CampaignId {
    match handle
        .submit(LedgerOp::CreateCampaign {
            name: name.into(),
            goal,
            duration_secs,
        })
        .await
        .expect("campaign creation failed")
    {
        Receipt::CampaignCreated { id, .. } => id,
        other => panic!("unexpected receipt {other:?}"),
    }
}

/// Approve an allowance and donate through a raw handle.
pub async fn approve_and_donate(handle: &LedgerHandle, campaign_id: CampaignId, amount: u64) {
    handle
        .submit(LedgerOp::ApproveAllowance { amount })
        .await
        .expect("allowance failed");
    handle
        .submit(LedgerOp::Donate {
            campaign_id,
            donor_name: handle.caller().to_uppercase(),
            note: String::new(),
            amount,
        })
        .await
        .expect("donation failed");
}

/// Block until the client's synchronizer reports `Live`.
pub async fn wait_live(client: &CampaignClient<LedgerHandle>) {
    let mut state = client.sync_state_watch();
    tokio::time::timeout(Duration::from_secs(2), async {
        while *state.borrow_and_update() != SyncState::Live {
            state.changed().await.expect("synchronizer gone");
        }
    })
    .await
    .expect("synchronizer never went live");
}

/// Poll until `check` holds, or fail after two seconds.
pub async fn wait_for(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
