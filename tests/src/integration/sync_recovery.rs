//! # Synchronizer Recovery Scenarios
//!
//! Resync on connect, reconnect after transport failure, duplicate
//! delivery, and read retries.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use campaign_sync::{CampaignApi, Fault, SyncState};

    use crate::integration::{
        approve_and_donate, create_campaign, start_client, start_client_on, test_ledger, wait_for,
        wait_live,
    };

    #[tokio::test]
    async fn test_initial_resync_discovers_existing_state() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        // Everything below happens before the client ever subscribes, so
        // none of it is available from the feed.
        let first = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;
        let _ = create_campaign(&organizer, "beach patrol", 200, 3_600).await;
        let third = create_campaign(&organizer, "coral nursery", 300, 3_600).await;
        approve_and_donate(&ledger.connect("alice"), first, 60).await;

        let (client, handle) = start_client(&ledger, "watcher");
        wait_live(&client).await;

        assert_eq!(client.campaigns().len(), 3);
        assert_eq!(client.campaign(third).unwrap().name, "coral nursery");
        assert_eq!(client.campaign(first).unwrap().total_donations, 60);
        assert_eq!(client.donations(first).len(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_recovers_events_lost_while_down() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let (client, handle) = start_client(&ledger, "watcher");
        wait_live(&client).await;

        let first = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;
        wait_for(|| client.campaign(first).is_some()).await;

        // Transport failure: the live feed ends and the creation of the
        // next campaign is never delivered as an event.
        ledger.sever_feeds();
        let second = create_campaign(&organizer, "beach patrol", 200, 3_600).await;

        // The synchronizer reconnects on its own and the resync discovers
        // the new id from the campaign count.
        wait_for(|| client.campaign(second).is_some()).await;
        assert_eq!(client.campaigns().len(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_delivery_changes_nothing() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;

        let (client, handle) = start_client(&ledger, "watcher");
        wait_live(&client).await;
        approve_and_donate(&ledger.connect("alice"), id, 60).await;
        wait_for(|| client.campaign(id).map(|c| c.total_donations) == Some(60)).await;

        // At-least-once delivery: the ledger resends its whole history.
        assert!(ledger.replay(1) > 0);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.campaign(id).unwrap().total_donations, 60);
        assert_eq!(client.donations(id).len(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_transient_read_failures_do_not_prevent_sync() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;

        let watcher = Arc::new(ledger.connect("watcher"));
        // The first resync read fails once; the bounded retry absorbs it.
        watcher.queue_read_fault(Fault::Timeout);
        let (client, handle) = start_client_on(&ledger, watcher);
        wait_live(&client).await;

        assert!(client.campaign(id).is_some());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_exhausted_reads_keep_client_disconnected_then_recover() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;

        let watcher = Arc::new(ledger.connect("watcher"));
        // Enough scripted failures to exhaust one whole resync attempt
        // (the testing config allows two tries per read).
        watcher.queue_read_fault(Fault::Timeout);
        watcher.queue_read_fault(Fault::Timeout);
        let (client, handle) = start_client_on(&ledger, watcher);

        // The first connect fails, the synchronizer backs off, reconnects,
        // and the second resync succeeds.
        wait_live(&client).await;
        assert!(client.campaign(id).is_some());
        assert_eq!(client.sync_state(), SyncState::Live);

        handle.shutdown().await;
    }
}
