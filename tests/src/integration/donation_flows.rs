//! # Donation Flow Scenarios
//!
//! The two-step saga observed end to end: success, allowance failure,
//! rejected transfer, unknown outcome, and the pending overlay's life.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use campaign_sync::{CampaignApi, ClientError, Fault, LedgerConnection, LedgerOp};

    use crate::integration::{
        approve_and_donate, create_campaign, start_client, start_client_on, test_ledger, wait_for,
        wait_live,
    };

    #[tokio::test]
    async fn test_goal_reached_across_two_donors() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;

        let (client, handle) = start_client(&ledger, "watcher");
        wait_live(&client).await;

        approve_and_donate(&ledger.connect("alice"), id, 60).await;
        approve_and_donate(&ledger.connect("bob"), id, 40).await;

        wait_for(|| client.campaign(id).map(|c| c.total_donations) == Some(100)).await;
        let campaign = client.campaign(id).unwrap();
        assert!(campaign.goal_reached());
        assert_eq!(client.donations(id).len(), 2);
        // Per-donor history reflects only that donor's gifts.
        assert_eq!(client.donations_by("alice").len(), 1);
        assert_eq!(client.donations_by("bob").len(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_allowance_failure_leaves_no_trace() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;

        let donor = Arc::new(ledger.connect("alice"));
        donor.queue_submit_fault(Fault::Timeout);
        let (client, handle) = start_client_on(&ledger, donor);
        wait_live(&client).await;

        let err = client.donate(id, 60, "Alice", "").await.unwrap_err();
        assert!(matches!(err, ClientError::AllowanceFailed(_)));

        // No donation event was ever emitted; the mirror stays untouched
        // and nothing is pending.
        assert_eq!(ledger.event_count(), 1);
        assert_eq!(client.campaign(id).unwrap().total_donations, 0);
        assert!(client.pending().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejected_transfer_keeps_residual_allowance() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;

        let donor = Arc::new(ledger.connect("alice"));
        let (client, handle) = start_client_on(&ledger, donor.clone());
        wait_live(&client).await;

        // The allowance lands, then the transfer hits a scripted rejection.
        donor.queue_submit_fault(Fault::Pass);
        donor.queue_submit_fault(Fault::Reject("ledger is busy".into()));
        let err = client.donate(id, 60, "Alice", "").await.unwrap_err();
        match err {
            ClientError::DonationFailed(reason) => assert!(reason.contains("busy")),
            other => panic!("expected DonationFailed, got {other:?}"),
        }

        // The saga does not revoke the grant; a retry would reuse it.
        assert_eq!(ledger.allowance_of("alice"), 60);
        assert_eq!(client.campaign(id).unwrap().total_donations, 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_outcome_keeps_pending_until_settled() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;

        let donor = Arc::new(ledger.connect("alice"));
        let (client, handle) = start_client_on(&ledger, donor.clone());
        wait_live(&client).await;

        donor.queue_submit_fault(Fault::Pass);
        donor.queue_submit_fault(Fault::Timeout);
        let err = client.donate(id, 50, "Alice", "").await.unwrap_err();
        let submission = match err {
            ClientError::UnknownOutcome { submission } => submission,
            other => panic!("expected UnknownOutcome, got {other:?}"),
        };

        // The overlay shows the unconfirmed submission.
        let pending = client.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].submission, submission);
        assert!(!pending[0].confirmed);

        // The donation eventually lands on the ledger (here: a retry that
        // spends the residual allowance) and the feed settles the overlay.
        donor
            .submit(LedgerOp::Donate {
                campaign_id: id,
                donor_name: "Alice".into(),
                note: String::new(),
                amount: 50,
            })
            .await
            .unwrap();
        wait_for(|| client.pending().is_empty()).await;
        assert_eq!(client.campaign(id).unwrap().total_donations, 50);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_many_donations_sum_exactly() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 1_000_000, 3_600).await;

        let (client, handle) = start_client(&ledger, "watcher");
        wait_live(&client).await;

        let mut expected = 0u64;
        for i in 0..20 {
            let amount = rng.gen_range(1..500);
            expected += amount;
            approve_and_donate(&ledger.connect(format!("donor-{i}")), id, amount).await;
        }

        wait_for(|| client.campaign(id).map(|c| c.total_donations) == Some(expected)).await;
        assert_eq!(client.donations(id).len(), 20);
        assert_eq!(client.stats().donation_count, 20);
        assert_eq!(client.stats().total_raised, expected);

        handle.shutdown().await;
    }
}
