//! # Withdrawal Scenarios
//!
//! Eligibility gating, the one-way close, and concurrent withdrawal races.

#[cfg(test)]
mod tests {
    use campaign_sync::{
        can_withdraw, CampaignApi, ClientError, LedgerConnection, LedgerOp,
    };

    use crate::integration::{
        approve_and_donate, create_campaign, start_client, test_ledger, wait_for, wait_live,
    };

    #[tokio::test]
    async fn test_goal_reached_withdrawal_closes_campaign() {
        let ledger = test_ledger();
        let (client, handle) = start_client(&ledger, "org");
        wait_live(&client).await;

        let id = client.create_campaign("reef cleanup", 100, 3_600).await.unwrap();
        wait_for(|| client.campaign(id).is_some()).await;
        approve_and_donate(&ledger.connect("alice"), id, 60).await;
        approve_and_donate(&ledger.connect("bob"), id, 40).await;
        wait_for(|| client.campaign(id).map(|c| c.total_donations) == Some(100)).await;

        // The same rule gates the button and the guard.
        let campaign = client.campaign(id).unwrap();
        assert!(can_withdraw(&campaign, &"org".to_string(), ledger.now()));

        client.withdraw(id).await.unwrap();
        wait_for(|| client.campaign(id).map(|c| c.is_closed) == Some(true)).await;

        // Closed means closed: no further donations are accepted.
        let late = ledger.connect("carol");
        late.submit(LedgerOp::ApproveAllowance { amount: 10 })
            .await
            .unwrap();
        let rejected = late
            .submit(LedgerOp::Donate {
                campaign_id: id,
                donor_name: "Carol".into(),
                note: String::new(),
                amount: 10,
            })
            .await;
        assert!(matches!(rejected, Err(ClientError::Rejected(_))));
        assert_eq!(client.campaign(id).unwrap().total_donations, 100);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_expired_campaign_with_funds_is_withdrawable() {
        let ledger = test_ledger();
        let (client, handle) = start_client(&ledger, "org");
        wait_live(&client).await;

        let id = client.create_campaign("reef cleanup", 100, 60).await.unwrap();
        wait_for(|| client.campaign(id).is_some()).await;
        approve_and_donate(&ledger.connect("alice"), id, 30).await;
        wait_for(|| client.campaign(id).map(|c| c.total_donations) == Some(30)).await;

        // Before the deadline, 30 of 100 does not clear the gate. The
        // guard answers locally without a ledger round trip.
        let err = client.withdraw(id).await.unwrap_err();
        assert!(matches!(err, ClientError::Invariant(_)));

        ledger.advance(120);
        client.withdraw(id).await.unwrap();
        wait_for(|| client.campaign(id).map(|c| c.is_closed) == Some(true)).await;

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_expired_campaign_without_funds_stays_open() {
        let ledger = test_ledger();
        let (client, handle) = start_client(&ledger, "org");
        wait_live(&client).await;

        let id = client.create_campaign("reef cleanup", 100, 60).await.unwrap();
        wait_for(|| client.campaign(id).is_some()).await;
        ledger.advance(120);

        let err = client.withdraw(id).await.unwrap_err();
        assert!(matches!(err, ClientError::Invariant(_)));
        assert!(!client.campaign(id).unwrap().is_closed);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_close_exactly_once() {
        let ledger = test_ledger();
        let organizer = ledger.connect("org");
        let id = create_campaign(&organizer, "reef cleanup", 100, 3_600).await;
        approve_and_donate(&ledger.connect("alice"), id, 100).await;

        let (client, handle) = start_client(&ledger, "watcher");
        wait_live(&client).await;
        wait_for(|| client.campaign(id).map(|c| c.total_donations) == Some(100)).await;

        // Two connections race the same withdrawal; the ledger serializes
        // them, so exactly one receipt and one rejection come back.
        let first = ledger.connect("org");
        let second = ledger.connect("org");
        let (a, b) = tokio::join!(
            first.submit(LedgerOp::Withdraw { campaign_id: id }),
            second.submit(LedgerOp::Withdraw { campaign_id: id }),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

        // Regardless of completion order the mirror ends closed, once.
        wait_for(|| client.campaign(id).map(|c| c.is_closed) == Some(true)).await;
        assert_eq!(client.campaign(id).unwrap().total_donations, 100);
        assert_eq!(ledger.event_count(), 3); // create, donate, single close

        handle.shutdown().await;
    }
}
