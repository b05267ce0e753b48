//! # Donation Orchestrator
//!
//! A donation is two independent ledger operations: grant a spending
//! allowance, then transfer and record. There is no cross-step atomicity,
//! so each step carries its own failure policy:
//!
//! - allowance step fails: abort, nothing was recorded, no funds moved;
//! - donate step is rejected: report it, leave the allowance in place
//!   (the ledger treats an allowance as a ceiling, and a retried donation
//!   spends the residual grant);
//! - donate step dispatched but unconfirmed: the outcome is unknown and
//!   must never be blind-retried; the event feed or the next resync
//!   settles it.
//!
//! On success the orchestrator does not touch the local mirror. The
//! synchronizer applies the resulting event, so there is one source of
//! truth for what actually happened.

use tracing::{debug, warn};

use crate::domain::{
    Amount, CampaignId, ClientError, LedgerOp, Receipt, SubmissionId,
};
use crate::ports::LedgerConnection;

/// Parameters of one donation intent.
#[derive(Clone, Debug)]
pub struct DonationRequest {
    /// Target campaign.
    pub campaign_id: CampaignId,
    /// Amount to donate.
    pub amount: Amount,
    /// Donor display name.
    pub donor_name: String,
    /// Free-text note.
    pub note: String,
}

/// Run the two-step donation saga against the ledger.
pub async fn execute_donation<L: LedgerConnection + ?Sized>(
    ledger: &L,
    submission: SubmissionId,
    request: DonationRequest,
) -> Result<Receipt, ClientError> {
    let DonationRequest {
        campaign_id,
        amount,
        donor_name,
        note,
    } = request;

    match ledger.submit(LedgerOp::ApproveAllowance { amount }).await {
        Ok(receipt) => {
            debug!(%submission, campaign_id, amount, ?receipt, "allowance granted");
        }
        Err(err) => {
            warn!(%submission, campaign_id, error = %err, "allowance step failed, aborting");
            return Err(ClientError::AllowanceFailed(err.to_string()));
        }
    }

    match ledger
        .submit(LedgerOp::Donate {
            campaign_id,
            donor_name,
            note,
            amount,
        })
        .await
    {
        Ok(receipt) => {
            debug!(%submission, campaign_id, amount, "donation applied by ledger");
            Ok(receipt)
        }
        Err(ClientError::Rejected(reason)) => {
            // The allowance stays granted; a retry reuses the residual.
            warn!(%submission, campaign_id, %reason, "donation rejected");
            Err(ClientError::DonationFailed(reason))
        }
        Err(ClientError::Transport(_)) | Err(ClientError::TransportTimeout { .. }) => {
            warn!(%submission, campaign_id, "donation dispatched but unconfirmed");
            Err(ClientError::UnknownOutcome { submission })
        }
        Err(err) => {
            warn!(%submission, campaign_id, error = %err, "donation failed");
            Err(ClientError::DonationFailed(err.to_string()))
        }
    }
}
