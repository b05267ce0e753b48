//! # Domain Errors
//!
//! Error taxonomy for the campaign sync client. Every operation either
//! returns a confirmed success or one of these typed failures; nothing is
//! silently dropped.

use thiserror::Error;

use super::entities::{Amount, CampaignId};
use super::value_objects::SubmissionId;

/// Client error types.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Read of a campaign id the ledger does not know.
    #[error("campaign {0} not found")]
    NotFound(CampaignId),

    /// A local pre-submission check failed. Nothing was sent to the ledger
    /// and the operation is never retried automatically.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The allowance-grant step of a donation was rejected or lost.
    /// No funds moved and no donation was recorded.
    #[error("allowance grant failed: {0}")]
    AllowanceFailed(String),

    /// The transfer-and-record step of a donation was rejected by the
    /// ledger. The already-granted allowance is left in place.
    #[error("donation failed: {0}")]
    DonationFailed(String),

    /// A withdrawal was rejected by the ledger.
    #[error("withdrawal failed: {0}")]
    WithdrawFailed(String),

    /// Raw ledger rejection, carrying the remote reason verbatim.
    #[error("operation rejected by ledger: {0}")]
    Rejected(String),

    /// Transport-level failure talking to the ledger.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within budget after bounded retries.
    #[error("no response from ledger after {attempts} attempts")]
    TransportTimeout {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The operation was dispatched but its confirmation was lost. The true
    /// outcome is only learned from the event feed or the next resync.
    #[error("outcome of submission {submission} unknown until next resync")]
    UnknownOutcome {
        /// Submission whose fate is undetermined.
        submission: SubmissionId,
    },
}

/// A business rule the guard refuses to violate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Campaign name was empty or whitespace.
    #[error("campaign name must not be empty")]
    EmptyName,

    /// Campaign goal must be a positive amount.
    #[error("campaign goal must be positive")]
    ZeroGoal,

    /// Donation amount must be a positive amount.
    #[error("donation amount must be positive")]
    ZeroAmount,

    /// Campaign duration below the ledger minimum.
    #[error("campaign duration too short: {got}s < {min}s")]
    DurationTooShort {
        /// Requested duration in seconds.
        got: u64,
        /// Minimum the ledger accepts.
        min: u64,
    },

    /// The campaign is not present in the local mirror.
    #[error("campaign {0} is not known")]
    UnknownCampaign(CampaignId),

    /// The campaign already paid out and is permanently closed.
    #[error("campaign {0} is closed")]
    CampaignClosed(CampaignId),

    /// The campaign deadline has passed.
    #[error("campaign {0} deadline has passed")]
    DeadlinePassed(CampaignId),

    /// Only the organizer may withdraw.
    #[error("caller is not the organizer of campaign {0}")]
    NotOrganizer(CampaignId),

    /// Withdrawal before the deadline requires the goal to be met.
    #[error("goal not reached: {raised} of {goal} raised")]
    GoalNotReached {
        /// Amount raised so far.
        raised: Amount,
        /// The campaign goal.
        goal: Amount,
    },

    /// Nothing was raised, so there is nothing to withdraw.
    #[error("campaign {0} has no donations to withdraw")]
    NothingRaised(CampaignId),
}
