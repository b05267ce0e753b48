//! # Domain Invariants
//!
//! Pure validation, no I/O. These checks run before any write is submitted
//! (fail fast, no network call) and again on every event application
//! (defense against a misbehaving feed). The ledger remains the final
//! arbiter; these are a mirror of its rules, not a substitute.

use super::entities::{AccountId, Amount, Campaign, Timestamp};
use super::errors::InvariantViolation;

/// Shortest campaign duration the ledger accepts, in seconds.
pub const MIN_CAMPAIGN_DURATION_SECS: u64 = 60;

/// Validate campaign creation parameters.
pub fn check_creation(
    name: &str,
    goal: Amount,
    duration_secs: u64,
) -> Result<(), InvariantViolation> {
    if name.trim().is_empty() {
        return Err(InvariantViolation::EmptyName);
    }
    if goal == 0 {
        return Err(InvariantViolation::ZeroGoal);
    }
    if duration_secs < MIN_CAMPAIGN_DURATION_SECS {
        return Err(InvariantViolation::DurationTooShort {
            got: duration_secs,
            min: MIN_CAMPAIGN_DURATION_SECS,
        });
    }
    Ok(())
}

/// Validate a donation against a campaign at `now`.
pub fn check_donation(
    campaign: &Campaign,
    amount: Amount,
    now: Timestamp,
) -> Result<(), InvariantViolation> {
    if amount == 0 {
        return Err(InvariantViolation::ZeroAmount);
    }
    if campaign.is_closed {
        return Err(InvariantViolation::CampaignClosed(campaign.id));
    }
    if campaign.is_expired(now) {
        return Err(InvariantViolation::DeadlinePassed(campaign.id));
    }
    Ok(())
}

/// Validate a withdrawal by `caller` at `now`.
///
/// This is the single source of the eligibility rule: the goal is reached,
/// or the deadline has passed with a nonzero total. Both the pre-submission
/// guard and any withdrawal gating must call this, never restate it.
pub fn check_withdrawal(
    campaign: &Campaign,
    caller: &AccountId,
    now: Timestamp,
) -> Result<(), InvariantViolation> {
    if campaign.is_closed {
        return Err(InvariantViolation::CampaignClosed(campaign.id));
    }
    if &campaign.organizer != caller {
        return Err(InvariantViolation::NotOrganizer(campaign.id));
    }
    if campaign.goal_reached() {
        return Ok(());
    }
    if campaign.is_expired(now) {
        if campaign.total_donations > 0 {
            Ok(())
        } else {
            Err(InvariantViolation::NothingRaised(campaign.id))
        }
    } else {
        Err(InvariantViolation::GoalNotReached {
            raised: campaign.total_donations,
            goal: campaign.goal,
        })
    }
}

/// Whether the campaign still accepts donations at `now`.
#[must_use]
pub fn can_donate(campaign: &Campaign, now: Timestamp) -> bool {
    !campaign.is_closed && !campaign.is_expired(now)
}

/// Whether `caller` could withdraw from the campaign at `now`.
#[must_use]
pub fn can_withdraw(campaign: &Campaign, caller: &AccountId, now: Timestamp) -> bool {
    check_withdrawal(campaign, caller, now).is_ok()
}
