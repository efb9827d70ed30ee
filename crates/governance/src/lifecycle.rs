//! Proposal lifecycle
//!
//! Approval is a one-way switch: a draft becomes approved or rejected, never
//! both, and never back. Whether votes are accepted is a separate check that
//! also looks at the proposal kind and the voting window.

use chrono::{DateTime, Utc};
use tracing::info;

use spacegov_common::MemberId;

use crate::proposal::{Proposal, ProposalSettings};
use crate::{GovernanceError, GovernanceResult};

/// Mark a draft proposal approved
pub fn approve(proposal: &mut Proposal, guardian: &MemberId, at: DateTime<Utc>) -> GovernanceResult<()> {
    if proposal.status.approved {
        return Err(GovernanceError::Conflict(format!("proposal {} is already approved", proposal.id)));
    }
    if proposal.status.rejected {
        return Err(GovernanceError::Conflict(format!("proposal {} is already rejected", proposal.id)));
    }

    proposal.status.approved = true;
    proposal.status.approved_by = Some(guardian.clone());
    proposal.status.approved_at = Some(at);
    info!("Proposal {} approved by {}", proposal.id, guardian);
    Ok(())
}

/// Mark a draft proposal rejected
pub fn reject(proposal: &mut Proposal, guardian: &MemberId, at: DateTime<Utc>) -> GovernanceResult<()> {
    if proposal.status.approved {
        return Err(GovernanceError::Conflict(format!("proposal {} is already approved", proposal.id)));
    }
    if proposal.status.rejected {
        return Err(GovernanceError::Conflict(format!("proposal {} is already rejected", proposal.id)));
    }

    proposal.status.rejected = true;
    proposal.status.rejected_by = Some(guardian.clone());
    proposal.status.rejected_at = Some(at);
    info!("Proposal {} rejected by {}", proposal.id, guardian);
    Ok(())
}

/// Fail with `VotingClosed` unless the proposal accepts votes at `now`
pub fn ensure_voting_open(proposal: &Proposal, now: DateTime<Utc>) -> GovernanceResult<()> {
    if !proposal.status.approved || proposal.status.rejected {
        return Err(GovernanceError::VotingClosed(format!(
            "proposal {} is not approved", proposal.id
        )));
    }

    let settings = match &proposal.settings {
        ProposalSettings::MemberVote(settings) => settings,
        ProposalSettings::Native(_) => {
            return Err(GovernanceError::VotingClosed(format!(
                "proposal {} is native and does not take member votes", proposal.id
            )))
        }
    };

    if now < settings.start_time {
        return Err(GovernanceError::VotingClosed(format!(
            "voting on {} opens at {}", proposal.id, settings.start_time
        )));
    }
    if now > settings.end_time {
        return Err(GovernanceError::VotingClosed(format!(
            "voting on {} closed at {}", proposal.id, settings.end_time
        )));
    }
    Ok(())
}
