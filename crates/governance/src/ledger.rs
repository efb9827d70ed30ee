//! Vote ledger
//!
//! Every accepted vote produces an immutable [`VoteLedgerEntry`]. The voter's
//! roster entry is then pointed at it; earlier entries stay on the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spacegov_common::{utils::generate_prefixed_uuid, MemberId, ProposalId, SpaceId};

use crate::proposal::Proposal;
use crate::roster::RosterEntry;
use crate::{GovernanceError, GovernanceResult};

/// An immutable record of one cast vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteLedgerEntry {
    pub id: String,
    pub proposal_id: ProposalId,
    pub voter: MemberId,
    pub space: SpaceId,
    /// Roster weight at the time of voting
    pub weight: u64,
    pub selected_answers: Vec<u8>,
    pub cast_at: DateTime<Utc>,
}

/// Check a selection against the proposal's question.
///
/// Unknown values fail with `InvalidAnswer`; anything but a single
/// selection fails with `InvalidArgument`.
pub fn validate_selection(proposal: &Proposal, selected: &[u8]) -> GovernanceResult<u8> {
    if let Some(unknown) = selected.iter().find(|v| !proposal.question.has_answer(**v)) {
        return Err(GovernanceError::InvalidAnswer(format!(
            "{} is not an answer of proposal {}", unknown, proposal.id
        )));
    }

    match selected {
        [value] => Ok(*value),
        _ => Err(GovernanceError::InvalidArgument(format!(
            "exactly one answer must be selected, got {}", selected.len()
        ))),
    }
}

/// Record a vote on `entry` and return the ledger entry to persist.
///
/// The caller is responsible for having checked that voting is open.
pub fn record_vote(
    proposal: &Proposal,
    entry: &mut RosterEntry,
    selected: &[u8],
    now: DateTime<Utc>,
) -> GovernanceResult<VoteLedgerEntry> {
    let value = validate_selection(proposal, selected)?;

    let vote = VoteLedgerEntry {
        id: generate_prefixed_uuid("vote"),
        proposal_id: proposal.id.clone(),
        voter: entry.voter.clone(),
        space: proposal.space.clone(),
        weight: entry.weight,
        selected_answers: vec![value],
        cast_at: now,
    };

    entry.has_voted = true;
    entry.selected_answers = vote.selected_answers.clone();
    entry.last_vote_ref = Some(vote.id.clone());

    Ok(vote)
}
