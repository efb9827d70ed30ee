//! Roster snapshot
//!
//! The roster is the list of eligible voters and their weights, taken once
//! when a proposal is created and never rebuilt afterwards.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use spacegov_common::{MemberId, ProgramId, ProposalId, SpaceId};
use spacegov_reputation::ReputationResolver;

use crate::proposal::VotingStrategy;
use crate::space::SpaceDirectory;
use crate::{GovernanceError, GovernanceResult};

/// Which members of a space get a roster entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Eligibility {
    Guardians,
    Members,
}

impl Eligibility {
    pub fn from_guardians_only(guardians_only: bool) -> Self {
        if guardians_only {
            Self::Guardians
        } else {
            Self::Members
        }
    }
}

/// One eligible voter of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub proposal_id: ProposalId,
    pub voter: MemberId,
    /// Voting power, fixed at creation
    pub weight: u64,
    pub has_voted: bool,
    /// Ledger entry of the latest vote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_vote_ref: Option<String>,
    #[serde(default)]
    pub selected_answers: Vec<u8>,
}

impl RosterEntry {
    fn new(proposal_id: ProposalId, voter: MemberId, weight: u64) -> Self {
        Self {
            proposal_id,
            voter,
            weight,
            has_voted: false,
            last_vote_ref: None,
            selected_answers: Vec::new(),
        }
    }
}

/// Sum of roster weights
pub fn total_weight(roster: &[RosterEntry]) -> GovernanceResult<u64> {
    roster
        .iter()
        .try_fold(0u64, |acc, e| acc.checked_add(e.weight))
        .ok_or_else(|| GovernanceError::Overflow("roster weight exceeds u64".to_string()))
}

/// Builds roster snapshots from the space directory and reputation
#[derive(Clone)]
pub struct RosterBuilder {
    spaces: Arc<dyn SpaceDirectory>,
    reputation: ReputationResolver,
}

impl RosterBuilder {
    pub fn new(spaces: Arc<dyn SpaceDirectory>, reputation: ReputationResolver) -> Self {
        Self { spaces, reputation }
    }

    /// Build the roster of `proposal_id`.
    ///
    /// The space directory is queried once. Every candidate gets an entry,
    /// including those whose reputation is zero. Entries are ordered by voter.
    pub async fn build(
        &self,
        proposal_id: &ProposalId,
        space: &SpaceId,
        eligibility: Eligibility,
        strategy: VotingStrategy,
        programs: Option<&HashSet<ProgramId>>,
    ) -> GovernanceResult<Vec<RosterEntry>> {
        let candidates: BTreeSet<MemberId> = self
            .spaces
            .members(space, eligibility)
            .await?
            .into_iter()
            .collect();

        let mut roster = Vec::with_capacity(candidates.len());
        for voter in candidates {
            let weight = match strategy {
                VotingStrategy::OneMemberOneVote => 1,
                VotingStrategy::ReputationInSpace => self.reputation.score(&voter, None).await?,
                VotingStrategy::ReputationInPrograms => {
                    self.reputation.score(&voter, programs).await?
                }
            };
            debug!("Roster entry for {} on {} weighs {}", voter, proposal_id, weight);
            roster.push(RosterEntry::new(proposal_id.clone(), voter, weight));
        }

        Ok(roster)
    }
}
