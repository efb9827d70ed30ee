//! Governance manager implementation
//!
//! This module provides the implementation of the [`Governance`] trait,
//! wiring the roster builder, lifecycle, vote ledger and tally to storage.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use spacegov_common::{utils::generate_prefixed_uuid, Clock, MemberId, ProposalId};
use spacegov_reputation::ReputationResolver;
use spacegov_storage::Storage;

use crate::{
    config::GovernanceConfig,
    ledger::{self, VoteLedgerEntry},
    lifecycle,
    proposal::{CreateProposalRequest, Proposal, ProposalSettings, VotingStrategy},
    roster::{self, Eligibility, RosterBuilder, RosterEntry},
    space::SpaceDirectory,
    store::ProposalStore,
    tally::{self, Results},
    Governance, GovernanceError, GovernanceResult,
};

/// The main implementation of the Governance trait
pub struct GovernanceManager {
    /// Validation settings
    config: GovernanceConfig,
    /// Proposal, roster and ledger documents
    store: ProposalStore,
    /// Membership of spaces
    spaces: Arc<dyn SpaceDirectory>,
    /// Snapshot builder for new proposals
    roster_builder: RosterBuilder,
    /// Current time
    clock: Arc<dyn Clock>,
    /// One writer per proposal at a time
    locks: DashMap<ProposalId, Arc<Mutex<()>>>,
}

impl GovernanceManager {
    /// Create a new governance manager
    pub fn new(
        config: GovernanceConfig,
        storage: Arc<dyn Storage>,
        spaces: Arc<dyn SpaceDirectory>,
        reputation: ReputationResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store: ProposalStore::new(storage),
            roster_builder: RosterBuilder::new(spaces.clone(), reputation),
            spaces,
            clock,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    async fn lock_for(&self, id: &ProposalId) -> ProposalGuard<'_> {
        let lock = self.locks.entry(id.clone()).or_default().clone();
        ProposalGuard {
            locks: &self.locks,
            id: id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn require_proposal(&self, id: &ProposalId) -> GovernanceResult<Proposal> {
        self.store
            .load_proposal(id)
            .await?
            .ok_or_else(|| GovernanceError::NotFound(format!("proposal {}", id)))
    }

    async fn require_guardian(&self, proposal: &Proposal, caller: &MemberId) -> GovernanceResult<()> {
        if !self.spaces.is_guardian(&proposal.space, caller).await? {
            return Err(GovernanceError::Forbidden(format!(
                "{} is not a guardian of space {}", caller, proposal.space
            )));
        }
        Ok(())
    }

    /// A retried create whose id is already taken
    fn existing_for_retry(
        existing: Proposal,
        caller: &MemberId,
        request: &CreateProposalRequest,
    ) -> GovernanceResult<Proposal> {
        if existing.space != request.space || &existing.created_by != caller {
            return Err(GovernanceError::Conflict(format!(
                "proposal id {} is already in use", existing.id
            )));
        }
        debug!("Proposal {} already exists, returning stored copy", existing.id);
        Ok(existing)
    }

    /// All roster entries, ordered by voter
    pub async fn get_roster(&self, proposal_id: &ProposalId) -> GovernanceResult<Vec<RosterEntry>> {
        self.require_proposal(proposal_id).await?;
        self.store.load_roster(proposal_id).await
    }

    pub async fn get_roster_entry(
        &self,
        proposal_id: &ProposalId,
        voter: &MemberId,
    ) -> GovernanceResult<Option<RosterEntry>> {
        self.store.load_roster_entry(proposal_id, voter).await
    }

    /// Every ledger entry of a proposal, oldest first
    pub async fn get_ledger(&self, proposal_id: &ProposalId) -> GovernanceResult<Vec<VoteLedgerEntry>> {
        self.require_proposal(proposal_id).await?;
        self.store.load_ledger(proposal_id).await
    }

    /// Vote history of one voter on a proposal, oldest first
    pub async fn get_votes_by(
        &self,
        proposal_id: &ProposalId,
        voter: &MemberId,
    ) -> GovernanceResult<Vec<VoteLedgerEntry>> {
        Ok(self
            .get_ledger(proposal_id)
            .await?
            .into_iter()
            .filter(|v| &v.voter == voter)
            .collect())
    }
}

/// Holds the write lock of one proposal; the map entry goes away with the
/// last holder, including calls that fail on an unknown id.
struct ProposalGuard<'a> {
    locks: &'a DashMap<ProposalId, Arc<Mutex<()>>>,
    id: ProposalId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProposalGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[async_trait]
impl Governance for GovernanceManager {
    async fn create_proposal(
        &self,
        caller: &MemberId,
        request: CreateProposalRequest,
    ) -> GovernanceResult<Proposal> {
        let now = self.clock.now();
        request.validate(&self.config, now)?;

        if !self.spaces.space_exists(&request.space).await? {
            return Err(GovernanceError::NotFound(format!("space {}", request.space)));
        }
        if !self.spaces.is_member(&request.space, caller).await? {
            return Err(GovernanceError::Forbidden(format!(
                "{} is not a member of space {}", caller, request.space
            )));
        }

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| ProposalId::new(generate_prefixed_uuid("proposal")));

        let _guard = self.lock_for(&id).await;

        if let Some(existing) = self.store.load_proposal(&id).await? {
            return Self::existing_for_retry(existing, caller, &request);
        }

        // native proposals carry a uniform roster of all members
        let (eligibility, strategy, programs) = match &request.settings {
            ProposalSettings::MemberVote(settings) => (
                Eligibility::from_guardians_only(settings.guardians_only),
                settings.voting_strategy,
                settings.program_filter(),
            ),
            ProposalSettings::Native(_) => (Eligibility::Members, VotingStrategy::OneMemberOneVote, None),
        };

        let roster = self
            .roster_builder
            .build(&id, &request.space, eligibility, strategy, programs.as_ref())
            .await?;
        let total_weight = roster::total_weight(&roster)?;
        let question = request.question()?.clone();

        let proposal = Proposal {
            id,
            space: request.space,
            name: request.name,
            description: request.description,
            additional_info: request.additional_info,
            settings: request.settings,
            results: Results::empty(&question, total_weight),
            question,
            status: Default::default(),
            total_weight,
            created_by: caller.clone(),
            created_at: now,
        };

        self.store.create(&proposal, &roster).await?;
        info!(
            "Created proposal {} in space {} with {} voters and total weight {}",
            proposal.id, proposal.space, roster.len(), total_weight
        );
        Ok(proposal)
    }

    async fn approve_proposal(
        &self,
        caller: &MemberId,
        proposal_id: &ProposalId,
    ) -> GovernanceResult<Proposal> {
        let _guard = self.lock_for(proposal_id).await;

        let mut proposal = self.require_proposal(proposal_id).await?;
        self.require_guardian(&proposal, caller).await?;
        lifecycle::approve(&mut proposal, caller, self.clock.now())?;
        self.store.save_proposal(&proposal).await?;
        Ok(proposal)
    }

    async fn reject_proposal(
        &self,
        caller: &MemberId,
        proposal_id: &ProposalId,
    ) -> GovernanceResult<Proposal> {
        let _guard = self.lock_for(proposal_id).await;

        let mut proposal = self.require_proposal(proposal_id).await?;
        self.require_guardian(&proposal, caller).await?;
        lifecycle::reject(&mut proposal, caller, self.clock.now())?;
        self.store.save_proposal(&proposal).await?;
        Ok(proposal)
    }

    async fn cast_vote(
        &self,
        caller: &MemberId,
        proposal_id: &ProposalId,
        selected_answers: Vec<u8>,
    ) -> GovernanceResult<VoteLedgerEntry> {
        let _guard = self.lock_for(proposal_id).await;

        let mut proposal = self.require_proposal(proposal_id).await?;
        let mut roster = self.store.load_roster(proposal_id).await?;
        let position = roster
            .iter()
            .position(|e| &e.voter == caller)
            .ok_or_else(|| GovernanceError::NotEligible(format!(
                "{} is not on the roster of proposal {}", caller, proposal_id
            )))?;

        let now = self.clock.now();
        lifecycle::ensure_voting_open(&proposal, now)?;

        let entry = &mut roster[position];
        let vote = ledger::record_vote(&proposal, entry, &selected_answers, now)?;

        proposal.results = tally::compute(&proposal.question, &roster);
        if proposal.results.total_weight != proposal.total_weight {
            warn!(
                "Roster of {} weighs {} but proposal recorded {}",
                proposal.id, proposal.results.total_weight, proposal.total_weight
            );
        }

        self.store.commit_vote(&vote, &roster[position], &proposal).await?;
        info!(
            "Vote {} by {} on {} for {:?} with weight {}",
            vote.id, caller, proposal_id, vote.selected_answers, vote.weight
        );
        Ok(vote)
    }

    async fn recompute_results(&self, proposal_id: &ProposalId) -> GovernanceResult<Results> {
        let _guard = self.lock_for(proposal_id).await;

        let mut proposal = self.require_proposal(proposal_id).await?;
        let roster = self.store.load_roster(proposal_id).await?;
        proposal.results = tally::compute(&proposal.question, &roster);
        self.store.save_proposal(&proposal).await?;
        debug!("Recomputed results of {}: {:?}", proposal_id, proposal.results);
        Ok(proposal.results)
    }

    async fn get_proposal(&self, proposal_id: &ProposalId) -> GovernanceResult<Option<Proposal>> {
        self.store.load_proposal(proposal_id).await
    }
}
