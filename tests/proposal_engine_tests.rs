use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use spacegov::common::{ManualClock, MemberId, ProgramId, ProposalId, SpaceId};
use spacegov::governance::{
    Answer, CreateProposalRequest, ErrorKind, Governance, GovernanceConfig, GovernanceManager,
    MemberVoteSettings, MemorySpaceDirectory, NativeSettings, Proposal, ProposalPhase,
    ProposalSettings, Question, VotingStrategy,
};
use spacegov::reputation::{BadgeLedger, ReputationRecord, ReputationResolver};
use spacegov::storage::{
    MemoryStorage, Storage, StorageError, StorageResult, WriteBatch,
};

/// Storage whose batch commits can be made to fail
struct FailingStorage {
    inner: MemoryStorage,
    fail_batches: AtomicBool,
}

impl FailingStorage {
    fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            fail_batches: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.fail_batches.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        self.inner.put(key, data).await
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StorageError::IoError(format!(
                "injected failure on batch of {} writes", batch.len()
            )));
        }
        self.inner.write_batch(batch).await
    }
}

struct Harness {
    manager: Arc<GovernanceManager>,
    clock: ManualClock,
    badges: Arc<BadgeLedger>,
    spaces: Arc<MemorySpaceDirectory>,
    space: SpaceId,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn voting_start() -> DateTime<Utc> {
    start() + Duration::days(2)
}

fn voting_end() -> DateTime<Utc> {
    start() + Duration::days(5)
}

fn id(name: &str) -> MemberId {
    MemberId::from(name)
}

async fn harness_with(storage: Arc<dyn Storage>) -> Harness {
    let clock = ManualClock::new(start());
    let space = SpaceId::from("S");

    let spaces = Arc::new(MemorySpaceDirectory::new());
    spaces.add_space(space.clone()).await;
    for guardian in ["A", "B", "C"] {
        spaces.add_guardian(&space, id(guardian)).await.unwrap();
    }
    spaces.add_member(&space, id("M")).await.unwrap();

    let badges = Arc::new(BadgeLedger::new(storage.clone()));
    award(&badges, "A", "forum", 100).await;
    award(&badges, "C", "forum", 20).await;
    award(&badges, "C", "events", 30).await;

    let manager = GovernanceManager::new(
        GovernanceConfig::default(),
        storage,
        spaces.clone(),
        ReputationResolver::new(badges.clone()),
        Arc::new(clock.clone()),
    );

    Harness {
        manager: Arc::new(manager),
        clock,
        badges,
        spaces,
        space,
    }
}

async fn harness() -> Harness {
    harness_with(Arc::new(MemoryStorage::new())).await
}

async fn award(badges: &BadgeLedger, member: &str, program: &str, xp: u64) {
    badges
        .record(ReputationRecord {
            id: format!("{}-{}-{}", member, program, xp),
            member: id(member),
            program_id: ProgramId::from(program),
            xp,
            issued_at: start(),
        })
        .await
        .unwrap();
}

fn yes_no() -> Question {
    let answer = |value: u8, text: &str| Answer {
        value,
        text: text.to_string(),
        additional_info: String::new(),
    };
    Question {
        text: "Proceed?".to_string(),
        additional_info: String::new(),
        answers: vec![answer(1, "Yes"), answer(2, "No")],
    }
}

fn member_vote_request(
    space: &SpaceId,
    strategy: VotingStrategy,
    guardians_only: bool,
) -> CreateProposalRequest {
    CreateProposalRequest {
        id: None,
        space: space.clone(),
        name: "Treasury allocation".to_string(),
        description: "Allocate funds to the events team".to_string(),
        additional_info: String::new(),
        settings: ProposalSettings::MemberVote(MemberVoteSettings {
            start_time: voting_start(),
            end_time: voting_end(),
            guardians_only,
            voting_strategy: strategy,
            program_ids: None,
        }),
        questions: vec![yes_no()],
    }
}

impl Harness {
    async fn create(&self, strategy: VotingStrategy, guardians_only: bool) -> Proposal {
        self.manager
            .create_proposal(&id("A"), member_vote_request(&self.space, strategy, guardians_only))
            .await
            .unwrap()
    }

    async fn create_open(&self, strategy: VotingStrategy, guardians_only: bool) -> Proposal {
        let proposal = self.create(strategy, guardians_only).await;
        self.manager.approve_proposal(&id("B"), &proposal.id).await.unwrap();
        self.clock.set(voting_start());
        proposal
    }

    async fn proposal(&self, proposal_id: &ProposalId) -> Proposal {
        self.manager.get_proposal(proposal_id).await.unwrap().unwrap()
    }

    async fn roster_weights(&self, proposal_id: &ProposalId) -> Vec<(String, u64)> {
        self.manager
            .get_roster(proposal_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.voter.to_string(), e.weight))
            .collect()
    }
}

#[tokio::test]
async fn test_reference_scenario() {
    let h = harness().await;
    let proposal = h.create(VotingStrategy::ReputationInSpace, true).await;

    assert_eq!(
        h.roster_weights(&proposal.id).await,
        vec![("A".to_string(), 100), ("B".to_string(), 0), ("C".to_string(), 50)]
    );
    assert_eq!(proposal.total_weight, 150);
    assert_eq!(proposal.phase(start()), ProposalPhase::Draft);

    h.manager.approve_proposal(&id("B"), &proposal.id).await.unwrap();
    h.clock.set(voting_start());

    h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap();
    h.manager.cast_vote(&id("C"), &proposal.id, vec![2]).await.unwrap();

    let results = h.proposal(&proposal.id).await.results;
    assert_eq!(results.total_weight, 150);
    assert_eq!(results.voted_weight, 150);
    assert_eq!(results.weight_for(1), 100);
    assert_eq!(results.weight_for(2), 50);

    h.manager.cast_vote(&id("A"), &proposal.id, vec![2]).await.unwrap();
    let results = h.proposal(&proposal.id).await.results;
    assert_eq!(results.weight_for(1), 0);
    assert_eq!(results.weight_for(2), 150);
    assert_eq!(results.voted_weight, 150);
}

#[tokio::test]
async fn test_roster_is_frozen_at_creation() {
    let h = harness().await;
    let proposal = h.create(VotingStrategy::ReputationInSpace, false).await;
    let before = h.roster_weights(&proposal.id).await;
    let sum: u64 = before.iter().map(|(_, w)| w).sum();
    assert_eq!(sum, proposal.total_weight);

    // reputation and membership change after creation
    award(&h.badges, "B", "forum", 500).await;
    h.spaces.add_member(&h.space, id("late")).await.unwrap();
    h.spaces.remove_member(&h.space, &id("M")).await.unwrap();

    assert_eq!(h.roster_weights(&proposal.id).await, before);
    let recomputed = h.manager.recompute_results(&proposal.id).await.unwrap();
    assert_eq!(recomputed.total_weight, proposal.total_weight);
    assert_eq!(h.proposal(&proposal.id).await.total_weight, proposal.total_weight);
}

#[tokio::test]
async fn test_reputation_in_programs_counts_selected_programs_only() {
    let h = harness().await;
    let mut request = member_vote_request(&h.space, VotingStrategy::ReputationInPrograms, true);
    if let ProposalSettings::MemberVote(settings) = &mut request.settings {
        settings.program_ids = Some([ProgramId::from("events")].into_iter().collect());
    }

    let proposal = h.manager.create_proposal(&id("C"), request).await.unwrap();
    assert_eq!(
        h.roster_weights(&proposal.id).await,
        vec![("A".to_string(), 0), ("B".to_string(), 0), ("C".to_string(), 30)]
    );
    assert_eq!(proposal.total_weight, 30);
}

#[tokio::test]
async fn test_approval_states_are_mutually_exclusive() {
    let h = harness().await;

    let first = h.create(VotingStrategy::OneMemberOneVote, false).await;
    h.manager.approve_proposal(&id("A"), &first.id).await.unwrap();
    let err = h.manager.reject_proposal(&id("C"), &first.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = h.manager.approve_proposal(&id("C"), &first.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let second = h.create(VotingStrategy::OneMemberOneVote, false).await;
    let rejected = h.manager.reject_proposal(&id("A"), &second.id).await.unwrap();
    assert_eq!(rejected.phase(voting_start()), ProposalPhase::Rejected);
    let err = h.manager.approve_proposal(&id("B"), &second.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    for proposal_id in [&first.id, &second.id] {
        let status = h.proposal(proposal_id).await.status;
        assert!(!(status.approved && status.rejected));
    }
}

#[tokio::test]
async fn test_voting_gated_by_approval_and_window() {
    let h = harness().await;
    let proposal = h.create(VotingStrategy::OneMemberOneVote, false).await;

    h.clock.set(voting_start());
    let err = h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VotingClosed);

    h.manager.approve_proposal(&id("B"), &proposal.id).await.unwrap();

    h.clock.set(voting_start() - Duration::seconds(1));
    let err = h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VotingClosed);

    h.clock.set(voting_end() + Duration::seconds(1));
    let err = h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VotingClosed);
    assert_eq!(h.proposal(&proposal.id).await.phase(voting_end() + Duration::seconds(1)), ProposalPhase::Closed);

    // nothing was recorded by the refused votes
    assert!(h.manager.get_ledger(&proposal.id).await.unwrap().is_empty());
    let entry = h.manager.get_roster_entry(&proposal.id, &id("A")).await.unwrap().unwrap();
    assert!(!entry.has_voted);
    assert_eq!(h.proposal(&proposal.id).await.results.voted_weight, 0);

    h.clock.set(voting_end());
    h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap();
}

#[tokio::test]
async fn test_vote_preconditions_report_distinct_kinds() {
    let h = harness().await;
    let proposal = h.create_open(VotingStrategy::OneMemberOneVote, true).await;

    let err = h.manager.cast_vote(&id("A"), &ProposalId::from("missing"), vec![1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // M is a member but the roster is guardians only
    let err = h.manager.cast_vote(&id("M"), &proposal.id, vec![1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEligible);

    let err = h.manager.cast_vote(&id("A"), &proposal.id, vec![3]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAnswer);

    let err = h.manager.cast_vote(&id("A"), &proposal.id, vec![1, 2]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert!(h.manager.get_ledger(&proposal.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_revote_supersedes_but_ledger_keeps_history() {
    let h = harness().await;
    let proposal = h.create_open(VotingStrategy::ReputationInSpace, true).await;

    let first = h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap();
    h.clock.set(voting_start() + Duration::minutes(5));
    let second = h.manager.cast_vote(&id("A"), &proposal.id, vec![2]).await.unwrap();

    let history = h.manager.get_votes_by(&proposal.id, &id("A")).await.unwrap();
    assert_eq!(history, vec![first.clone(), second.clone()]);

    let entry = h.manager.get_roster_entry(&proposal.id, &id("A")).await.unwrap().unwrap();
    assert_eq!(entry.selected_answers, vec![2]);
    assert_eq!(entry.last_vote_ref.as_deref(), Some(second.id.as_str()));

    let results = h.proposal(&proposal.id).await.results;
    assert_eq!(results.weight_for(1), 0);
    assert_eq!(results.weight_for(2), 100);
}

#[tokio::test]
async fn test_zero_weight_voter_counts_for_nothing() {
    let h = harness().await;
    let proposal = h.create_open(VotingStrategy::ReputationInSpace, true).await;

    let vote = h.manager.cast_vote(&id("B"), &proposal.id, vec![1]).await.unwrap();
    assert_eq!(vote.weight, 0);

    let results = h.proposal(&proposal.id).await.results;
    assert_eq!(results.voted_weight, 0);
    assert_eq!(results.weight_for(1), 0);
    assert!(h.manager.get_roster_entry(&proposal.id, &id("B")).await.unwrap().unwrap().has_voted);
}

#[tokio::test]
async fn test_native_proposals_reject_member_votes() {
    let h = harness().await;
    let mut request = member_vote_request(&h.space, VotingStrategy::OneMemberOneVote, false);
    request.settings = ProposalSettings::Native(NativeSettings {
        commence_index: 10,
        start_index: 20,
        end_index: 30,
    });

    let proposal = h.manager.create_proposal(&id("M"), request).await.unwrap();
    assert_eq!(proposal.total_weight, 4);
    h.manager.approve_proposal(&id("A"), &proposal.id).await.unwrap();
    assert_eq!(h.proposal(&proposal.id).await.phase(voting_start()), ProposalPhase::Native);

    let err = h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VotingClosed);
}

#[tokio::test]
async fn test_concurrent_votes_are_all_counted() {
    let h = harness().await;
    let voters: Vec<MemberId> = (0..32).map(|i| id(&format!("voter-{:02}", i))).collect();
    for voter in &voters {
        h.spaces.add_member(&h.space, voter.clone()).await.unwrap();
    }

    let proposal = h.create_open(VotingStrategy::OneMemberOneVote, false).await;

    let handles: Vec<_> = voters
        .iter()
        .enumerate()
        .map(|(i, voter)| {
            let manager = h.manager.clone();
            let voter = voter.clone();
            let proposal_id = proposal.id.clone();
            let answer = if i % 4 == 0 { 2 } else { 1 };
            tokio::spawn(async move { manager.cast_vote(&voter, &proposal_id, vec![answer]).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let results = h.proposal(&proposal.id).await.results;
    assert_eq!(results.total_weight, 36);
    assert_eq!(results.voted_weight, 32);
    assert_eq!(results.weight_for(1), 24);
    assert_eq!(results.weight_for(2), 8);
    assert_eq!(results.per_answer_weight.values().sum::<u64>(), results.voted_weight);
    assert_eq!(h.manager.get_ledger(&proposal.id).await.unwrap().len(), 32);
}

#[tokio::test]
async fn test_failed_creation_leaves_nothing_behind() {
    let storage = Arc::new(FailingStorage::new());
    let h = harness_with(storage.clone()).await;

    let mut request = member_vote_request(&h.space, VotingStrategy::OneMemberOneVote, false);
    request.id = Some(ProposalId::from("retry-me"));

    storage.set_failing(true);
    let err = h.manager.create_proposal(&id("A"), request.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.kind().is_retryable());

    assert!(h.manager.get_proposal(&ProposalId::from("retry-me")).await.unwrap().is_none());
    assert!(storage.list("governance/rosters/").await.unwrap().is_empty());

    // the same request succeeds once storage recovers, and only once
    storage.set_failing(false);
    let created = h.manager.create_proposal(&id("A"), request.clone()).await.unwrap();
    let again = h.manager.create_proposal(&id("A"), request).await.unwrap();
    assert_eq!(created, again);
    assert_eq!(h.manager.get_roster(&created.id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_failed_vote_commit_is_invisible() {
    let storage = Arc::new(FailingStorage::new());
    let h = harness_with(storage.clone()).await;
    let proposal = h.create_open(VotingStrategy::ReputationInSpace, true).await;

    storage.set_failing(true);
    let err = h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    assert!(h.manager.get_ledger(&proposal.id).await.unwrap().is_empty());
    assert!(!h.manager.get_roster_entry(&proposal.id, &id("A")).await.unwrap().unwrap().has_voted);
    assert_eq!(h.proposal(&proposal.id).await.results.voted_weight, 0);

    storage.set_failing(false);
    h.manager.cast_vote(&id("A"), &proposal.id, vec![1]).await.unwrap();
    assert_eq!(h.proposal(&proposal.id).await.results.weight_for(1), 100);
}

#[tokio::test]
async fn test_invalid_requests_write_nothing() {
    let storage = Arc::new(MemoryStorage::new());
    let h = harness_with(storage.clone()).await;
    let baseline = storage.len().await;

    let mut request = member_vote_request(&h.space, VotingStrategy::OneMemberOneVote, false);
    if let ProposalSettings::MemberVote(settings) = &mut request.settings {
        settings.start_time = start() + Duration::hours(1);
    }
    let err = h.manager.create_proposal(&id("A"), request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = h
        .manager
        .create_proposal(&id("outsider"), member_vote_request(&h.space, VotingStrategy::OneMemberOneVote, false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert_eq!(storage.len().await, baseline);
}
