//! A scripted walk through the proposal lifecycle
//!
//! Three guardians of one space hold 100, 0 and 50 XP. A reputation-weighted
//! guardians-only proposal is created and approved, A votes yes, C votes no,
//! then A changes to no.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

use spacegov_common::{ManualClock, MemberId, ProgramId, SpaceId};
use spacegov_governance::{
    Answer, CreateProposalRequest, Governance, GovernanceConfig, GovernanceManager,
    MemberVoteSettings, MemorySpaceDirectory, Proposal, ProposalSettings, Question, Results,
    VoteLedgerEntry, VotingStrategy,
};
use spacegov_reputation::{BadgeLedger, ReputationRecord, ReputationResolver};
use spacegov_storage::{MemoryStorage, Storage};

/// What the demo observed along the way
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoReport {
    pub created: Proposal,
    pub after_first_votes: Results,
    pub after_revote: Results,
    pub ledger: Vec<VoteLedgerEntry>,
}

/// Run the scenario against in-memory collaborators
pub async fn run(config: GovernanceConfig) -> anyhow::Result<DemoReport> {
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid demo start time"))?;
    let clock = ManualClock::new(start);
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    let space = SpaceId::from("space-s");
    let (a, b, c) = (MemberId::from("A"), MemberId::from("B"), MemberId::from("C"));

    let spaces = MemorySpaceDirectory::new();
    spaces.add_space(space.clone()).await;
    for guardian in [&a, &b, &c] {
        spaces.add_guardian(&space, guardian.clone()).await?;
    }

    let badges = BadgeLedger::new(storage.clone());
    for (id, member, xp) in [("badge-1", &a, 100), ("badge-2", &c, 50)] {
        badges
            .record(ReputationRecord {
                id: id.to_string(),
                member: member.clone(),
                program_id: ProgramId::from("onboarding"),
                xp,
                issued_at: start,
            })
            .await?;
    }

    let lead = config.min_voting_lead_time();
    let manager = GovernanceManager::new(
        config,
        storage.clone(),
        Arc::new(spaces),
        ReputationResolver::new(Arc::new(badges)),
        Arc::new(clock.clone()),
    );

    let answer = |value: u8, text: &str| Answer {
        value,
        text: text.to_string(),
        additional_info: String::new(),
    };
    let voting_starts = lead
        .checked_add(&Duration::hours(1))
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(|| anyhow::anyhow!("lead time too large for the demo"))?;
    let request = CreateProposalRequest {
        id: None,
        space: space.clone(),
        name: "Adopt the new charter".to_string(),
        description: "Guardians decide on the charter draft".to_string(),
        additional_info: String::new(),
        settings: ProposalSettings::MemberVote(MemberVoteSettings {
            start_time: voting_starts,
            end_time: voting_starts + Duration::days(7),
            guardians_only: true,
            voting_strategy: VotingStrategy::ReputationInSpace,
            program_ids: None,
        }),
        questions: vec![Question {
            text: "Adopt the charter?".to_string(),
            additional_info: String::new(),
            answers: vec![answer(1, "Yes"), answer(2, "No")],
        }],
    };

    let created = manager.create_proposal(&a, request).await?;
    manager.approve_proposal(&b, &created.id).await?;

    clock.set(voting_starts);
    manager.cast_vote(&a, &created.id, vec![1]).await?;
    manager.cast_vote(&c, &created.id, vec![2]).await?;
    let after_first_votes = manager
        .get_proposal(&created.id)
        .await?
        .map(|p| p.results)
        .ok_or_else(|| anyhow::anyhow!("proposal vanished"))?;

    manager.cast_vote(&a, &created.id, vec![2]).await?;
    let after_revote = manager.recompute_results(&created.id).await?;
    let ledger = manager.get_ledger(&created.id).await?;

    info!("Demo finished with {} ledger entries", ledger.len());
    Ok(DemoReport {
        created,
        after_first_votes,
        after_revote,
        ledger,
    })
}
