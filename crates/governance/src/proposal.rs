//! Proposal data model and request validation

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spacegov_common::{MemberId, ProgramId, ProposalId, SpaceId};

use crate::config::GovernanceConfig;
use crate::tally::Results;
use crate::{GovernanceError, GovernanceResult};

/// How voting weight is derived for a member vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VotingStrategy {
    /// Every eligible member weighs 1
    OneMemberOneVote,
    /// Weight is the member's total badge XP
    ReputationInSpace,
    /// Weight is the member's badge XP from selected programs only
    ReputationInPrograms,
}

/// The two kinds of proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalKind {
    /// Gated by on-chain milestones; not voted through member votes
    Native,
    /// Gated by a voting time window
    MemberVote,
}

/// Milestone window of a native proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSettings {
    pub commence_index: u64,
    pub start_index: u64,
    pub end_index: u64,
}

/// Time window and roster rules of a member vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberVoteSettings {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Only guardians get a roster entry when set
    pub guardians_only: bool,
    pub voting_strategy: VotingStrategy,
    /// Programs counted by [`VotingStrategy::ReputationInPrograms`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_ids: Option<BTreeSet<ProgramId>>,
}

impl MemberVoteSettings {
    /// Whether `now` is inside the voting window (both ends inclusive)
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time && now <= self.end_time
    }

    /// Program filter for the reputation resolver, if the strategy uses one
    pub fn program_filter(&self) -> Option<HashSet<ProgramId>> {
        match self.voting_strategy {
            VotingStrategy::ReputationInPrograms => self
                .program_ids
                .as_ref()
                .map(|ids| ids.iter().cloned().collect()),
            _ => None,
        }
    }
}

/// Kind-specific settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProposalSettings {
    Native(NativeSettings),
    MemberVote(MemberVoteSettings),
}

impl ProposalSettings {
    /// The proposal kind these settings describe
    pub fn kind(&self) -> ProposalKind {
        match self {
            Self::Native(_) => ProposalKind::Native,
            Self::MemberVote(_) => ProposalKind::MemberVote,
        }
    }
}

/// One selectable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// The value a voter selects
    pub value: u8,
    pub text: String,
    #[serde(default)]
    pub additional_info: String,
}

/// The question put to voters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub additional_info: String,
    pub answers: Vec<Answer>,
}

impl Question {
    /// Whether `value` is one of the answers
    pub fn has_answer(&self, value: u8) -> bool {
        self.answers.iter().any(|a| a.value == value)
    }

    /// An empty weight bucket per answer
    pub fn empty_buckets(&self) -> BTreeMap<u8, u64> {
        self.answers.iter().map(|a| (a.value, 0)).collect()
    }
}

/// Approval state. Both flags false means draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalStatus {
    pub approved: bool,
    pub rejected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<MemberId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<MemberId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
}

impl ProposalStatus {
    /// Neither approved nor rejected yet
    pub fn is_draft(&self) -> bool {
        !self.approved && !self.rejected
    }
}

/// Where a proposal stands at a given moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalPhase {
    Draft,
    Rejected,
    /// Approved native proposal; progress follows milestones
    Native,
    /// Approved, voting has not started
    Upcoming,
    Open,
    Closed,
}

/// A governance proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub space: SpaceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub additional_info: String,
    pub settings: ProposalSettings,
    pub question: Question,
    pub status: ProposalStatus,
    /// Sum of all roster weights, fixed at creation
    pub total_weight: u64,
    pub results: Results,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        self.settings.kind()
    }

    /// Voting strategy of a member vote
    pub fn voting_strategy(&self) -> Option<VotingStrategy> {
        match &self.settings {
            ProposalSettings::MemberVote(s) => Some(s.voting_strategy),
            ProposalSettings::Native(_) => None,
        }
    }

    pub fn member_vote_settings(&self) -> Option<&MemberVoteSettings> {
        match &self.settings {
            ProposalSettings::MemberVote(s) => Some(s),
            ProposalSettings::Native(_) => None,
        }
    }

    /// Derived phase at `now`
    pub fn phase(&self, now: DateTime<Utc>) -> ProposalPhase {
        if self.status.rejected {
            return ProposalPhase::Rejected;
        }
        if !self.status.approved {
            return ProposalPhase::Draft;
        }
        match &self.settings {
            ProposalSettings::Native(_) => ProposalPhase::Native,
            ProposalSettings::MemberVote(s) if now < s.start_time => ProposalPhase::Upcoming,
            ProposalSettings::MemberVote(s) if now > s.end_time => ProposalPhase::Closed,
            ProposalSettings::MemberVote(_) => ProposalPhase::Open,
        }
    }
}

/// Request to create a proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    /// Client-chosen id; a retried request with the same id is not duplicated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProposalId>,
    pub space: SpaceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub additional_info: String,
    pub settings: ProposalSettings,
    pub questions: Vec<Question>,
}

fn invalid<S: Into<String>>(msg: S) -> GovernanceError {
    GovernanceError::InvalidArgument(msg.into())
}

impl CreateProposalRequest {
    /// Check the request against the configuration at time `now`
    pub fn validate(&self, config: &GovernanceConfig, now: DateTime<Utc>) -> GovernanceResult<()> {
        if self.space.is_empty() {
            return Err(invalid("space cannot be empty"));
        }
        if let Some(id) = &self.id {
            if id.is_empty() {
                return Err(invalid("proposal id cannot be empty when given"));
            }
            if id.as_str().chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
                return Err(invalid(format!(
                    "proposal id {:?} contains a path separator or control character", id.as_str()
                )));
            }
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if self.name.chars().count() > config.max_name_length {
            return Err(invalid(format!(
                "name exceeds {} characters", config.max_name_length
            )));
        }

        // single-question proposals only
        let question = match self.questions.as_slice() {
            [question] => question,
            other => {
                return Err(invalid(format!(
                    "exactly one question is required, got {}", other.len()
                )))
            }
        };
        validate_question(question, config)?;

        match &self.settings {
            ProposalSettings::Native(native) => validate_native(native),
            ProposalSettings::MemberVote(vote) => validate_member_vote(vote, config, now),
        }
    }

    /// The single question of a validated request
    pub fn question(&self) -> GovernanceResult<&Question> {
        self.questions
            .first()
            .ok_or_else(|| invalid("exactly one question is required, got 0"))
    }
}

fn validate_question(question: &Question, config: &GovernanceConfig) -> GovernanceResult<()> {
    if question.text.trim().is_empty() {
        return Err(invalid("question text cannot be empty"));
    }

    let count = question.answers.len();
    if count < config.min_answers || count > config.max_answers {
        return Err(invalid(format!(
            "question needs between {} and {} answers, got {}",
            config.min_answers, config.max_answers, count
        )));
    }

    let mut seen = HashSet::with_capacity(count);
    for answer in &question.answers {
        if !seen.insert(answer.value) {
            return Err(invalid(format!("duplicate answer value {}", answer.value)));
        }
        if answer.text.trim().is_empty() {
            return Err(invalid(format!("answer {} has no text", answer.value)));
        }
    }
    Ok(())
}

fn validate_native(settings: &NativeSettings) -> GovernanceResult<()> {
    if !(settings.commence_index < settings.start_index && settings.start_index < settings.end_index) {
        return Err(invalid(format!(
            "milestones must satisfy commence < start < end, got {} / {} / {}",
            settings.commence_index, settings.start_index, settings.end_index
        )));
    }
    Ok(())
}

fn validate_member_vote(
    settings: &MemberVoteSettings,
    config: &GovernanceConfig,
    now: DateTime<Utc>,
) -> GovernanceResult<()> {
    if settings.start_time >= settings.end_time {
        return Err(invalid("start time must be before end time"));
    }

    let earliest = now
        .checked_add_signed(config.min_voting_lead_time())
        .ok_or_else(|| invalid("minimum lead time overflows the calendar"))?;
    if settings.start_time < earliest {
        return Err(invalid(format!(
            "voting must start at or after {} ({}s lead time)",
            earliest, config.min_voting_lead_time_secs
        )));
    }

    match (settings.voting_strategy, &settings.program_ids) {
        (VotingStrategy::ReputationInPrograms, Some(ids)) if !ids.is_empty() => {
            if ids.iter().any(|id| id.is_empty()) {
                return Err(invalid("program ids cannot be empty"));
            }
            Ok(())
        }
        (VotingStrategy::ReputationInPrograms, _) => {
            Err(invalid("reputation-in-programs voting needs at least one program id"))
        }
        (_, Some(_)) => Err(invalid(
            "program ids are only accepted with reputation-in-programs voting",
        )),
        (_, None) => Ok(()),
    }
}
