//! Governance proposal engine for spacegov
//!
//! A proposal is created with a frozen voter roster whose weights come from
//! a voting strategy, goes through a guardian approval workflow, accepts
//! votes inside its validity window and keeps a weighted tally that is
//! recomputed from the roster after every vote.

use async_trait::async_trait;
use thiserror::Error;

use spacegov_common::{MemberId, ProposalId};
use spacegov_reputation::ReputationError;
use spacegov_storage::StorageError;

pub mod config;
pub mod ledger;
pub mod lifecycle;
pub mod manager;
pub mod proposal;
pub mod roster;
pub mod space;
pub mod store;
pub mod tally;

// Re-exports
pub use config::GovernanceConfig;
pub use ledger::VoteLedgerEntry;
pub use manager::GovernanceManager;
pub use proposal::{
    Answer, CreateProposalRequest, MemberVoteSettings, NativeSettings, Proposal, ProposalKind,
    ProposalPhase, ProposalSettings, ProposalStatus, Question, VotingStrategy,
};
pub use roster::{Eligibility, RosterBuilder, RosterEntry};
pub use space::{MemorySpaceDirectory, SpaceDirectory};
pub use tally::Results;

/// Error types for governance operations
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Missing proposal, space or member
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transition violates a terminal-state invariant
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Voter has no roster entry
    #[error("Not eligible: {0}")]
    NotEligible(String),

    /// Proposal is not open for voting
    #[error("Voting closed: {0}")]
    VotingClosed(String),

    /// Selected value is not one of the question's answers
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    /// Error with storage
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    /// Error with reputation
    #[error("Reputation error: {0}")]
    ReputationError(#[from] ReputationError),

    /// Error from the space directory
    #[error("Space directory error: {0}")]
    DirectoryError(String),

    /// Weights do not fit in a u64
    #[error("Weight overflow: {0}")]
    Overflow(String),
}

/// The kind of a governance failure, as surfaced to API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidArgument,
    NotEligible,
    VotingClosed,
    InvalidAnswer,
    /// Infrastructure failure; nothing was committed
    Internal,
}

impl ErrorKind {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Internal)
    }
}

impl GovernanceError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotEligible(_) => ErrorKind::NotEligible,
            Self::VotingClosed(_) => ErrorKind::VotingClosed,
            Self::InvalidAnswer(_) => ErrorKind::InvalidAnswer,
            Self::StorageError(_)
            | Self::ReputationError(_)
            | Self::DirectoryError(_)
            | Self::Overflow(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Operations exposed by the proposal engine.
///
/// Every operation takes the already-authenticated caller identity.
#[async_trait]
pub trait Governance: Send + Sync {
    /// Create a proposal and freeze its voter roster
    async fn create_proposal(
        &self,
        caller: &MemberId,
        request: CreateProposalRequest,
    ) -> GovernanceResult<Proposal>;

    /// Approve a draft proposal (guardians only)
    async fn approve_proposal(
        &self,
        caller: &MemberId,
        proposal_id: &ProposalId,
    ) -> GovernanceResult<Proposal>;

    /// Reject a draft proposal (guardians only)
    async fn reject_proposal(
        &self,
        caller: &MemberId,
        proposal_id: &ProposalId,
    ) -> GovernanceResult<Proposal>;

    /// Cast or replace the caller's vote
    async fn cast_vote(
        &self,
        caller: &MemberId,
        proposal_id: &ProposalId,
        selected_answers: Vec<u8>,
    ) -> GovernanceResult<VoteLedgerEntry>;

    /// Recompute and store the results from the roster
    async fn recompute_results(&self, proposal_id: &ProposalId) -> GovernanceResult<Results>;

    /// Get a proposal by ID
    async fn get_proposal(&self, proposal_id: &ProposalId) -> GovernanceResult<Option<Proposal>>;
}
