//! Reputation for spacegov
//!
//! A member's reputation is the sum of the XP carried by the badges they
//! have been issued. Badges are [`ReputationRecord`]s served by a
//! [`BadgeHistory`] collaborator; the [`ReputationResolver`] turns them into
//! a voting weight, optionally restricted to a set of awarding programs.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use spacegov_common::{MemberId, ProgramId};
use spacegov_storage::StorageError;

pub mod ledger;

pub use ledger::BadgeLedger;

/// Error types for reputation operations
#[derive(Error, Debug)]
pub enum ReputationError {
    /// Error with storage
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    /// A badge record was rejected
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The summed XP does not fit in a weight
    #[error("Reputation overflow for member {0}")]
    Overflow(MemberId),
}

/// Result type for reputation operations
pub type ReputationResult<T> = Result<T, ReputationError>;

/// A single badge issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    /// Unique identifier of the issuance
    pub id: String,
    /// The member who received the badge
    pub member: MemberId,
    /// The awarding program that issued the badge
    pub program_id: ProgramId,
    /// XP carried by the badge
    pub xp: u64,
    /// When the badge was issued
    pub issued_at: DateTime<Utc>,
}

/// Source of badge-issuance history
#[async_trait]
pub trait BadgeHistory: Send + Sync {
    /// Every badge issued to `member`.
    ///
    /// Implementations may pre-filter by `programs`, but callers must not
    /// rely on it.
    async fn records_for(
        &self,
        member: &MemberId,
        programs: Option<&HashSet<ProgramId>>,
    ) -> ReputationResult<Vec<ReputationRecord>>;
}

/// Computes voting weight from badge history
#[derive(Clone)]
pub struct ReputationResolver {
    history: Arc<dyn BadgeHistory>,
}

impl ReputationResolver {
    /// Create a resolver over the given badge history
    pub fn new(history: Arc<dyn BadgeHistory>) -> Self {
        Self { history }
    }

    /// Reputation score of a member.
    ///
    /// With `programs`, only badges from those programs count; anything else
    /// is left out of the sum. A member without qualifying badges scores 0.
    pub async fn score(
        &self,
        member: &MemberId,
        programs: Option<&HashSet<ProgramId>>,
    ) -> ReputationResult<u64> {
        let records = self.history.records_for(member, programs).await?;
        let score = sum_xp(member, &records, programs)?;
        debug!("Reputation of {} is {} over {} badges", member, score, records.len());
        Ok(score)
    }
}

/// Sum the XP of the records belonging to `member` that fall in `programs`
pub fn sum_xp(
    member: &MemberId,
    records: &[ReputationRecord],
    programs: Option<&HashSet<ProgramId>>,
) -> ReputationResult<u64> {
    records
        .iter()
        .filter(|r| &r.member == member)
        .filter(|r| programs.map_or(true, |p| p.contains(&r.program_id)))
        .try_fold(0u64, |acc, r| acc.checked_add(r.xp))
        .ok_or_else(|| ReputationError::Overflow(member.clone()))
}
