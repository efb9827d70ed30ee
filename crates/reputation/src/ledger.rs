//! Storage-backed badge history

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use spacegov_common::{MemberId, ProgramId};
use spacegov_storage::{JsonStorage, Storage};

use crate::{BadgeHistory, ReputationError, ReputationRecord, ReputationResult};

/// Path constant for storage
const BADGES_PATH: &str = "reputation/badges";

/// Badge issuances persisted in a [`Storage`]
pub struct BadgeLedger {
    storage: Arc<dyn Storage>,
}

impl BadgeLedger {
    /// Create a ledger on top of the given storage
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn member_prefix(member: &MemberId) -> String {
        format!("{}/{}/", BADGES_PATH, member)
    }

    /// Record a badge issuance
    pub async fn record(&self, record: ReputationRecord) -> ReputationResult<()> {
        if record.id.trim().is_empty() {
            return Err(ReputationError::InvalidRecord("record id cannot be empty".to_string()));
        }
        if record.member.is_empty() {
            return Err(ReputationError::InvalidRecord("member cannot be empty".to_string()));
        }

        let key = format!("{}{}", Self::member_prefix(&record.member), record.id);
        self.storage.put_json(&key, &record).await?;
        info!("Recorded badge {} ({} xp) for {}", record.id, record.xp, record.member);
        Ok(())
    }
}

#[async_trait]
impl BadgeHistory for BadgeLedger {
    async fn records_for(
        &self,
        member: &MemberId,
        programs: Option<&HashSet<ProgramId>>,
    ) -> ReputationResult<Vec<ReputationRecord>> {
        let records: Vec<ReputationRecord> = self.storage
            .list_json(&Self::member_prefix(member))
            .await?;

        Ok(records
            .into_iter()
            .filter(|r| programs.map_or(true, |p| p.contains(&r.program_id)))
            .collect())
    }
}
