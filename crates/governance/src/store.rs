//! Persistence of proposals, rosters and the vote ledger

use std::sync::Arc;

use spacegov_common::{MemberId, ProposalId};
use spacegov_storage::{JsonStorage, Storage, WriteBatch};

use crate::ledger::VoteLedgerEntry;
use crate::proposal::Proposal;
use crate::roster::RosterEntry;
use crate::GovernanceResult;

/// Path constants for storage
const PROPOSALS_PATH: &str = "governance/proposals";
const ROSTERS_PATH: &str = "governance/rosters";
const LEDGER_PATH: &str = "governance/ledger";

/// Typed access to governance documents
#[derive(Clone)]
pub struct ProposalStore {
    storage: Arc<dyn Storage>,
}

impl ProposalStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn proposal_key(id: &ProposalId) -> String {
        format!("{}/{}", PROPOSALS_PATH, id)
    }

    fn roster_prefix(id: &ProposalId) -> String {
        format!("{}/{}/", ROSTERS_PATH, id)
    }

    fn roster_key(id: &ProposalId, voter: &MemberId) -> String {
        format!("{}{}", Self::roster_prefix(id), voter)
    }

    fn ledger_prefix(id: &ProposalId) -> String {
        format!("{}/{}/", LEDGER_PATH, id)
    }

    fn ledger_key(entry: &VoteLedgerEntry) -> String {
        format!("{}{}", Self::ledger_prefix(&entry.proposal_id), entry.id)
    }

    pub async fn load_proposal(&self, id: &ProposalId) -> GovernanceResult<Option<Proposal>> {
        Ok(self.storage.find_json(&Self::proposal_key(id)).await?)
    }

    pub async fn load_roster(&self, id: &ProposalId) -> GovernanceResult<Vec<RosterEntry>> {
        let entries: Vec<RosterEntry> = self.storage.list_json(&Self::roster_prefix(id)).await?;
        Ok(entries.into_iter().filter(|e| &e.proposal_id == id).collect())
    }

    pub async fn load_roster_entry(
        &self,
        id: &ProposalId,
        voter: &MemberId,
    ) -> GovernanceResult<Option<RosterEntry>> {
        Ok(self.storage.find_json(&Self::roster_key(id, voter)).await?)
    }

    /// Ledger entries of a proposal, oldest first
    pub async fn load_ledger(&self, id: &ProposalId) -> GovernanceResult<Vec<VoteLedgerEntry>> {
        let mut entries: Vec<VoteLedgerEntry> = self.storage.list_json(&Self::ledger_prefix(id)).await?;
        entries.retain(|e| &e.proposal_id == id);
        entries.sort_by(|a, b| a.cast_at.cmp(&b.cast_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    /// Write a new proposal together with its full roster in one batch
    pub async fn create(&self, proposal: &Proposal, roster: &[RosterEntry]) -> GovernanceResult<()> {
        let mut batch = WriteBatch::new();
        for entry in roster {
            batch.put_json(Self::roster_key(&proposal.id, &entry.voter), entry)?;
        }
        batch.put_json(Self::proposal_key(&proposal.id), proposal)?;
        self.storage.write_batch(batch).await?;
        Ok(())
    }

    pub async fn save_proposal(&self, proposal: &Proposal) -> GovernanceResult<()> {
        self.storage.put_json(&Self::proposal_key(&proposal.id), proposal).await?;
        Ok(())
    }

    /// Write a vote: ledger entry, updated roster entry and recomputed proposal
    pub async fn commit_vote(
        &self,
        vote: &VoteLedgerEntry,
        entry: &RosterEntry,
        proposal: &Proposal,
    ) -> GovernanceResult<()> {
        let mut batch = WriteBatch::new();
        batch.put_json(Self::ledger_key(vote), vote)?;
        batch.put_json(Self::roster_key(&entry.proposal_id, &entry.voter), entry)?;
        batch.put_json(Self::proposal_key(&proposal.id), proposal)?;
        self.storage.write_batch(batch).await?;
        Ok(())
    }
}
