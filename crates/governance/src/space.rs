//! Space directory collaborator
//!
//! Membership of spaces is managed elsewhere; the engine only asks who the
//! members and guardians of a space are.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use spacegov_common::{MemberId, SpaceId};

use crate::roster::Eligibility;
use crate::{GovernanceError, GovernanceResult};

/// Read access to space membership
#[async_trait]
pub trait SpaceDirectory: Send + Sync {
    /// Whether the space exists
    async fn space_exists(&self, space: &SpaceId) -> GovernanceResult<bool>;

    /// Whether `member` belongs to the space
    async fn is_member(&self, space: &SpaceId, member: &MemberId) -> GovernanceResult<bool>;

    /// Whether `member` is a guardian of the space
    async fn is_guardian(&self, space: &SpaceId, member: &MemberId) -> GovernanceResult<bool>;

    /// Current members of the given class
    async fn members(&self, space: &SpaceId, eligibility: Eligibility) -> GovernanceResult<Vec<MemberId>>;
}

#[derive(Debug, Default, Clone)]
struct SpaceMembers {
    members: BTreeSet<MemberId>,
    guardians: BTreeSet<MemberId>,
}

/// In-memory space directory
#[derive(Debug, Default)]
pub struct MemorySpaceDirectory {
    spaces: RwLock<HashMap<SpaceId, SpaceMembers>>,
}

impl MemorySpaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a space with no members
    pub async fn add_space(&self, space: SpaceId) {
        self.spaces.write().await.entry(space).or_default();
    }

    /// Add a regular member
    pub async fn add_member(&self, space: &SpaceId, member: MemberId) -> GovernanceResult<()> {
        let mut spaces = self.spaces.write().await;
        let entry = spaces
            .get_mut(space)
            .ok_or_else(|| GovernanceError::NotFound(format!("space {}", space)))?;
        entry.members.insert(member);
        Ok(())
    }

    /// Add a guardian; guardians are members too
    pub async fn add_guardian(&self, space: &SpaceId, member: MemberId) -> GovernanceResult<()> {
        let mut spaces = self.spaces.write().await;
        let entry = spaces
            .get_mut(space)
            .ok_or_else(|| GovernanceError::NotFound(format!("space {}", space)))?;
        entry.members.insert(member.clone());
        entry.guardians.insert(member);
        Ok(())
    }

    /// Remove a member (and their guardian role)
    pub async fn remove_member(&self, space: &SpaceId, member: &MemberId) -> GovernanceResult<()> {
        let mut spaces = self.spaces.write().await;
        let entry = spaces
            .get_mut(space)
            .ok_or_else(|| GovernanceError::NotFound(format!("space {}", space)))?;
        entry.members.remove(member);
        entry.guardians.remove(member);
        Ok(())
    }
}

#[async_trait]
impl SpaceDirectory for MemorySpaceDirectory {
    async fn space_exists(&self, space: &SpaceId) -> GovernanceResult<bool> {
        Ok(self.spaces.read().await.contains_key(space))
    }

    async fn is_member(&self, space: &SpaceId, member: &MemberId) -> GovernanceResult<bool> {
        Ok(self
            .spaces
            .read()
            .await
            .get(space)
            .map_or(false, |s| s.members.contains(member)))
    }

    async fn is_guardian(&self, space: &SpaceId, member: &MemberId) -> GovernanceResult<bool> {
        Ok(self
            .spaces
            .read()
            .await
            .get(space)
            .map_or(false, |s| s.guardians.contains(member)))
    }

    async fn members(&self, space: &SpaceId, eligibility: Eligibility) -> GovernanceResult<Vec<MemberId>> {
        let spaces = self.spaces.read().await;
        let entry = spaces
            .get(space)
            .ok_or_else(|| GovernanceError::NotFound(format!("space {}", space)))?;
        let set = match eligibility {
            Eligibility::Guardians => &entry.guardians,
            Eligibility::Members => &entry.members,
        };
        Ok(set.iter().cloned().collect())
    }
}
