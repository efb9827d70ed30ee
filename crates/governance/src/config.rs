//! Configuration for the governance engine

use chrono::Duration;
use serde::{Deserialize, Serialize};

use spacegov_common::{Configuration, Error, Result};

/// Configuration for proposal validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// How far in the future a member vote must start, in seconds
    pub min_voting_lead_time_secs: u64,
    /// Minimum number of answers a question must offer
    pub min_answers: usize,
    /// Maximum number of answers a question may offer
    pub max_answers: usize,
    /// Maximum length of a proposal name
    pub max_name_length: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            min_voting_lead_time_secs: 86400, // 24 hours
            min_answers: 2,
            max_answers: 10,
            max_name_length: 200,
        }
    }
}

impl GovernanceConfig {
    /// Minimum lead time as a duration
    pub fn min_voting_lead_time(&self) -> Duration {
        let secs = i64::try_from(self.min_voting_lead_time_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        Duration::seconds(secs)
    }
}

impl Configuration for GovernanceConfig {
    fn validate(&self) -> Result<()> {
        if self.min_answers < 2 {
            return Err(Error::configuration("min_answers must be at least 2"));
        }
        if self.max_answers < self.min_answers {
            return Err(Error::configuration(format!(
                "max_answers ({}) must not be below min_answers ({})",
                self.max_answers, self.min_answers
            )));
        }
        if self.max_answers > usize::from(u8::MAX) + 1 {
            return Err(Error::configuration("max_answers exceeds the answer value domain"));
        }
        if self.max_name_length == 0 {
            return Err(Error::configuration("max_name_length must be positive"));
        }
        // chrono panics on durations this large
        if self.min_voting_lead_time_secs > (i64::MAX / 1000) as u64 {
            return Err(Error::configuration("min_voting_lead_time_secs is too large"));
        }
        Ok(())
    }
}
