//! Weighted tally
//!
//! Results are always recomputed from the whole roster rather than kept as
//! running counters, so a failed or repeated write cannot make them drift.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::proposal::Question;
use crate::roster::RosterEntry;

/// Aggregated voting results of a proposal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    /// Weight of the whole roster
    pub total_weight: u64,
    /// Weight of roster entries that have voted
    pub voted_weight: u64,
    /// Weight behind each answer value
    pub per_answer_weight: BTreeMap<u8, u64>,
}

impl Results {
    /// Results of a proposal nobody has voted on yet
    pub fn empty(question: &Question, total_weight: u64) -> Self {
        Self {
            total_weight,
            voted_weight: 0,
            per_answer_weight: question.empty_buckets(),
        }
    }

    /// Weight behind one answer
    pub fn weight_for(&self, answer: u8) -> u64 {
        self.per_answer_weight.get(&answer).copied().unwrap_or(0)
    }

    /// Share of the total weight that has voted, in `[0, 1]`
    pub fn participation(&self) -> f64 {
        if self.total_weight == 0 {
            0.0
        } else {
            self.voted_weight as f64 / self.total_weight as f64
        }
    }
}

/// Compute results from the full roster
pub fn compute(question: &Question, roster: &[RosterEntry]) -> Results {
    let mut results = Results::empty(question, 0);

    for entry in roster {
        results.total_weight = results.total_weight.saturating_add(entry.weight);
        if !entry.has_voted {
            continue;
        }
        results.voted_weight = results.voted_weight.saturating_add(entry.weight);
        for answer in &entry.selected_answers {
            // values outside the question never pass vote validation
            if let Some(bucket) = results.per_answer_weight.get_mut(answer) {
                *bucket = bucket.saturating_add(entry.weight);
            }
        }
    }

    results
}
