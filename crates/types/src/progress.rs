// crates/types/src/progress.rs
//! Point-in-time progress of an import.

use serde::{Deserialize, Serialize};

use crate::JobId;

/// Progress snapshot emitted by the bulk writer and cached per job.
///
/// `added + errors.len()` counts the records accounted for so far; it never
/// exceeds `total` and equals it once `progress` reaches 100.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub total: u64,
    pub added: u64,
    pub errors: Vec<String>,
    /// Completion percentage, 0–100. Exactly 100 only on the final snapshot.
    pub progress: u8,
}

impl Progress {
    /// Snapshot for a job that has been accepted but not yet processed.
    pub fn started(job_id: JobId, total: u64) -> Self {
        Self {
            job_id: Some(job_id),
            total,
            ..Self::default()
        }
    }

    /// Number of records accounted for, added or rejected.
    pub fn processed(&self) -> u64 {
        self.added + self.errors.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.progress == 100
    }

    /// Percentage for an intermediate snapshot. Capped at 99 so that 100 is
    /// reserved for the final snapshot.
    pub fn intermediate_percent(processed: u64, total: u64) -> u8 {
        if total == 0 {
            return 0;
        }
        (processed.saturating_mul(100) / total).min(99) as u8
    }
}
