// crates/types/src/job.rs
//! Durable job records and the closed set of job kinds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{JobId, Progress};

/// Returned when a job type string is not one of the known kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job type: {0}")]
pub struct UnknownJobType(pub String);

/// What a bulk job concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Import of organization members.
    OrgMembers,
    /// Import of census participants.
    CensusParticipants,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrgMembers => "org_members",
            Self::CensusParticipants => "census_participants",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = UnknownJobType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "org_members" => Ok(Self::OrgMembers),
            "census_participants" => Ok(Self::CensusParticipants),
            other => Err(UnknownJobType(other.to_string())),
        }
    }
}

/// A completed job as kept in the durable job store. Never mutated once
/// written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub job_type: JobType,
    pub org_id: String,
    pub total: u64,
    pub added: u64,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl Job {
    /// Build the durable record for a job from its final snapshot.
    pub fn completed(
        job_id: JobId,
        job_type: JobType,
        org_id: impl Into<String>,
        created_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        last: &Progress,
    ) -> Self {
        Self {
            job_id,
            job_type,
            org_id: org_id.into(),
            total: last.total,
            added: last.added,
            errors: last.errors.clone(),
            created_at,
            completed_at: Some(completed_at),
            completed: true,
        }
    }

    /// The progress view of a stored job. Stored jobs are always finished.
    pub fn to_progress(&self) -> Progress {
        Progress {
            job_id: Some(self.job_id),
            total: self.total,
            added: self.added,
            errors: self.errors.clone(),
            progress: 100,
        }
    }
}

/// One page of a job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub jobs: Vec<Job>,
    /// Number of jobs matching the filter across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}
