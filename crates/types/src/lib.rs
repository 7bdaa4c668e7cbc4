// crates/types/src/lib.rs
//! Types shared across the rollcall crates.
//!
//! Everything here crosses a crate or wire boundary: job identifiers, the
//! closed set of job kinds, progress snapshots, and durable job records.

pub mod job;
pub mod job_id;
pub mod progress;

pub use job::{Job, JobPage, JobType, UnknownJobType};
pub use job_id::{JobId, JobIdError};
pub use progress::Progress;
