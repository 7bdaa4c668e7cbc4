// crates/server-jobs/src/reaper.rs
//! Evicts finished jobs from the registry after a grace period.

use std::sync::Arc;
use std::time::Duration;

use rollcall_types::JobId;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::registry::JobRegistry;

/// How long a finished job stays in the registry by default.
pub const DEFAULT_REAP_GRACE: Duration = Duration::from_secs(60);

/// Schedule removal of `job_id` from `registry` once `grace` has elapsed.
///
/// Only arm this after the job's durable record has been written: once the
/// entry is gone, status queries are answered from the job store. The task
/// resolves to whether an entry was actually removed.
pub fn arm(registry: Arc<JobRegistry>, job_id: JobId, grace: Duration) -> JoinHandle<bool> {
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        let removed = registry.remove_completed(&job_id);
        debug!(job_id = %job_id, removed, "reaper fired");
        removed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryEntry;
    use chrono::Utc;
    use rollcall_types::{JobType, Progress};

    fn register(registry: &JobRegistry, progress: u8) -> JobId {
        let id = JobId::generate();
        let mut p = Progress::started(id, 1);
        p.progress = progress;
        p.added = u64::from(progress == 100);
        registry.register(
            id,
            RegistryEntry {
                org_id: "org-1".into(),
                job_type: JobType::OrgMembers,
                created_at: Utc::now(),
                progress: p,
            },
        );
        id
    }

    #[tokio::test(start_paused = true)]
    async fn test_removes_completed_job_after_grace() {
        let registry = Arc::new(JobRegistry::new());
        let id = register(&registry, 100);

        let handle = arm(registry.clone(), id, DEFAULT_REAP_GRACE);
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(registry.get(&id).is_some());

        assert!(handle.await.unwrap());
        assert!(registry.get(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaves_unfinished_job_alone() {
        let registry = Arc::new(JobRegistry::new());
        let id = register(&registry, 40);

        assert!(!arm(registry.clone(), id, DEFAULT_REAP_GRACE).await.unwrap());
        assert!(registry.get(&id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_job_is_a_no_op() {
        let registry = Arc::new(JobRegistry::new());
        let id = register(&registry, 100);

        let first = arm(registry.clone(), id, Duration::from_secs(1));
        let second = arm(registry.clone(), id, Duration::from_secs(2));
        assert!(first.await.unwrap());
        assert!(!second.await.unwrap());
        assert!(registry.is_empty());
    }
}
